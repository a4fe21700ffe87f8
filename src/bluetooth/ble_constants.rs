// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! BLE service and characteristic UUIDs for the RedBear BLE Controller profile.

use uuid::Uuid;

/// Device names advertised by RedBear boards running the BLE Controller firmware.
pub const ACCEPTED_DEVICE_NAMES: [&str; 4] = ["Biscuit", "BLE Mini", "BlendMicro", "BLE Shield"];

/// RedBear GATT service UUID.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x713d0000_503e_4c75_ba94_3148f18d941e);

/// TX characteristic UUID (host writes commands here).
/// Properties: Write Without Response
pub const TX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x713d0003_503e_4c75_ba94_3148f18d941e);

/// RX characteristic UUID (peripheral replies arrive here).
/// Properties: Notify
pub const RX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x713d0002_503e_4c75_ba94_3148f18d941e);

/// Client Characteristic Configuration Descriptor (0x2902).
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid =
    Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// Generic Access service (0x1800), used to narrow device enumeration.
pub const GENERIC_ACCESS_UUID: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);

/// CCCD value that enables notifications (little-endian 0x0001).
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];

/// Whether a peripheral with this display name runs the expected firmware.
///
/// Exact, case-sensitive match against [`ACCEPTED_DEVICE_NAMES`].
pub fn is_accepted_device_name(name: &str) -> bool {
    ACCEPTED_DEVICE_NAMES.contains(&name)
}

pub fn service_uuid() -> Uuid {
    SERVICE_UUID
}

pub fn tx_characteristic_uuid() -> Uuid {
    TX_CHARACTERISTIC_UUID
}

pub fn rx_characteristic_uuid() -> Uuid {
    RX_CHARACTERISTIC_UUID
}

pub fn notify_descriptor_uuid() -> Uuid {
    CLIENT_CHARACTERISTIC_CONFIG_UUID
}
