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

//! Bluetooth communication module.
//!
//! Connects to a RedBear board over BLE GATT and exchanges text through its
//! TX/RX characteristics.

pub mod ble_constants;
pub mod bluez;
pub mod channel;
pub mod connection;
pub mod protocol;
pub mod transport;

pub use bluez::BluezTransport;
pub use channel::{Channel, Inbound, SendError};
pub use connection::{
    ConnectError, ConnectStep, Connector, DescriptorConfigError, MissingCharacteristic,
    NotificationSetup,
};
pub use protocol::{decode, InboundMessage};
pub use transport::{
    CommunicationStatus, DeviceCandidate, EnumerationFilter, GattCharacteristic, GattDescriptor,
    GattDevice, GattService, GattTransport, NotificationStream, TransportError, WriteMode,
};
