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

//! GATT client transport abstraction.
//!
//! The connection logic only talks to these traits. Listing calls return
//! handles in the order the platform reports them; matching on UUIDs is done
//! by the caller.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Raw notification payloads from a subscribed characteristic.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Characteristic handle type exposed by a device's services.
pub type CharacteristicOf<D> =
    <<D as GattDevice>::Service as GattService>::Characteristic;

/// A device reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Platform identifier (Bluetooth address on BlueZ).
    pub id: String,
    /// Display name, empty when the device has none.
    pub name: String,
}

impl DeviceCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Restricts which devices enumeration returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationFilter {
    /// Only report devices exposing this GATT service.
    pub service: Option<Uuid>,
}

impl EnumerationFilter {
    pub fn service(uuid: Uuid) -> Self {
        Self {
            service: Some(uuid),
        }
    }
}

/// How a characteristic write is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

/// Completion status of a GATT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationStatus {
    Success,
    Unreachable,
    ProtocolError,
    AccessDenied,
}

impl CommunicationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for CommunicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Unreachable => "unreachable",
            Self::ProtocolError => "protocol error",
            Self::AccessDenied => "access denied",
        };
        f.write_str(s)
    }
}

/// Failure reported by the platform Bluetooth stack.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Bluetooth(#[from] bluer::Error),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait GattTransport: Send + Sync {
    type Device: GattDevice;

    /// List candidate devices, in platform order.
    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
    ) -> Result<Vec<DeviceCandidate>, TransportError>;

    /// Open a connection to a previously enumerated device.
    async fn connect(&self, candidate: &DeviceCandidate) -> Result<Self::Device, TransportError>;
}

#[async_trait]
pub trait GattDevice: Send + Sync + 'static {
    type Service: GattService;

    async fn services(&self) -> Result<Vec<Self::Service>, TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait GattService: Send + Sync + 'static {
    type Characteristic: GattCharacteristic;

    fn uuid(&self) -> Uuid;

    async fn characteristics(&self) -> Result<Vec<Self::Characteristic>, TransportError>;
}

#[async_trait]
pub trait GattCharacteristic: Send + Sync + 'static {
    type Descriptor: GattDescriptor;

    fn uuid(&self) -> Uuid;

    async fn descriptors(&self) -> Result<Vec<Self::Descriptor>, TransportError>;

    /// Register for value-changed notifications.
    async fn subscribe(&self) -> Result<NotificationStream, TransportError>;

    async fn write(
        &self,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<CommunicationStatus, TransportError>;
}

#[async_trait]
pub trait GattDescriptor: Send + Sync + 'static {
    fn uuid(&self) -> Uuid;

    async fn write(&self, value: &[u8]) -> Result<(), TransportError>;
}
