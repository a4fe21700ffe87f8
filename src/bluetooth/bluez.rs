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

//! BlueZ GATT client transport.

use async_trait::async_trait;
use bluer::gatt::remote::{Characteristic, CharacteristicWriteRequest, Descriptor, Service};
use bluer::gatt::WriteOp;
use bluer::{Adapter, AdapterEvent, Address, Device, ErrorKind, Session};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::ble_constants::CLIENT_CHARACTERISTIC_CONFIG_UUID;
use super::transport::{
    CommunicationStatus, DeviceCandidate, EnumerationFilter, GattCharacteristic, GattDescriptor,
    GattDevice, GattService, GattTransport, NotificationStream, TransportError, WriteMode,
};
use crate::config::BluetoothConfig;

/// Transport backed by the system BlueZ daemon.
pub struct BluezTransport {
    _session: Session,
    adapter: Adapter,
    discovery: Duration,
}

impl BluezTransport {
    /// Open a BlueZ session on the configured (or default) adapter.
    pub async fn new(config: &BluetoothConfig) -> Result<Self, TransportError> {
        let session = Session::new().await?;
        debug!("BlueZ session created");

        let adapter = match &config.adapter {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            _session: session,
            adapter,
            discovery: Duration::from_secs(config.discovery_secs),
        })
    }

    /// Scan for advertising devices so BlueZ knows about them.
    async fn run_discovery(&self) -> Result<(), TransportError> {
        if self.discovery.is_zero() {
            return Ok(());
        }

        info!("Discovering devices for {}s...", self.discovery.as_secs());
        let mut events = Box::pin(self.adapter.discover_devices().await?);
        let scan = async {
            while let Some(event) = events.next().await {
                if let AdapterEvent::DeviceAdded(address) = event {
                    debug!("Device seen: {}", address);
                }
            }
        };
        // Discovery stops once the event stream is dropped.
        let _ = tokio::time::timeout(self.discovery, scan).await;
        Ok(())
    }
}

#[async_trait]
impl GattTransport for BluezTransport {
    type Device = BluezDevice;

    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
    ) -> Result<Vec<DeviceCandidate>, TransportError> {
        self.run_discovery().await?;

        let mut candidates = Vec::new();
        for address in self.adapter.device_addresses().await? {
            let device = self.adapter.device(address)?;

            if let Some(service) = filter.service {
                let uuids = device.uuids().await?.unwrap_or_default();
                if !uuids.contains(&service) {
                    debug!("Skipping {}: no {} service", address, service);
                    continue;
                }
            }

            let name = device.name().await?.unwrap_or_default();
            candidates.push(DeviceCandidate::new(address.to_string(), name));
        }

        Ok(candidates)
    }

    async fn connect(&self, candidate: &DeviceCandidate) -> Result<BluezDevice, TransportError> {
        let address: Address = candidate.id.parse().map_err(|_| {
            TransportError::Unavailable(format!("invalid device address: {}", candidate.id))
        })?;
        let device = self.adapter.device(address)?;

        if !device.is_connected().await? {
            info!("Connecting to {}...", address);
            device.connect().await?;
        }

        Ok(BluezDevice { device })
    }
}

pub struct BluezDevice {
    device: Device,
}

#[async_trait]
impl GattDevice for BluezDevice {
    type Service = BluezService;

    async fn services(&self) -> Result<Vec<BluezService>, TransportError> {
        let mut services = Vec::new();
        for inner in self.device.services().await? {
            let uuid = inner.uuid().await?;
            services.push(BluezService { uuid, inner });
        }
        Ok(services)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.device.disconnect().await?;
        Ok(())
    }
}

pub struct BluezService {
    uuid: Uuid,
    inner: Service,
}

#[async_trait]
impl GattService for BluezService {
    type Characteristic = BluezCharacteristic;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn characteristics(&self) -> Result<Vec<BluezCharacteristic>, TransportError> {
        let mut characteristics = Vec::new();
        for inner in self.inner.characteristics().await? {
            let uuid = inner.uuid().await?;
            characteristics.push(BluezCharacteristic { uuid, inner });
        }
        Ok(characteristics)
    }
}

pub struct BluezCharacteristic {
    uuid: Uuid,
    inner: Characteristic,
}

#[async_trait]
impl GattCharacteristic for BluezCharacteristic {
    type Descriptor = BluezDescriptor;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn descriptors(&self) -> Result<Vec<BluezDescriptor>, TransportError> {
        let mut descriptors = Vec::new();
        for inner in self.inner.descriptors().await? {
            let uuid = inner.uuid().await?;
            descriptors.push(BluezDescriptor { uuid, inner });
        }
        Ok(descriptors)
    }

    async fn subscribe(&self) -> Result<NotificationStream, TransportError> {
        let stream = self.inner.notify().await?;
        Ok(Box::pin(stream))
    }

    async fn write(
        &self,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<CommunicationStatus, TransportError> {
        let req = CharacteristicWriteRequest {
            op_type: match mode {
                WriteMode::WithResponse => WriteOp::Request,
                WriteMode::WithoutResponse => WriteOp::Command,
            },
            ..Default::default()
        };

        match self.inner.write_ext(value, &req).await {
            Ok(()) => Ok(CommunicationStatus::Success),
            Err(e) => match e.kind {
                ErrorKind::NotPermitted | ErrorKind::NotAuthorized => {
                    Ok(CommunicationStatus::AccessDenied)
                }
                ErrorKind::NotReady | ErrorKind::NotAvailable => {
                    Ok(CommunicationStatus::Unreachable)
                }
                ErrorKind::InvalidLength | ErrorKind::InvalidOffset => {
                    Ok(CommunicationStatus::ProtocolError)
                }
                _ => Err(e.into()),
            },
        }
    }
}

pub struct BluezDescriptor {
    uuid: Uuid,
    inner: Descriptor,
}

#[async_trait]
impl GattDescriptor for BluezDescriptor {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn write(&self, value: &[u8]) -> Result<(), TransportError> {
        // BlueZ rejects direct CCCD writes; subscribe() already enabled it.
        if self.uuid == CLIENT_CHARACTERISTIC_CONFIG_UUID {
            debug!("CCCD managed by BlueZ, skipping write of {:02x?}", value);
            return Ok(());
        }
        self.inner.write(value).await?;
        Ok(())
    }
}
