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

//! Connection establishment.
//!
//! A connection attempt walks a fixed sequence of steps:
//!
//! ```text
//! Discovered -> Selected -> Connected -> ServiceResolved -> Resolved -> Channel
//! ```
//!
//! Each state owns what the earlier steps resolved, and the next step is a
//! method consuming it, so a step cannot run before its inputs exist. The first
//! hard failure ends the attempt; there is no retry. Every transition writes
//! one line to the output sink.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::ble_constants::{
    is_accepted_device_name, notify_descriptor_uuid, rx_characteristic_uuid, service_uuid,
    tx_characteristic_uuid, ENABLE_NOTIFICATION_VALUE, GENERIC_ACCESS_UUID, SERVICE_UUID,
};
use super::channel::Channel;
use super::transport::{
    CharacteristicOf, DeviceCandidate, EnumerationFilter, GattCharacteristic, GattDescriptor,
    GattDevice, GattService, GattTransport, NotificationStream, TransportError,
};
use crate::output::OutputSink;
use crate::state::{AppState, ConnectionStatus};

/// Printed when enumeration comes back empty.
pub const BLUETOOTH_SETTINGS_HINT: &str =
    "Pair the board with `bluetoothctl` (scan on, pair <address>) and run again";

/// Step of the connection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    Discovering,
    Selecting,
    ResolvingService,
    ResolvingCharacteristics,
}

impl fmt::Display for ConnectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovering => "discovering devices",
            Self::Selecting => "selecting device",
            Self::ResolvingService => "resolving service",
            Self::ResolvingCharacteristics => "resolving characteristics",
        };
        f.write_str(s)
    }
}

/// Which of the two data characteristics could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCharacteristic {
    Tx,
    Rx,
    Both,
}

/// Hard failure of a connection attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to find BLE devices: {0}")]
    Enumeration(#[source] TransportError),

    #[error("no BLE devices found")]
    NoDevicesFound,

    #[error("no Biscuit / BLE Mini / BlendMicro / BLE Shield device found")]
    DeviceNotMatched,

    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    #[error("GATT error while {step}: {source}")]
    Gatt {
        step: ConnectStep,
        #[source]
        source: TransportError,
    },

    #[error("service {} not found", SERVICE_UUID)]
    ServiceNotFound,

    #[error("characteristic not found ({missing:?})")]
    CharacteristicNotFound { missing: MissingCharacteristic },
}

impl ConnectError {
    /// Step at which the attempt stopped.
    pub fn step(&self) -> ConnectStep {
        match self {
            Self::Enumeration(_) | Self::NoDevicesFound => ConnectStep::Discovering,
            Self::DeviceNotMatched | Self::Connection(_) => ConnectStep::Selecting,
            Self::Gatt { step, .. } => *step,
            Self::ServiceNotFound => ConnectStep::ResolvingService,
            Self::CharacteristicNotFound { .. } => ConnectStep::ResolvingCharacteristics,
        }
    }

    /// No usable device: either nothing was enumerated or nothing matched.
    pub fn is_device_not_found(&self) -> bool {
        matches!(self, Self::NoDevicesFound | Self::DeviceNotMatched)
    }
}

/// Non-fatal failure while arming RX notifications.
#[derive(Debug, Error)]
pub enum DescriptorConfigError {
    #[error("listing descriptors failed: {0}")]
    List(#[source] TransportError),

    #[error("subscribing to notifications failed: {0}")]
    Subscribe(#[source] TransportError),

    #[error("writing notification config failed: {0}")]
    Write(#[source] TransportError),
}

/// Outcome of notification setup on the RX characteristic.
///
/// Never fails the attempt; the connection can be ready with notifications
/// degraded or missing.
#[derive(Debug)]
pub enum NotificationSetup {
    /// Subscribed and the CCCD was written.
    Armed,
    /// Setup hit an error that was logged and skipped.
    Degraded(DescriptorConfigError),
    /// RX has no client characteristic configuration descriptor.
    NoDescriptor,
}

impl NotificationSetup {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed)
    }
}

/// Devices returned by enumeration, in platform order.
#[derive(Debug)]
pub struct Discovered {
    candidates: Vec<DeviceCandidate>,
}

impl Discovered {
    pub fn new(candidates: Vec<DeviceCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[DeviceCandidate] {
        &self.candidates
    }

    /// Pick the first candidate with an accepted name.
    pub fn select(self, sink: &dyn OutputSink) -> Result<Selected, ConnectError> {
        match self
            .candidates
            .into_iter()
            .find(|c| is_accepted_device_name(&c.name))
        {
            Some(candidate) => {
                debug!("Selected {} ({})", candidate.name, candidate.id);
                Ok(Selected { candidate })
            }
            None => {
                sink.line("Unable to find device Biscuit - has it been paired?");
                Err(ConnectError::DeviceNotMatched)
            }
        }
    }
}

/// An accepted device, not yet connected.
#[derive(Debug)]
pub struct Selected {
    candidate: DeviceCandidate,
}

impl Selected {
    pub fn candidate(&self) -> &DeviceCandidate {
        &self.candidate
    }
}

/// Connected device whose services have not been inspected yet.
pub struct Connected<D> {
    candidate: DeviceCandidate,
    device: D,
}

impl<D: GattDevice> Connected<D> {
    pub fn candidate(&self) -> &DeviceCandidate {
        &self.candidate
    }

    /// Find the RedBear service among the device's services.
    pub async fn resolve_service(
        self,
        sink: &dyn OutputSink,
    ) -> Result<ServiceResolved<D>, ConnectError> {
        let services = self
            .device
            .services()
            .await
            .map_err(|source| ConnectError::Gatt {
                step: ConnectStep::ResolvingService,
                source,
            })?;
        debug!("Device exposes {} service(s)", services.len());

        match services.into_iter().find(|s| s.uuid() == service_uuid()) {
            Some(service) => {
                sink.line(&format!("Found Service: {}", service.uuid()));
                Ok(ServiceResolved {
                    candidate: self.candidate,
                    device: self.device,
                    service,
                })
            }
            None => {
                sink.line("Unable to find Biscuit Service 713d0000");
                Err(ConnectError::ServiceNotFound)
            }
        }
    }
}

/// Device with its RedBear service located.
pub struct ServiceResolved<D: GattDevice> {
    candidate: DeviceCandidate,
    device: D,
    service: D::Service,
}

impl<D: GattDevice> ServiceResolved<D> {
    /// Locate TX and RX, and arm notifications on RX.
    pub async fn resolve_characteristics(
        self,
        sink: &dyn OutputSink,
    ) -> Result<Resolved<D>, ConnectError> {
        let characteristics =
            self.service
                .characteristics()
                .await
                .map_err(|source| ConnectError::Gatt {
                    step: ConnectStep::ResolvingCharacteristics,
                    source,
                })?;

        let mut tx = None;
        let mut rx = None;
        for characteristic in characteristics {
            let uuid = characteristic.uuid();
            if tx.is_none() && uuid == tx_characteristic_uuid() {
                tx = Some(characteristic);
            } else if rx.is_none() && uuid == rx_characteristic_uuid() {
                rx = Some(characteristic);
            }
        }

        match &tx {
            Some(c) => sink.line(&format!("Found characteristic: {}", c.uuid())),
            None => warn!("No TX characteristic {}", tx_characteristic_uuid()),
        }

        let mut armed = None;
        match &rx {
            Some(c) => {
                armed = Some(arm_notifications(c, sink).await);
                sink.line(&format!("Found characteristic: {}", c.uuid()));
            }
            None => warn!("No RX characteristic {}", rx_characteristic_uuid()),
        }

        match (tx, rx, armed) {
            (Some(tx), Some(rx), Some((notifications, inbound))) => Ok(Resolved {
                candidate: self.candidate,
                device: self.device,
                tx,
                rx,
                notifications,
                inbound,
            }),
            (tx, rx, _) => {
                sink.line("Could not find characteristic or permissions are incorrect");
                let missing = match (tx.is_some(), rx.is_some()) {
                    (true, _) => MissingCharacteristic::Rx,
                    (false, true) => MissingCharacteristic::Tx,
                    (false, false) => MissingCharacteristic::Both,
                };
                Err(ConnectError::CharacteristicNotFound { missing })
            }
        }
    }
}

/// Every handle needed for a channel.
pub struct Resolved<D: GattDevice> {
    candidate: DeviceCandidate,
    device: D,
    tx: CharacteristicOf<D>,
    rx: CharacteristicOf<D>,
    notifications: NotificationSetup,
    inbound: Option<NotificationStream>,
}

impl<D: GattDevice> Resolved<D> {
    pub fn notifications(&self) -> &NotificationSetup {
        &self.notifications
    }

    /// Hand the resolved handles over to a channel.
    pub fn into_channel(self, sink: Arc<dyn OutputSink>) -> Channel<D> {
        Channel::new(
            self.candidate.name,
            self.device,
            self.tx,
            self.rx,
            self.notifications,
            self.inbound,
            sink,
        )
    }
}

/// Subscribe to RX and enable notifications through each of its CCCDs.
async fn arm_notifications<C: GattCharacteristic>(
    rx: &C,
    sink: &dyn OutputSink,
) -> (NotificationSetup, Option<NotificationStream>) {
    let descriptors = match rx.descriptors().await {
        Ok(descriptors) => descriptors,
        Err(e) => {
            let e = DescriptorConfigError::List(e);
            sink.line(&format!("Exception: {}", e));
            warn!("Notifications not configured: {}", e);
            return (NotificationSetup::Degraded(e), None);
        }
    };

    let mut setup = NotificationSetup::NoDescriptor;
    let mut stream = None;
    for descriptor in descriptors
        .iter()
        .filter(|d| d.uuid() == notify_descriptor_uuid())
    {
        match enable_notifications(rx, descriptor, &mut stream).await {
            Ok(()) => {
                if !matches!(setup, NotificationSetup::Degraded(_)) {
                    setup = NotificationSetup::Armed;
                }
            }
            Err(e) => {
                sink.line(&format!("Exception: {}", e));
                warn!("Notifications not configured: {}", e);
                setup = NotificationSetup::Degraded(e);
            }
        }
    }

    if let NotificationSetup::NoDescriptor = setup {
        warn!("RX characteristic has no CCCD, inbound messages disabled");
    }
    (setup, stream)
}

async fn enable_notifications<C: GattCharacteristic>(
    rx: &C,
    descriptor: &C::Descriptor,
    stream: &mut Option<NotificationStream>,
) -> Result<(), DescriptorConfigError> {
    if stream.is_none() {
        *stream = Some(
            rx.subscribe()
                .await
                .map_err(DescriptorConfigError::Subscribe)?,
        );
    }
    descriptor
        .write(&ENABLE_NOTIFICATION_VALUE)
        .await
        .map_err(DescriptorConfigError::Write)
}

/// Drives one connection attempt over a transport.
pub struct Connector<T> {
    transport: T,
    sink: Arc<dyn OutputSink>,
    state: Arc<AppState>,
    filter: EnumerationFilter,
}

impl<T: GattTransport> Connector<T> {
    /// Create a connector that enumerates generic-access devices.
    pub fn new(transport: T, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            transport,
            sink,
            state: AppState::new(),
            filter: EnumerationFilter::service(GENERIC_ACCESS_UUID),
        }
    }

    /// Report transitions into a shared application state.
    pub fn with_state(mut self, state: Arc<AppState>) -> Self {
        self.state = state;
        self
    }

    pub fn with_filter(mut self, filter: EnumerationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Enumerate candidate devices.
    pub async fn discover(&self) -> Result<Discovered, ConnectError> {
        let candidates = match self.transport.enumerate(&self.filter).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.sink.line(&format!("Failed to find BLE devices: {}", e));
                return Err(ConnectError::Enumeration(e));
            }
        };

        self.sink
            .line(&format!("Found {} device(s)", candidates.len()));

        if candidates.is_empty() {
            self.sink
                .line("No BLE Devices found - make sure you've paired your device");
            self.sink.line(BLUETOOTH_SETTINGS_HINT);
            return Err(ConnectError::NoDevicesFound);
        }

        Ok(Discovered::new(candidates))
    }

    /// Open a connection to the selected device.
    pub async fn connect(&self, selected: Selected) -> Result<Connected<T::Device>, ConnectError> {
        let candidate = selected.candidate;
        match self.transport.connect(&candidate).await {
            Ok(device) => {
                self.sink.line(&format!("Found Device: {}", candidate.name));
                Ok(Connected { candidate, device })
            }
            Err(e) => {
                self.sink.line(&format!("Connection failed: {}", e));
                Err(ConnectError::Connection(e))
            }
        }
    }

    /// Run every step in order and return a ready channel.
    pub async fn run(&self) -> Result<Channel<T::Device>, ConnectError> {
        match self.run_steps().await {
            Ok(channel) => {
                self.state.set_ready(channel.device_name().to_string());
                self.sink.line(&format!("Ready: connected to {}", channel.device_name()));
                info!("Connected to {}", channel.device_name());
                Ok(channel)
            }
            Err(e) => {
                self.state.set_failed();
                error!("Connection attempt failed while {}: {}", e.step(), e);
                Err(e)
            }
        }
    }

    async fn run_steps(&self) -> Result<Channel<T::Device>, ConnectError> {
        let sink = self.sink.as_ref();

        self.state.set_status(ConnectionStatus::Discovering);
        let discovered = self.discover().await?;

        self.state.set_status(ConnectionStatus::Selecting);
        let selected = discovered.select(sink)?;

        self.state.set_status(ConnectionStatus::Connecting);
        let connected = self.connect(selected).await?;

        self.state.set_status(ConnectionStatus::ResolvingService);
        let service = connected.resolve_service(sink).await?;

        self.state
            .set_status(ConnectionStatus::ResolvingCharacteristics);
        let resolved = service.resolve_characteristics(sink).await?;

        if let NotificationSetup::Degraded(e) = resolved.notifications() {
            warn!("Continuing without confirmed notifications: {}", e);
        }

        Ok(resolved.into_channel(self.sink.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BufferSink;

    fn candidates(names: &[&str]) -> Vec<DeviceCandidate> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceCandidate::new(format!("00:00:00:00:00:{:02X}", i), *name))
            .collect()
    }

    #[test]
    fn test_select_first_accepted() {
        let sink = BufferSink::new();
        let discovered = Discovered::new(candidates(&[
            "Phone",
            "biscuit",
            "BLE Shield",
            "Headset",
            "Biscuit",
        ]));

        let selected = discovered.select(&*sink).unwrap();
        assert_eq!(selected.candidate().name, "BLE Shield");
        assert_eq!(selected.candidate().id, "00:00:00:00:00:02");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_select_no_match() {
        let sink = BufferSink::new();
        let discovered = Discovered::new(candidates(&["Phone", "BLE mini", ""]));

        let err = discovered.select(&*sink).unwrap_err();
        assert!(matches!(err, ConnectError::DeviceNotMatched));
        assert!(err.is_device_not_found());
        assert_eq!(err.step(), ConnectStep::Selecting);
        assert!(sink.contains("Unable to find device Biscuit - has it been paired?"));
    }

    #[test]
    fn test_error_steps() {
        assert_eq!(ConnectError::NoDevicesFound.step(), ConnectStep::Discovering);
        assert_eq!(
            ConnectError::ServiceNotFound.step(),
            ConnectStep::ResolvingService
        );
        assert_eq!(
            ConnectError::CharacteristicNotFound {
                missing: MissingCharacteristic::Tx
            }
            .step(),
            ConnectStep::ResolvingCharacteristics
        );
        assert!(!ConnectError::ServiceNotFound.is_device_not_found());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConnectError::ServiceNotFound.to_string(),
            "service 713d0000-503e-4c75-ba94-3148f18d941e not found"
        );
        let e = ConnectError::Connection(TransportError::Unavailable("gone".into()));
        assert_eq!(e.to_string(), "connection failed: gone");
    }
}
