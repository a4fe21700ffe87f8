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

//! Application state management.

use parking_lot::RwLock;
use std::sync::Arc;

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Discovering,
    Selecting,
    Connecting,
    ResolvingService,
    ResolvingCharacteristics,
    Ready,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "Idle",
            ConnectionStatus::Discovering => "Discovering devices...",
            ConnectionStatus::Selecting => "Selecting device...",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::ResolvingService => "Resolving service...",
            ConnectionStatus::ResolvingCharacteristics => "Resolving characteristics...",
            ConnectionStatus::Ready => "Ready",
            ConnectionStatus::Failed => "Failed",
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Whether text entry and sending are enabled.
    pub input_enabled: RwLock<bool>,

    /// Connected device name.
    pub connected_device: RwLock<Option<String>>,

    /// Last decoded message from the peripheral.
    pub last_text: RwLock<Option<String>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Idle),
            input_enabled: RwLock::new(false),
            connected_device: RwLock::new(None),
            last_text: RwLock::new(None),
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.connection_status.write() = status;
    }

    pub fn set_ready(&self, device_name: String) {
        *self.connection_status.write() = ConnectionStatus::Ready;
        *self.connected_device.write() = Some(device_name);
        *self.input_enabled.write() = true;
    }

    pub fn set_failed(&self) {
        *self.connection_status.write() = ConnectionStatus::Failed;
        *self.input_enabled.write() = false;
    }

    pub fn is_input_enabled(&self) -> bool {
        *self.input_enabled.read()
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.connected_device.read().clone()
    }

    pub fn set_last_text(&self, text: String) {
        *self.last_text.write() = Some(text);
    }

    pub fn get_last_text(&self) -> Option<String> {
        self.last_text.read().clone()
    }
}
