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

//! Text channel over the TX/RX characteristics of a connected board.

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tracing::{debug, warn};

use super::connection::NotificationSetup;
use super::protocol::InboundMessage;
use super::transport::{
    CharacteristicOf, CommunicationStatus, GattCharacteristic, GattDevice, NotificationStream,
    TransportError, WriteMode,
};
use crate::output::OutputSink;

/// Failure to deliver a message to the TX characteristic.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("write completed with status: {0}")]
    Status(CommunicationStatus),
}

/// Live connection to a board, ready for sending.
pub struct Channel<D: GattDevice> {
    device_name: String,
    device: D,
    tx: CharacteristicOf<D>,
    rx: CharacteristicOf<D>,
    notifications: NotificationSetup,
    inbound: Option<NotificationStream>,
    sink: Arc<dyn OutputSink>,
}

impl<D: GattDevice> Channel<D> {
    pub(crate) fn new(
        device_name: String,
        device: D,
        tx: CharacteristicOf<D>,
        rx: CharacteristicOf<D>,
        notifications: NotificationSetup,
        inbound: Option<NotificationStream>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            device_name,
            device,
            tx,
            rx,
            notifications,
            inbound,
            sink,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn notifications(&self) -> &NotificationSetup {
        &self.notifications
    }

    pub fn tx(&self) -> &CharacteristicOf<D> {
        &self.tx
    }

    pub fn rx(&self) -> &CharacteristicOf<D> {
        &self.rx
    }

    /// Write `text` to TX without waiting for an acknowledgment.
    ///
    /// An empty string still issues a zero-length write.
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        let result = match self
            .tx
            .write(text.as_bytes(), WriteMode::WithoutResponse)
            .await
        {
            Ok(status) if status.is_success() => Ok(()),
            Ok(status) => Err(SendError::Status(status)),
            Err(e) => Err(SendError::Transport(e)),
        };

        match &result {
            Ok(()) => {
                debug!("Sent {} bytes", text.len());
                self.sink.line(&format!("Sent message: {}", text));
            }
            Err(e) => {
                warn!("Send failed: {}", e);
                self.sink.line(&format!("Unable to send message: {}", e));
            }
        }

        result
    }

    /// Take the inbound message stream.
    ///
    /// Returns `None` on later calls, or when notifications could not be
    /// subscribed.
    pub fn take_inbound(&mut self) -> Option<Inbound> {
        self.inbound
            .take()
            .map(|notifications| Inbound::new(notifications, self.sink.clone()))
    }

    /// Disconnect from the board.
    pub async fn close(self) -> Result<(), TransportError> {
        self.device.disconnect().await
    }
}

pin_project! {
    /// Decoded notifications from RX, in arrival order.
    ///
    /// Each message is also written to the output sink as an `r: ` line.
    pub struct Inbound {
        #[pin]
        notifications: NotificationStream,
        sink: Arc<dyn OutputSink>,
    }
}

impl Inbound {
    pub fn new(notifications: NotificationStream, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            notifications,
            sink,
        }
    }
}

impl Stream for Inbound {
    type Item = InboundMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.notifications.poll_next(cx)) {
            Some(bytes) => {
                let message = InboundMessage::new(bytes);
                this.sink.line(&message.display_line());
                Poll::Ready(Some(message))
            }
            None => Poll::Ready(None),
        }
    }
}
