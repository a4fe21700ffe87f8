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

//! Interactive session over a ready channel.

use anyhow::Result;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::bluetooth::{Channel, GattDevice};
use crate::state::AppState;

/// Send every input line to the board until input ends, reading fails or
/// `shutdown` resolves.
///
/// The inbound task is stopped and the device disconnected on every exit
/// path, including a read error, which is then returned.
pub async fn run_session<D, R, S>(
    mut channel: Channel<D>,
    state: Arc<AppState>,
    input: R,
    shutdown: S,
) -> Result<()>
where
    D: GattDevice,
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    if !channel.notifications().is_armed() {
        warn!("Replies from the board may not be shown");
    }

    let receiver = channel.take_inbound().map(|mut inbound| {
        let state = state.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.next().await {
                state.set_last_text(message.text);
            }
            info!("Notification stream ended");
        })
    });

    let mut lines = input.lines();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(text)) => {
                    if !state.is_input_enabled() {
                        continue;
                    }
                    // Failures are already reported on the output sink
                    let _ = channel.send(&text).await;
                }
                Ok(None) => {
                    info!("End of input");
                    break Ok(());
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break Err(e.into());
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break Ok(());
            }
        }
    };

    // Dropping the inbound stream releases its output sink handle
    if let Some(receiver) = receiver {
        receiver.abort();
        let _ = receiver.await;
    }

    if let Err(e) = channel.close().await {
        warn!("Disconnect failed: {}", e);
    }

    result
}
