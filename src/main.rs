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

//! RedBear BLE terminal.
//!
//! Connects to the first paired RedBear board, then sends every stdin line to
//! it and prints whatever it sends back.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redbear_terminal::bluetooth::{BluezTransport, Connector};
use redbear_terminal::config::Config;
use redbear_terminal::output::{ChannelSink, FanoutSink, OutputSink, TracingSink};
use redbear_terminal::state::AppState;
use redbear_terminal::terminal::run_session;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the terminal output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.logging.filter.parse()?),
        )
        .init();

    info!(
        "Starting RedBear terminal v{}...",
        env!("CARGO_PKG_VERSION")
    );

    let (channel_sink, lines) = ChannelSink::new();
    let sinks: Vec<Arc<dyn OutputSink>> = vec![Arc::new(channel_sink), Arc::new(TracingSink)];
    let sink: Arc<dyn OutputSink> = Arc::new(FanoutSink::new(sinks));

    let printer = tokio::spawn(async move {
        while let Ok(line) = lines.recv().await {
            println!("{}", line);
        }
    });

    let result = run(&config, sink).await;

    // All sink handles are gone once run() returns; drain remaining lines.
    let _ = printer.await;

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    info!("RedBear terminal stopped");
    result
}

async fn run(config: &Config, sink: Arc<dyn OutputSink>) -> Result<()> {
    let state = AppState::new();

    let transport = BluezTransport::new(&config.bluetooth).await?;
    let connector = Connector::new(transport, sink)
        .with_state(state.clone())
        .with_filter(config.enumeration_filter());

    let channel = connector.run().await?;

    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_session(channel, state, input, shutdown).await
}
