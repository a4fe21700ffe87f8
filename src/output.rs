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

//! Output sinks for status and received-message lines.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Append-only line output. Writing never fails observably.
pub trait OutputSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Writes every line to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, text: &str) {
        info!(target: "redbear_terminal::output", "{}", text);
    }
}

/// Forwards lines to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: async_channel::Sender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, async_channel::Receiver<String>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl OutputSink for ChannelSink {
    fn line(&self, text: &str) {
        // Receiver gone means nobody is displaying output anymore.
        let _ = self.tx.try_send(text.to_string());
    }
}

/// Keeps every line in memory, like a text area.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines.lock().iter().any(|l| l == text)
    }
}

impl OutputSink for BufferSink {
    fn line(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Duplicates every line to several sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn OutputSink>>) -> Self {
        Self { sinks }
    }
}

impl OutputSink for FanoutSink {
    fn line(&self, text: &str) {
        for sink in &self.sinks {
            sink.line(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_order() {
        let (sink, rx) = ChannelSink::new();
        sink.line("Found 1 device(s)");
        sink.line("Found Device: Biscuit");

        assert_eq!(rx.try_recv().unwrap(), "Found 1 device(s)");
        assert_eq!(rx.try_recv().unwrap(), "Found Device: Biscuit");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic
        sink.line("dropped");
    }

    #[test]
    fn test_fanout() {
        let a = BufferSink::new();
        let b = BufferSink::new();
        let sinks: Vec<Arc<dyn OutputSink>> = vec![a.clone(), b.clone(), Arc::new(TracingSink)];
        let fanout = FanoutSink::new(sinks);

        fanout.line("hello");

        assert_eq!(a.lines(), vec!["hello".to_string()]);
        assert!(b.contains("hello"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_sink_logs_at_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.line("Found Service: 713d0000");
        });

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("INFO"));
        assert!(output.contains("Found Service: 713d0000"));
    }
}
