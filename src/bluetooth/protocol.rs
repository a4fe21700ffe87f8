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

//! Rendering of inbound notification payloads.
//!
//! The BLE Controller sketch answers either with plain text or with a
//! one-letter command echo followed by raw binary data. [`decode`] picks a
//! display form for each payload:
//!
//! * all bytes printable: the payload as text,
//! * printable first byte: `A(0x41), 0x1, 0x2`,
//! * otherwise: `0x0, 0x1`.

/// Prefix used when an inbound message is written to the output sink.
pub const RECEIVED_PREFIX: &str = "r: ";

/// Printable range used by the firmware (space through DEL).
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7F).contains(&byte)
}

/// Render a notification payload for display.
pub fn decode(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| is_printable(*b)) {
        // Printable range is pure ASCII, so this never replaces anything.
        return String::from_utf8_lossy(bytes).into_owned();
    }

    match bytes.split_first() {
        Some((&command, rest)) if is_printable(command) => {
            let mut out = format!("{}(0x{:x})", command as char, command);
            for byte in rest {
                out.push_str(&format!(", 0x{:x}", byte));
            }
            out
        }
        _ => hex_list(bytes),
    }
}

fn hex_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{:x}", b))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single notification received on the RX characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Raw payload as delivered by the peripheral.
    pub bytes: Vec<u8>,
    /// Display form produced by [`decode`].
    pub text: String,
}

impl InboundMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        let text = decode(&bytes);
        Self { bytes, text }
    }

    /// Line written to the output sink for this message.
    pub fn display_line(&self) -> String {
        format!("{}{}", RECEIVED_PREFIX, self.text)
    }
}
