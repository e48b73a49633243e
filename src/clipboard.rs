// Copyright 2025 Dustin McAfee
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

//! Clipboard relay: tracks the captured display's PRIMARY/CLIPBOARD
//! selections and mirrors changes to/from the viewer, either as legacy
//! `ClientCutText`/`ServerCutText` or the extended-clipboard protocol's
//! chunked form. Absent from the teacher entirely (`client.rs` only has a
//! bare `ClientCutText -> String -> ClientEvent::CutText` passthrough with
//! no selection-kind distinction and no echo suppression); built fresh
//! against the selection/cookie model in `original_source`'s
//! `ltsm_tools.*`.

use crate::error::{Result, VncError};
use log::{debug, warn};
use std::collections::HashMap;

/// Default cap on a single clipboard payload (RFB extended-clipboard
/// protocol has no built-in limit; this engine enforces one).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Which X selection a clipboard update concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    /// The `PRIMARY` selection (mouse-drag select).
    Primary,
    /// The `CLIPBOARD` selection (explicit copy).
    Clipboard,
}

struct InFlightChunk {
    total: u32,
    received: Vec<u8>,
}

/// Tracks clipboard state for one session: the last cookie this server
/// used per selection (for echo suppression) and any in-progress chunked
/// extended-clipboard transfer.
pub struct ClipboardRelay {
    max_payload: usize,
    own_cookies: HashMap<SelectionKind, u64>,
    in_flight: Option<InFlightChunk>,
}

impl ClipboardRelay {
    /// Creates a relay with the default payload cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PAYLOAD)
    }

    /// Creates a relay with a custom payload cap.
    #[must_use]
    pub fn with_limit(max_payload: usize) -> Self {
        Self { max_payload, own_cookies: HashMap::new(), in_flight: None }
    }

    /// Records that this server just set `kind`'s selection to a value
    /// tagged with `cookie`, so a later `observe_selection_change` echoing
    /// that cookie back is recognized and dropped.
    pub fn note_own_set(&mut self, kind: SelectionKind, cookie: u64) {
        self.own_cookies.insert(kind, cookie);
    }

    /// Called when the capture collaborator reports a selection change.
    /// Returns `Some(bytes)` to forward to the viewer, or `None` if this
    /// is an echo of a change the server itself just made.
    pub fn observe_selection_change(&mut self, kind: SelectionKind, bytes: Vec<u8>, cookie: u64) -> Option<Vec<u8>> {
        if self.own_cookies.get(&kind) == Some(&cookie) {
            debug!("dropping clipboard echo for {kind:?} (cookie {cookie})");
            return None;
        }
        Some(bytes)
    }

    /// Handles a legacy (non-chunked) `ClientCutText` payload, returning
    /// the text to apply to `SelectionKind::Clipboard`.
    pub fn receive_legacy_cut_text(&mut self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        if bytes.len() > self.max_payload {
            return Err(VncError::ClipboardTooLarge(bytes.len(), self.max_payload));
        }
        Ok(bytes)
    }

    /// Handles one chunk of an extended-clipboard transfer. Returns
    /// `Some(complete_payload)` once every chunk has arrived.
    pub fn receive_chunk(&mut self, total: u32, offset: u32, chunk: &[u8]) -> Result<Option<Vec<u8>>> {
        if total as usize > self.max_payload {
            self.in_flight = None;
            return Err(VncError::ClipboardTooLarge(total as usize, self.max_payload));
        }

        let slot = self.in_flight.get_or_insert_with(|| InFlightChunk { total, received: Vec::with_capacity(total as usize) });
        if slot.total != total {
            warn!("extended clipboard transfer restarted mid-flight (total changed {} -> {})", slot.total, total);
            *slot = InFlightChunk { total, received: Vec::with_capacity(total as usize) };
        }

        let end = offset as usize + chunk.len();
        if end > total as usize {
            self.in_flight = None;
            return Err(VncError::ProtocolViolation("extended clipboard chunk exceeds declared total".into()));
        }
        if slot.received.len() < end {
            slot.received.resize(end, 0);
        }
        slot.received[offset as usize..end].copy_from_slice(chunk);

        if slot.received.len() as u32 >= total {
            let InFlightChunk { received, .. } = self.in_flight.take().unwrap();
            Ok(Some(received))
        } else {
            Ok(None)
        }
    }
}

impl Default for ClipboardRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_echo_is_suppressed() {
        let mut relay = ClipboardRelay::new();
        relay.note_own_set(SelectionKind::Clipboard, 42);
        assert_eq!(relay.observe_selection_change(SelectionKind::Clipboard, b"hello".to_vec(), 42), None);
    }

    #[test]
    fn foreign_change_passes_through() {
        let mut relay = ClipboardRelay::new();
        relay.note_own_set(SelectionKind::Clipboard, 42);
        assert_eq!(relay.observe_selection_change(SelectionKind::Clipboard, b"hi".to_vec(), 7), Some(b"hi".to_vec()));
    }

    #[test]
    fn legacy_text_over_limit_is_rejected() {
        let mut relay = ClipboardRelay::with_limit(4);
        assert!(relay.receive_legacy_cut_text(vec![0u8; 5]).is_err());
    }

    #[test]
    fn chunked_transfer_reassembles_in_order() {
        let mut relay = ClipboardRelay::with_limit(1024);
        assert_eq!(relay.receive_chunk(10, 0, b"hello").unwrap(), None);
        let complete = relay.receive_chunk(10, 5, b"world").unwrap();
        assert_eq!(complete, Some(b"helloworld".to_vec()));
    }

    #[test]
    fn chunked_transfer_over_limit_is_rejected() {
        let mut relay = ClipboardRelay::with_limit(4);
        assert!(relay.receive_chunk(100, 0, b"xx").is_err());
    }
}
