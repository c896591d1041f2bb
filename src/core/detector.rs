// Copyright 2026 qc-capture developers
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

//! src/core/detector.rs
//!
//! Scan-burst detection
//!
//! HID barcode scanners present as keyboards and type their payload as a
//! rapid burst of keystrokes ending with Enter. This module groups a raw
//! keystroke stream into discrete completed-scan strings using the
//! inter-keystroke gap: scanner keystrokes arrive a few milliseconds apart,
//! human typing does not.
//!
//! The detector owns the in-progress burst buffer explicitly (no ambient
//! state), and reads time from the events themselves, so segmentation logic
//! is unit-testable with synthetic event sequences and no real clock.

use std::time::Duration;

use crate::core::types::{Key, KeyTarget, KeystrokeEvent};

/// Inter-keystroke gap above which the buffer is treated as stale.
///
/// 150 ms comfortably exceeds scanner inter-character timing while staying
/// below the cadence of even fast human typing.
pub const BURST_GAP: Duration = Duration::from_millis(150);

/// Groups a keystroke stream into completed scan strings.
///
/// Feed every keystroke to [`ScanDetector::handle_key`]; it returns
/// `Some(scan)` exactly when a burst completed on this keystroke. The
/// accumulation buffer is private and never survives an emission or a
/// burst gap.
#[derive(Debug)]
pub struct ScanDetector {
    /// Characters accumulated during the current burst
    buffer: String,
    /// Arrival time of the previous non-ignored keystroke
    last_key_at: Option<std::time::Instant>,
    /// Gap threshold separating bursts
    gap: Duration,
}

impl ScanDetector {
    /// Creates a detector with the standard 150 ms burst gap.
    ///
    /// State starts empty; nothing is carried over from previous runs.
    pub fn new() -> Self {
        Self::with_gap(BURST_GAP)
    }

    /// Creates a detector with a custom burst gap. Exists for tests that
    /// want tighter or looser segmentation.
    pub fn with_gap(gap: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_key_at: None,
            gap,
        }
    }

    /// Processes one keystroke, returning a completed scan when this
    /// keystroke terminated a non-empty burst.
    ///
    /// Rules, in order:
    /// - Keystrokes aimed at an editable field are ignored entirely; they
    ///   neither touch the buffer nor count for gap tracking.
    /// - A gap above the threshold since the previous non-ignored keystroke
    ///   clears the buffer before this key is processed (new burst).
    /// - Enter emits the trimmed buffer when non-empty and always clears it;
    ///   the terminator itself is never appended.
    /// - Any single character is appended; named control keys are ignored.
    pub fn handle_key(&mut self, event: &KeystrokeEvent) -> Option<String> {
        if event.target == KeyTarget::EditableField {
            return None;
        }

        // Stale buffer check before processing the current key. The very
        // first keystroke has no predecessor and starts a burst trivially.
        if let Some(last) = self.last_key_at {
            if event.at.saturating_duration_since(last) > self.gap {
                self.buffer.clear();
            }
        }
        self.last_key_at = Some(event.at);

        match &event.key {
            Key::Enter => {
                let scan = self.buffer.trim().to_string();
                self.buffer.clear();
                if scan.is_empty() {
                    None
                } else {
                    tracing::debug!(len = scan.len(), "scan burst completed");
                    Some(scan)
                }
            }
            Key::Char(c) => {
                self.buffer.push(*c);
                None
            }
            // Shift, Escape, arrows, function keys: not part of a payload
            Key::Other(_) => None,
        }
    }

    /// Discards any in-progress burst.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_key_at = None;
    }

    /// Length of the in-progress burst. Diagnostic only; the buffer content
    /// is never exposed.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for ScanDetector {
    fn default() -> Self {
        Self::new()
    }
}
