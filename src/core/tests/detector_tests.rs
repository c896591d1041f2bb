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

//! Burst detector tests
//!
//! Drives the detector with synthetic keystroke sequences and hand-built
//! timestamps, so the 150 ms segmentation threshold is exercised without a
//! real clock:
//! - Single-burst accumulation and Enter emission
//! - Buffer reset on gap overrun
//! - Editable-field suppression
//! - Control-key and whitespace edge cases

use crate::core::detector::ScanDetector;
use crate::core::types::{Key, KeystrokeEvent};
use std::time::{Duration, Instant};

/// Builds a sequence of global keystrokes spaced `gap_ms` apart.
fn burst(keys: &[Key], start: Instant, gap_ms: u64) -> Vec<KeystrokeEvent> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            KeystrokeEvent::global(key.clone(), start + Duration::from_millis(gap_ms * i as u64))
        })
        .collect()
}

fn chars(s: &str) -> Vec<Key> {
    s.chars().map(Key::Char).collect()
}

#[test]
fn test_single_burst_emits_full_string() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    let mut keys = chars("ABC");
    keys.push(Key::Enter);

    let mut emitted = Vec::new();
    for event in burst(&keys, start, 10) {
        if let Some(scan) = detector.handle_key(&event) {
            emitted.push(scan);
        }
    }

    assert_eq!(emitted, vec!["ABC".to_string()]);
}

#[test]
fn test_gap_overrun_discards_stale_prefix() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    // A and B arrive 10 ms apart, then a 300 ms pause, then C and Enter.
    let events = vec![
        KeystrokeEvent::global(Key::Char('A'), start),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(10)),
        KeystrokeEvent::global(Key::Char('C'), start + Duration::from_millis(310)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(320)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["C".to_string()], "AB should have been discarded");
}

#[test]
fn test_gap_exactly_at_threshold_keeps_buffer() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    // 150 ms is not "> 150 ms"; the buffer survives.
    let events = vec![
        KeystrokeEvent::global(Key::Char('A'), start),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(150)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(160)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["AB".to_string()]);
}

#[test]
fn test_empty_buffer_enter_emits_nothing() {
    let mut detector = ScanDetector::new();
    let event = KeystrokeEvent::global(Key::Enter, Instant::now());

    assert_eq!(detector.handle_key(&event), None);
}

#[test]
fn test_whitespace_only_buffer_emits_nothing() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    let mut keys = chars("   ");
    keys.push(Key::Enter);

    let emitted: Vec<String> = burst(&keys, start, 5)
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert!(emitted.is_empty());
}

#[test]
fn test_payload_is_trimmed_on_emission() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    let mut keys = chars("  XY Z ");
    keys.push(Key::Enter);

    let emitted: Vec<String> = burst(&keys, start, 5)
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["XY Z".to_string()]);
}

#[test]
fn test_terminator_never_appended() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    let mut keys = chars("A");
    keys.push(Key::Enter);
    keys.extend(chars("B"));
    keys.push(Key::Enter);

    let emitted: Vec<String> = burst(&keys, start, 10)
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn test_burst_immediately_after_emission_is_fresh() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    // Second burst starts 20 ms after the terminator, well under the gap;
    // it must still be fresh because emission cleared the buffer.
    let events = vec![
        KeystrokeEvent::global(Key::Char('A'), start),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(10)),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(30)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(40)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn test_control_keys_are_ignored() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    let events = vec![
        KeystrokeEvent::global(Key::Other("Shift".to_string()), start),
        KeystrokeEvent::global(Key::Char('A'), start + Duration::from_millis(5)),
        KeystrokeEvent::global(Key::Other("Escape".to_string()), start + Duration::from_millis(10)),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(15)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(20)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["AB".to_string()]);
}

#[test]
fn test_editable_field_events_are_invisible() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    // Manual typing into the entry field, slow, interleaved with a scan
    // burst. The manual keystrokes must neither pollute the buffer nor
    // reset the gap clock.
    let events = vec![
        KeystrokeEvent::global(Key::Char('A'), start),
        KeystrokeEvent::editable(Key::Char('x'), start + Duration::from_millis(5)),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(10)),
        KeystrokeEvent::editable(Key::Enter, start + Duration::from_millis(12)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(20)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["AB".to_string()]);
}

#[test]
fn test_reset_discards_pending_burst() {
    let mut detector = ScanDetector::new();
    let start = Instant::now();

    detector.handle_key(&KeystrokeEvent::global(Key::Char('A'), start));
    assert_eq!(detector.pending_len(), 1);

    detector.reset();
    assert_eq!(detector.pending_len(), 0);

    let emitted = detector.handle_key(&KeystrokeEvent::global(
        Key::Enter,
        start + Duration::from_millis(5),
    ));
    assert_eq!(emitted, None);
}

#[test]
fn test_custom_gap_threshold() {
    let mut detector = ScanDetector::with_gap(Duration::from_millis(50));
    let start = Instant::now();

    let events = vec![
        KeystrokeEvent::global(Key::Char('A'), start),
        KeystrokeEvent::global(Key::Char('B'), start + Duration::from_millis(80)),
        KeystrokeEvent::global(Key::Enter, start + Duration::from_millis(90)),
    ];

    let emitted: Vec<String> = events
        .iter()
        .filter_map(|e| detector.handle_key(e))
        .collect();

    assert_eq!(emitted, vec!["B".to_string()], "A fell outside the tightened gap");
}
