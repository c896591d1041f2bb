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

//! QC Scan Capture
//!
//! A single-station capture tool that turns barcode-scanner keystroke
//! bursts into structured quality-control records, lets the operator
//! annotate them, and exports them as CSV. No server, no network: state
//! lives in memory plus two JSON files in a local data directory.
//!
//! # Features
//!
//! - **Burst Detection:** HID scanners type like lightning; a 150 ms
//!   inter-keystroke gap separates scanner bursts from human typing
//! - **Layered Parsing:** key=value pairs, CSV key:value pairs, prefix
//!   tags (SLD/BLK/CNT/CS/CASE), heuristic case-id extraction, and a
//!   catch-all so no scan is ever dropped
//! - **Duplicate Rejection:** O(1) identifier-tuple dedupe with an audio
//!   cue, toggleable at capture time
//! - **Write-Through Store:** every mutation is atomically persisted
//! - **CSV Export:** quoted, spreadsheet-safe, date-stamped filename
//!
//! # Architecture
//!
//! - **`core`:** Business logic (types, burst detector, payload parser,
//!   dedupe index); no I/O, no terminal, no clock
//! - **`store`:** Persisted record and issue-type lists (JSON, atomic writes)
//! - **`export`:** CSV rendering and file output
//! - **`ui`:** Terminal capture session and audio feedback
//!
//! # Examples
//!
//! ## Parsing a scan payload
//!
//! ```
//! use qc_capture::core::parse_payload;
//!
//! let payload = parse_payload("SLD:25-12345-A1");
//! assert_eq!(payload.slide_id(), "25-12345-A1");
//! ```
//!
//! ## Detecting scan bursts
//!
//! ```
//! use qc_capture::core::{Key, KeystrokeEvent, ScanDetector};
//! use std::time::Instant;
//!
//! let mut detector = ScanDetector::new();
//! let start = Instant::now();
//!
//! detector.handle_key(&KeystrokeEvent::global(Key::Char('A'), start));
//! let scan = detector.handle_key(&KeystrokeEvent::global(Key::Enter, start));
//! assert_eq!(scan.as_deref(), Some("A"));
//! ```

pub mod core;
pub mod export;
pub mod store;
pub mod ui;

// Re-export commonly used types for convenience
pub use core::{parse_payload, DedupeIndex, ParsedPayload, Record, ScanDetector};
pub use store::RecordStore;
