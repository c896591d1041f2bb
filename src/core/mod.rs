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

//! src/core/mod.rs
//!
//! Core business logic module
//!
//! This module contains the fundamental data structures and algorithms
//! for scan capture, including:
//! - Type definitions for keystrokes, payloads and records
//! - Burst detection over a raw keystroke stream
//! - Layered payload parsing with fixed stage precedence
//! - Duplicate detection using HashMap-based O(1) lookup
//!
//! All business logic is isolated from UI and I/O concerns to enable
//! comprehensive unit testing without a terminal or a real clock.

pub mod dedupe;
pub mod detector;
pub mod parser;
pub mod types;

pub use dedupe::DedupeIndex;
pub use detector::{ScanDetector, BURST_GAP};
pub use parser::parse_payload;
pub use types::*;

#[cfg(test)]
mod tests;
