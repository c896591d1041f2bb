//! src/core/types.rs
//!
//! Core type definitions for scan capture
//!
//! This module defines the fundamental types used throughout the application:
//! - `Key`: A keyboard key as seen by the capture session (character, Enter, or named control key)
//! - `KeyTarget`: Where a keystroke was aimed (global vs. the manual-entry field)
//! - `KeystrokeEvent`: A single keystroke with its arrival timestamp
//! - `ParsedPayload`: The structured result of parsing one scan string
//! - `Record`: A persisted QC record built from a parsed scan
//! - `DedupeKey`: The identifier tuple used for duplicate detection
//!
//! Persisted types implement serialization with the field names the CSV
//! export uses (`CaseID`, `SlideID`, ...), so the JSON store and the export
//! agree on naming.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Canonical field key for the case identifier.
pub const FIELD_CASE: &str = "caseid";
/// Canonical field key for the slide identifier.
pub const FIELD_SLIDE: &str = "slideid";
/// Canonical field key for the block identifier.
pub const FIELD_BLOCK: &str = "blockid";
/// Canonical field key for the container identifier.
pub const FIELD_CONTAINER: &str = "containerid";

/// A keyboard key as delivered by the host terminal
///
/// Only three shapes matter to burst detection: printable characters are
/// accumulated, Enter terminates a scan, and everything else (Shift, Escape,
/// arrow keys, ...) is ignored by the detector.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Key {
    /// A single printable character
    Char(char),
    /// The scan terminator
    Enter,
    /// A named control key ("Shift", "Escape", "Tab", ...)
    Other(String),
}

/// Where a keystroke was aimed
///
/// Keystrokes typed into the manual-entry field must not feed the burst
/// buffer, otherwise manual editing would fight the scanner capture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyTarget {
    /// Delivered outside any editable field; eligible for burst capture
    Global,
    /// Delivered to the manual-entry field; invisible to the detector
    EditableField,
}

/// A single keystroke with its arrival timestamp
///
/// The timestamp is carried on the event rather than read from a clock
/// inside the detector, which keeps burst-gap behaviour deterministic in
/// tests: synthetic sequences of `Instant`s drive the 150 ms threshold.
#[derive(Clone, Debug)]
pub struct KeystrokeEvent {
    /// The key that was pressed
    pub key: Key,
    /// Where the keystroke was aimed
    pub target: KeyTarget,
    /// Arrival time of the keystroke
    pub at: Instant,
}

impl KeystrokeEvent {
    /// Creates a globally-targeted keystroke event.
    pub fn global(key: Key, at: Instant) -> Self {
        Self {
            key,
            target: KeyTarget::Global,
            at,
        }
    }

    /// Creates a keystroke event aimed at the manual-entry field.
    pub fn editable(key: Key, at: Instant) -> Self {
        Self {
            key,
            target: KeyTarget::EditableField,
            at,
        }
    }
}

/// Structured result of parsing one scan string
///
/// Always carries the original raw input; the parser stages add zero or more
/// named fields on top (the four identifiers plus any literal keys a
/// key=value payload carried). Immutable once produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedPayload {
    raw: String,
    fields: HashMap<String, String>,
}

impl ParsedPayload {
    /// Creates a payload holding only the raw input.
    ///
    /// Callers are expected to go through `parse_payload`; this is exposed
    /// for the parser and for tests.
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            fields: HashMap::new(),
        }
    }

    /// The original scan string, exactly as emitted by the detector.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Looks up a field by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Looks up a field, treating absence as the empty string.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// The case identifier, or `""` when not populated.
    pub fn case_id(&self) -> &str {
        self.get_or_empty(FIELD_CASE)
    }

    /// The slide identifier, or `""` when not populated.
    pub fn slide_id(&self) -> &str {
        self.get_or_empty(FIELD_SLIDE)
    }

    /// The block identifier, or `""` when not populated.
    pub fn block_id(&self) -> &str {
        self.get_or_empty(FIELD_BLOCK)
    }

    /// The container identifier, or `""` when not populated.
    pub fn container_id(&self) -> &str {
        self.get_or_empty(FIELD_CONTAINER)
    }

    /// True when none of the four identifier fields holds a non-empty
    /// value. An identifier set to `""` (a bare tag, an empty `key=`)
    /// counts as unset: it carries no information worth protecting.
    pub fn no_identifier_set(&self) -> bool {
        self.case_id().is_empty()
            && self.slide_id().is_empty()
            && self.block_id().is_empty()
            && self.container_id().is_empty()
    }

    /// Sets a field unconditionally. Used by the first parser stage, which
    /// has no earlier stage to protect.
    pub(crate) fn set(&mut self, key: String, value: String) {
        self.fields.insert(key, value);
    }

    /// Sets a field unless an earlier stage stored a non-empty value for
    /// it. Later parser stages add fields but never clobber real content;
    /// an empty value is free to be filled in.
    pub(crate) fn set_if_absent(&mut self, key: &str, value: String) {
        if self.get_or_empty(key).is_empty() {
            self.fields.insert(key.to_string(), value);
        }
    }

    /// Number of named fields (excluding the raw string).
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A persisted QC record
///
/// Built from a `ParsedPayload` plus capture metadata; issue type and notes
/// start empty and are filled in by the operator afterwards. Serialized
/// field names match the CSV export header.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Record {
    /// Capture time, ISO-8601
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Operator initials, may be empty
    #[serde(rename = "Operator")]
    pub operator: String,

    #[serde(rename = "CaseID")]
    pub case_id: String,

    #[serde(rename = "SlideID")]
    pub slide_id: String,

    #[serde(rename = "BlockID")]
    pub block_id: String,

    #[serde(rename = "ContainerID")]
    pub container_id: String,

    /// Issue-type label chosen by the operator, empty until annotated
    #[serde(rename = "IssueType")]
    pub issue_type: String,

    /// Free-text notes, empty until annotated
    #[serde(rename = "Notes")]
    pub notes: String,

    /// The raw scan string the record was built from
    #[serde(rename = "Raw")]
    pub raw: String,
}

impl Record {
    /// Builds a record from a parsed payload and capture metadata.
    ///
    /// Absent identifier fields become empty strings; issue type and notes
    /// start empty.
    pub fn from_payload(payload: &ParsedPayload, operator: &str, timestamp: String) -> Self {
        Self {
            timestamp,
            operator: operator.to_string(),
            case_id: payload.case_id().to_string(),
            slide_id: payload.slide_id().to_string(),
            block_id: payload.block_id().to_string(),
            container_id: payload.container_id().to_string(),
            issue_type: String::new(),
            notes: String::new(),
            raw: payload.raw().to_string(),
        }
    }

    /// The identifier tuple used for duplicate detection.
    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey {
            case_id: self.case_id.clone(),
            slide_id: self.slide_id.clone(),
            block_id: self.block_id.clone(),
            container_id: self.container_id.clone(),
        }
    }
}

/// The ordered identifier tuple (case, slide, block, container)
///
/// Two records are duplicates exactly when their tuples match, with empty
/// strings standing in for absent fields. Implements Hash and Eq for use as
/// a HashMap key in the dedupe index.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DedupeKey {
    pub case_id: String,
    pub slide_id: String,
    pub block_id: String,
    pub container_id: String,
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.case_id, self.slide_id, self.block_id, self.container_id
        )
    }
}
