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

//! src/core/parser.rs
//!
//! Scan payload parser
//!
//! Maps a completed scan string to structured identifier fields. Barcode
//! content in the wild is inconsistent, so parsing is a layered set of
//! pattern-matching strategies with fixed precedence:
//!
//! 1. Delimited key=value pairs (`case=25-12345&slide=A1`)
//! 2. CSV key:value pairs (`case:25-12345,slide:A1`)
//! 3. Prefix tags (`SLD:24-12345-A1`, `BLK#B03`, `CNT XYZ123`, `CS:24-12345`)
//! 4. Heuristic case-id extraction (`25-12345` anywhere in the string)
//! 5. Catch-all: anything unrecognised becomes the container identifier
//!
//! Each stage may add fields but never clobbers a non-empty value an
//! earlier stage set; an identifier left empty (a bare tag, an empty
//! `key=`) is still up for grabs by a later stage. Parsing never fails:
//! every input degrades to at least the catch-all assignment. The function is pure and deterministic, so identical scans
//! always produce identical payloads.
//!
//! # Architecture
//! The prefix-tag stage uses nom combinators; the tag alternation checks
//! `CASE` before `CS` because alternation takes the first match and the
//! longer token must win. The heuristic stage uses a regex over the whole
//! string.

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::one_of,
    combinator::{map, opt, rest},
    IResult, Parser,
};
use regex::Regex;
use std::sync::OnceLock;

use crate::core::types::{
    ParsedPayload, FIELD_BLOCK, FIELD_CASE, FIELD_CONTAINER, FIELD_SLIDE,
};

/// Identifier family selected by a prefix tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdTag {
    /// `CS` / `CASE`
    Case,
    /// `SLD`
    Slide,
    /// `BLK`
    Block,
    /// `CNT`
    Container,
}

impl IdTag {
    /// The payload field this tag populates.
    pub fn field(self) -> &'static str {
        match self {
            IdTag::Case => FIELD_CASE,
            IdTag::Slide => FIELD_SLIDE,
            IdTag::Block => FIELD_BLOCK,
            IdTag::Container => FIELD_CONTAINER,
        }
    }
}

/// Parses one scan string into structured fields.
///
/// Applies the five stages in order; see the module docs. The result always
/// contains the raw input, and at least the container identifier when no
/// structured markers were recognised.
///
/// # Example
/// ```
/// use qc_capture::core::parser::parse_payload;
///
/// let payload = parse_payload("case=25-12345&slide=A1");
/// assert_eq!(payload.case_id(), "25-12345");
/// assert_eq!(payload.slide_id(), "A1");
/// ```
pub fn parse_payload(raw: &str) -> ParsedPayload {
    let mut payload = ParsedPayload::new(raw);

    stage_delimited_pairs(raw, &mut payload);
    stage_csv_pairs(raw, &mut payload);
    stage_prefix_tag(raw, &mut payload);
    stage_case_heuristic(raw, &mut payload);
    stage_catch_all(raw, &mut payload);

    payload
}

/// Stage 1: delimited key=value pairs.
///
/// Runs when the string contains `&` or `=`. Splits on `&`, then each piece
/// on its first `=`. Keys are lower-cased and trimmed; values are trimmed
/// and percent-decoded. Pieces without a `=` are skipped silently.
///
/// Keys naming one of the four identifier families (`case`, `slide`,
/// `block`, `container`, with or without the `id` suffix) also populate the
/// canonical identifier field. Repeated keys are last-wins, for the
/// literal key and the canonical field alike.
fn stage_delimited_pairs(raw: &str, payload: &mut ParsedPayload) {
    if !raw.contains('&') && !raw.contains('=') {
        return;
    }

    for piece in raw.split('&') {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = percent_decode(value.trim());

        if let Some(field) = canonical_field(&key) {
            payload.set(field.to_string(), value.clone());
        }
        payload.set(key, value);
    }
}

/// Stage 2: CSV key:value pairs.
///
/// Runs when the string contains both `:` and `,`. Splits on `,`, then each
/// piece on its first `:`. Both sides must be non-empty after trimming to be
/// recorded. Never overwrites a non-empty field from stage 1.
fn stage_csv_pairs(raw: &str, payload: &mut ParsedPayload) {
    if !raw.contains(':') || !raw.contains(',') {
        return;
    }

    for piece in raw.split(',') {
        let Some((key, value)) = piece.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        if let Some(field) = canonical_field(&key) {
            payload.set_if_absent(field, value.to_string());
        }
        payload.set_if_absent(&key, value.to_string());
    }
}

/// Stage 3: leading prefix tag.
///
/// Recognises `SLD`, `BLK`, `CNT`, `CS` and `CASE` (case-insensitive) at
/// the start of the string, optionally followed by one of `:`, `#`, `-` or
/// a space; the remainder is the value. Sets exactly one identifier field,
/// and only when no earlier stage gave it a non-empty value.
fn stage_prefix_tag(raw: &str, payload: &mut ParsedPayload) {
    if let Ok((_, (tag, value))) = parse_prefix_tag(raw) {
        payload.set_if_absent(tag.field(), value.to_string());
    }
}

/// Stage 4: heuristic case-id extraction.
///
/// When no non-empty case identifier is set yet and the string contains a
/// two-digit–dash–five-digit run, the longest contiguous run starting at
/// that pattern (trailing uppercase alphanumerics and hyphens included)
/// becomes the case identifier.
fn stage_case_heuristic(raw: &str, payload: &mut ParsedPayload) {
    if !payload.case_id().is_empty() {
        return;
    }
    if let Some(found) = case_id_pattern().find(raw) {
        payload.set_if_absent(FIELD_CASE, found.as_str().trim().to_string());
    }
}

/// Stage 5: catch-all.
///
/// When no identifier field holds a non-empty value after all prior
/// stages, the entire original string becomes the container identifier.
/// Guarantees every scan lands somewhere rather than being dropped.
fn stage_catch_all(raw: &str, payload: &mut ParsedPayload) {
    if payload.no_identifier_set() {
        payload.set_if_absent(FIELD_CONTAINER, raw.to_string());
    }
}

/// Parses a leading identifier tag and its value.
///
/// Grammar: `TAG [:#- ]? VALUE`, where TAG is one of the five recognised
/// tokens. The separator is optional (`CS24-12345` is accepted), and the
/// value is the trimmed remainder of the string, possibly empty.
pub fn parse_prefix_tag(input: &str) -> IResult<&str, (IdTag, &str)> {
    let (input, tag) = parse_tag_token(input)?;
    let (input, _) = opt(one_of(":#- ")).parse(input)?;
    let (input, value) = rest(input)?;

    Ok((input, (tag, value.trim())))
}

/// Parses the tag token itself.
///
/// `CASE` must come before `CS` in the alternation: both start with `C`,
/// alternation takes the first success, and the longer token has to win.
fn parse_tag_token(input: &str) -> IResult<&str, IdTag> {
    map(
        alt((
            tag_no_case("CASE"), // Must come before "CS" due to being a longer match
            tag_no_case("SLD"),
            tag_no_case("BLK"),
            tag_no_case("CNT"),
            tag_no_case("CS"),
        )),
        |s: &str| match s.to_ascii_uppercase().as_str() {
            "SLD" => IdTag::Slide,
            "BLK" => IdTag::Block,
            "CNT" => IdTag::Container,
            _ => IdTag::Case,
        },
    )
    .parse(input)
}

/// Maps a lower-cased literal key to its canonical identifier field.
///
/// Barcode producers write both `case=...` and `caseid=...`; both shapes
/// feed the same identifier.
fn canonical_field(key: &str) -> Option<&'static str> {
    match key {
        "case" | "caseid" => Some(FIELD_CASE),
        "slide" | "slideid" => Some(FIELD_SLIDE),
        "block" | "blockid" => Some(FIELD_BLOCK),
        "container" | "containerid" => Some(FIELD_CONTAINER),
        _ => None,
    }
}

/// The heuristic case-id pattern: `\d{2}-\d{5}` plus any trailing
/// uppercase alphanumerics and hyphens. Compiled once.
fn case_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d{2}-\d{5}[A-Z0-9-]*").expect("case id pattern should be valid regex")
    })
}

/// Decodes `%HH` escapes in a payload value.
///
/// Malformed sequences (truncated or non-hex) pass through untouched, and
/// decoded bytes that do not form valid UTF-8 are replaced rather than
/// rejected: parsing never fails.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}
