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

//! Interactive capture session
//!
//! Runs the terminal in raw mode and feeds every keystroke to the burst
//! detector. Scanner bursts are captured globally; a manual-entry line can
//! be focused with Tab, and its keystrokes are marked as editable-field
//! input so the detector ignores them — manual submissions bypass burst
//! detection but go through the same parse → dedupe → append path.
//!
//! Session keys:
//! - `Tab`    toggle the manual-entry line
//! - `F1`-`F8` tag the newest record with the corresponding issue type
//! - `Ctrl+D` toggle duplicate rejection
//! - `Ctrl+B` toggle audio cues
//! - `Ctrl+E` export CSV to the current directory
//! - `Ctrl+X` delete the newest record
//! - `Esc`    leave manual entry, or quit the session
//!
//! Function keys carry the annotation workflow because anything printable
//! belongs to the scanner: a barcode burst is indistinguishable from an
//! operator hitting a letter or digit shortcut. Free-text notes and edits
//! to older records go through the `annotate` CLI command instead.

use chrono::Local;
use colored::*;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

use crate::core::types::{Key, KeystrokeEvent, Record};
use crate::core::{parse_payload, DedupeIndex, ScanDetector};
use crate::export::write_export;
use crate::store::{RecordStore, StoreError};
use crate::ui::feedback::Chime;

/// How long one poll waits before the loop re-checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capture session configuration.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Operator initials stamped on every record
    pub operator: String,
    /// Reject exact identifier-tuple duplicates
    pub dedupe: bool,
    /// Play outcome tones
    pub beep: bool,
}

/// Errors that can abort a capture session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Terminal setup or event read failed.
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),

    /// Persisting a captured record failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The interactive capture loop and its state.
pub struct CaptureSession {
    store: RecordStore,
    detector: ScanDetector,
    index: DedupeIndex,
    chime: Chime,
    operator: String,
    dedupe: bool,
    /// `Some(buffer)` while the manual-entry line is focused
    manual: Option<String>,
    last_outcome: String,
    running: bool,
}

impl CaptureSession {
    /// Creates a session over an opened store. The dedupe index is seeded
    /// from the existing records so duplicates of earlier sessions are
    /// caught too.
    pub fn new(store: RecordStore, options: SessionOptions) -> Self {
        let index = DedupeIndex::from_records(store.records());
        Self {
            store,
            detector: ScanDetector::new(),
            index,
            chime: Chime::new(options.beep),
            operator: options.operator,
            dedupe: options.dedupe,
            manual: None,
            last_outcome: String::from("ready"),
            running: true,
        }
    }

    /// Runs the session until the operator quits.
    ///
    /// Raw mode is always restored, even when the loop errors out.
    pub fn run(mut self) -> Result<(), SessionError> {
        print_banner();

        enable_raw_mode()?;
        let result = self.event_loop();
        disable_raw_mode()?;
        println!();

        info!(records = self.store.len(), "capture session ended");
        result
    }

    fn event_loop(&mut self) -> Result<(), SessionError> {
        let mut out = io::stdout();
        self.draw(&mut out)?;

        while self.running {
            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    self.handle_terminal_key(key)?;
                    self.draw(&mut out)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Routes one terminal key: session controls first, then the burst
    /// detector, then manual-entry editing.
    fn handle_terminal_key(&mut self, key: KeyEvent) -> Result<(), SessionError> {
        // Session controls never reach the detector.
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('d') => {
                    self.dedupe = !self.dedupe;
                    self.last_outcome =
                        format!("dedupe {}", if self.dedupe { "on" } else { "off" });
                    return Ok(());
                }
                KeyCode::Char('b') => {
                    let enabled = !self.chime.enabled();
                    self.chime.set_enabled(enabled);
                    self.last_outcome = format!("beep {}", if enabled { "on" } else { "off" });
                    return Ok(());
                }
                KeyCode::Char('e') => {
                    self.export_now();
                    return Ok(());
                }
                KeyCode::Char('x') => {
                    self.delete_newest()?;
                    return Ok(());
                }
                _ => {}
            }
        }
        match key.code {
            KeyCode::F(n) => {
                self.tag_newest(n as usize)?;
                return Ok(());
            }
            KeyCode::Esc => {
                if self.manual.take().is_none() {
                    self.running = false;
                }
                return Ok(());
            }
            KeyCode::Tab => {
                self.manual = match self.manual.take() {
                    Some(_) => None,
                    None => Some(String::new()),
                };
                return Ok(());
            }
            _ => {}
        }

        // Every remaining keystroke is offered to the detector; keystrokes
        // typed into the manual line are marked editable and ignored there.
        let stroke = self.to_keystroke(&key);
        if let Some(scan) = self.detector.handle_key(&stroke) {
            self.handle_scan(&scan)?;
            return Ok(());
        }

        // Manual-entry editing.
        if let Some(buffer) = self.manual.as_mut() {
            match key.code {
                KeyCode::Char(c) => buffer.push(c),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Enter => {
                    let value = buffer.trim().to_string();
                    buffer.clear();
                    if !value.is_empty() {
                        self.handle_scan(&value)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Converts a terminal key event into a detector keystroke, stamping it
    /// with its target and arrival time.
    fn to_keystroke(&self, key: &KeyEvent) -> KeystrokeEvent {
        let converted = match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Other("Backspace".to_string()),
            KeyCode::Delete => Key::Other("Delete".to_string()),
            KeyCode::Up => Key::Other("ArrowUp".to_string()),
            KeyCode::Down => Key::Other("ArrowDown".to_string()),
            KeyCode::Left => Key::Other("ArrowLeft".to_string()),
            KeyCode::Right => Key::Other("ArrowRight".to_string()),
            _ => Key::Other(format!("{:?}", key.code)),
        };

        let at = Instant::now();
        if self.manual.is_some() {
            KeystrokeEvent::editable(converted, at)
        } else {
            KeystrokeEvent::global(converted, at)
        }
    }

    /// One completed scan string: parse, dedupe, append, cue.
    fn handle_scan(&mut self, scan: &str) -> Result<(), SessionError> {
        let payload = parse_payload(scan);
        let record = Record::from_payload(&payload, &self.operator, Local::now().to_rfc3339());
        let key = record.dedupe_key();

        if self.dedupe && self.index.contains(&key) {
            self.chime.duplicate();
            self.last_outcome = format!("duplicate rejected: {}", key);
            return Ok(());
        }

        self.index.insert(key);
        self.store.add_record(record)?;
        self.chime.success();
        self.last_outcome = format!("captured: {}", scan);
        Ok(())
    }

    /// F1-F8: tags the newest record with the n-th issue-type label.
    fn tag_newest(&mut self, n: usize) -> Result<(), SessionError> {
        if self.store.is_empty() {
            self.last_outcome = String::from("no record to tag");
            return Ok(());
        }
        let Some(label) = self.store.issue_types().get(n.wrapping_sub(1)).cloned() else {
            self.last_outcome = format!("no issue type for F{}", n);
            return Ok(());
        };
        self.store.set_issue_type(0, &label)?;
        self.last_outcome = format!("tagged: {}", label);
        Ok(())
    }

    /// Ctrl+X: removes the newest record and frees its identifier tuple so
    /// the same scan is accepted again.
    fn delete_newest(&mut self) -> Result<(), SessionError> {
        if self.store.is_empty() {
            self.last_outcome = String::from("nothing to delete");
            return Ok(());
        }
        let removed = self.store.delete_record(0)?;
        self.index.remove(&removed.dedupe_key());
        self.last_outcome = format!("deleted: {}", removed.raw);
        Ok(())
    }

    /// Ctrl+E: export to the working directory without leaving the session.
    /// Failures are reported in the status line, never fatal.
    fn export_now(&mut self) {
        match write_export(self.store.records(), Path::new(".")) {
            Ok(path) => self.last_outcome = format!("exported to {}", path.display()),
            Err(e) => self.last_outcome = format!("export failed: {}", e),
        }
    }

    /// Redraws the single status line in place.
    fn draw(&self, out: &mut impl Write) -> io::Result<()> {
        let mode = match &self.manual {
            Some(buffer) => format!("manual> {}", buffer).yellow().to_string(),
            None => "scanning".green().to_string(),
        };
        let toggles = format!(
            "dedupe {} | beep {}",
            on_off(self.dedupe),
            on_off(self.chime.enabled()),
        );

        write!(
            out,
            "\r\x1b[2K{} {} | {} | {} | {}",
            "●".cyan(),
            format!("{} records", self.store.len()).bold(),
            toggles,
            mode,
            self.last_outcome.dimmed(),
        )?;
        out.flush()
    }
}

fn on_off(value: bool) -> ColoredString {
    if value {
        "on".green()
    } else {
        "off".red()
    }
}

fn print_banner() {
    println!("{}", "QC scan capture".bold());
    println!(
        "{}",
        "Scan anywhere. Tab: manual entry, F1-F8: tag issue, Ctrl+D: dedupe, Ctrl+B: beep, \
         Ctrl+E: export, Ctrl+X: delete last, Esc: quit"
            .dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(temp_dir: &TempDir) -> CaptureSession {
        let store = RecordStore::open(temp_dir.path().to_path_buf()).unwrap();
        CaptureSession::new(
            store,
            SessionOptions {
                operator: "EJ".to_string(),
                dedupe: true,
                beep: false,
            },
        )
    }

    #[test]
    fn test_scan_then_duplicate_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.handle_scan("SLD:25-12345-A1").unwrap();
        session.handle_scan("SLD:25-12345-A1").unwrap();

        assert_eq!(session.store.len(), 1);
        assert!(session.last_outcome.starts_with("duplicate rejected"));
    }

    #[test]
    fn test_distinct_unrecognised_scans_both_captured() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.handle_scan("SLD").unwrap();
        session.handle_scan("BLK").unwrap();

        assert_eq!(session.store.len(), 2);
        assert!(session.last_outcome.starts_with("captured"));
    }

    #[test]
    fn test_delete_newest_frees_dedupe_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.handle_scan("SLD:25-12345-A1").unwrap();
        session.delete_newest().unwrap();
        assert!(session.store.is_empty());

        // The tuple is free again; a rescan must be accepted, not
        // rejected as a duplicate of the deleted record.
        session.handle_scan("SLD:25-12345-A1").unwrap();
        assert_eq!(session.store.len(), 1);
        assert!(session.last_outcome.starts_with("captured"));
    }

    #[test]
    fn test_delete_newest_on_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.delete_newest().unwrap();
        assert_eq!(session.last_outcome, "nothing to delete");
    }

    #[test]
    fn test_tag_newest_sets_issue_type() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.handle_scan("BLK:B03").unwrap();
        session.tag_newest(5).unwrap();

        let expected = session.store.issue_types()[4].clone();
        assert_eq!(session.store.records()[0].issue_type, expected);
        assert_eq!(session.last_outcome, format!("tagged: {}", expected));
    }

    #[test]
    fn test_tag_newest_out_of_range() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        session.handle_scan("BLK:B03").unwrap();
        session.tag_newest(12).unwrap();

        assert_eq!(session.store.records()[0].issue_type, "");
        assert_eq!(session.last_outcome, "no issue type for F12");
    }
}
