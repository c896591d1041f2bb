//! Terminal user interface
//!
//! The interactive capture session (raw-mode event loop around the burst
//! detector) and the audible feedback cues. Everything here is plumbing
//! around `core`; no parsing or dedupe logic lives in this module.

pub mod feedback;
pub mod session;

pub use feedback::Chime;
pub use session::{CaptureSession, SessionError, SessionOptions};
