//! Secret scrubbing for probe reports.
//!
//! Probe details carry raw response text, request URLs and transport error
//! messages. Any of those may echo back a session string or bearer token,
//! so every detail goes through a [`Redactor`] before it is rendered.

pub mod patterns;
pub mod redactor;

pub use redactor::{RedactionResult, RedactionStats, Redactor, RedactorConfig};

/// Placeholder for redacted values.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Secrets shorter than this are not masked as literal values; masking
/// them would mangle ordinary words in agent replies.
pub const MIN_LITERAL_SECRET_LEN: usize = 6;
