//! Status lifecycles, the generic state machine that drives them, and their display tables.

pub mod application;
pub mod catalog;
pub mod document;
mod machine;

pub use application::{ApplicationStatus, UnknownApplicationStatus};
pub use catalog::{lookup, Language, StatusDisplay, StatusKind, StatusPresentation};
pub use document::{DocumentStatus, UnknownDocumentStatus};
pub use machine::{Lifecycle, Progress, StatusChange, StatusMachine, Tick, TransitionError};

/// Canonical form for raw status strings: trimmed, lowercase, words joined by `-`.
pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
