#![forbid(unsafe_code)]

//! Runtime mode definitions for Strict and Hardened operation.

use serde::{Deserialize, Serialize};

/// Operational mode governing how much of the Hermitian input contract is checked.
///
/// - **Strict**: Check exactly what the elimination relies on: square shape,
///   a real diagonal and a consistent bound configuration. Off-diagonal
///   entries are trusted to be Hermitian; only one triangle is ever read.
/// - **Hardened**: Additionally reject non-finite entries and off-diagonal
///   pairs that are not conjugate-symmetric before any elimination work starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

impl RuntimeMode {
    #[must_use]
    pub const fn checks_entries(self) -> bool {
        matches!(self, Self::Hardened)
    }
}
