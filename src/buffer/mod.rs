//! Buffer module: line storage and line preparation.
//!
//! This module contains:
//! - [`LineRing`]: fixed-capacity ring of the most recent raw lines
//! - [`sanitize`]: turns one raw line into terminal-safe, width-bounded text

pub mod ring;
pub mod sanitize;

pub use ring::LineRing;
pub use sanitize::{sanitize, sanitize_into, SanitizeMode};
