//! CLI command implementations.

pub mod inspect;
