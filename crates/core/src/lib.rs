//! Shared types, error taxonomy, and config helpers used by every crate in
//! this workspace: [`FetcherError`], [`FetchOutcome`] and friends, and the
//! `sha256_hex`/`domain_of`/cache-key helpers that both the fetcher and the
//! scheduler rely on for consistent key formatting.

pub mod config;
pub mod error;
pub mod types;

pub use error::FetcherError;
pub use types::*;
