//! taskdump - goroutine stack dump inspector
//!
//! This library parses textual task stack dumps into records and provides
//! the analysis operations over them: deduplication of structurally
//! identical stacks, predicate-based filtering, three-way diff between
//! dumps, summaries and saving.

pub mod cli;
pub mod config;
pub mod diff;
pub mod dump;
pub mod error;
pub mod fingerprint;
pub mod loader;
pub mod predicate;
pub mod record;
pub mod session;
