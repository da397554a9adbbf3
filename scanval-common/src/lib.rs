//! # scanval Common Library
//!
//! Shared code for the scanval crates:
//! - Common error type
//! - Configuration file resolution and credential lookup
//! - Bounded response cache
//! - Expiring credential holder

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;

pub use cache::ResponseCache;
pub use credentials::{IssuedToken, TokenHolder, TokenSource};
pub use error::{Error, Result};
