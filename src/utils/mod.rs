//! Utility functions shared across services.
//!
//! - [`client_ip`] - Originating client address, proxy-aware
//! - [`code_generator`] - Affiliate code, short code and withdrawal reference generation
//! - [`retry`] - Retry-on-conflict for generated identifiers
//! - [`url_builder`] - Target URL validation and tracking URL construction

pub mod client_ip;
pub mod code_generator;
pub mod retry;
pub mod url_builder;
