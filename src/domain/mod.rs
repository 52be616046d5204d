//! Domain layer containing business entities and logic.
//!
//! Nothing here depends on the database, HTTP or any other infrastructure.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`commission`] - Tiered, multi-factor commission calculation
//! - [`fees`] - Withdrawal processing fee schedule
//! - [`referral_token`] - Signed referral tokens issued on click
//!
//! Orchestration of these pieces lives in [`crate::application::services`].

pub mod commission;
pub mod entities;
pub mod fees;
pub mod referral_token;
pub mod repositories;
