//! Infrastructure layer for external integrations.
//!
//! This layer implements the interfaces defined by the domain layer and the
//! collaborators the engine talks to.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`memory`] - In-memory repository implementation
//! - [`notification`] - Affiliate notifications
//! - [`settlement`] - Payout settlement gateway

pub mod memory;
pub mod notification;
pub mod persistence;
pub mod settlement;
