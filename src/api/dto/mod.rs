//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for input validation. Entities are serialized directly in responses.

pub mod affiliates;
pub mod conversions;
pub mod health;
pub mod links;
pub mod pagination;
pub mod withdrawals;
