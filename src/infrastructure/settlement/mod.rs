//! External payout settlement.
//!
//! - [`SettlementGateway`] - Pays out a withdrawal and returns the payment reference
//! - [`ManualSettlement`] - Records payouts performed by an operator outside the system

mod gateway;
mod manual;

pub use gateway::SettlementGateway;
pub use manual::ManualSettlement;

#[cfg(test)]
pub use gateway::MockSettlementGateway;
