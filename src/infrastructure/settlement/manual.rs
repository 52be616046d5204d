use async_trait::async_trait;
use tracing::info;

use super::gateway::SettlementGateway;
use crate::domain::entities::Withdrawal;
use crate::error::AppError;

/// Settlement performed by an operator; the payment reference is derived
/// from the withdrawal reference.
#[derive(Debug, Default, Clone)]
pub struct ManualSettlement;

impl ManualSettlement {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SettlementGateway for ManualSettlement {
    async fn settle(&self, withdrawal: &Withdrawal) -> Result<String, AppError> {
        info!(
            withdrawal_id = withdrawal.id,
            reference = %withdrawal.reference,
            method = withdrawal.method.as_str(),
            net_amount = %withdrawal.net_amount,
            "Manual settlement recorded"
        );
        Ok(format!("MANUAL-{}", withdrawal.reference))
    }
}
