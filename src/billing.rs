use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("charge declined: {0}")]
    Declined(String),
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChargeId(pub String);

/// Seam towards the payment provider. The real charge/refund API lives
/// outside this service; signup only needs these two calls.
#[rocket::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, domain: &str, amount_cents: u32) -> Result<ChargeId, BillingError>;
    async fn refund(&self, charge: &ChargeId) -> Result<(), BillingError>;
}

/// Gateway used when no payment provider is configured. Free signups never
/// reach it; paid ones are refused.
pub struct DisabledGateway;

#[rocket::async_trait]
impl PaymentGateway for DisabledGateway {
    async fn charge(&self, domain: &str, amount_cents: u32) -> Result<ChargeId, BillingError> {
        tracing::warn!(
            "refusing charge of {}c for '{}': no payment gateway configured",
            amount_cents,
            domain
        );
        Err(BillingError::Unavailable(
            "no payment gateway configured".to_string(),
        ))
    }

    async fn refund(&self, _charge: &ChargeId) -> Result<(), BillingError> {
        Err(BillingError::Unavailable(
            "no payment gateway configured".to_string(),
        ))
    }
}

/// Recorded undo action for one completed signup step.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    RefundCharge(ChargeId),
    DeleteOrganization(Uuid),
    DeleteUser(Uuid),
}

/// Explicit compensation log for the signup saga. Steps append as they
/// complete; on failure the log drains in reverse completion order so later
/// work is undone first. Compensations that themselves fail are logged and
/// reported, never retried.
#[derive(Debug, Default)]
pub struct CompensationLog {
    actions: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> CompensationLog {
        CompensationLog::default()
    }

    pub fn record(&mut self, action: Compensation) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Pending undo actions, most recent first.
    pub fn drain_reverse(&mut self) -> Vec<Compensation> {
        let mut actions = std::mem::take(&mut self.actions);
        actions.reverse();
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensations_drain_in_reverse_completion_order() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();

        let mut log = CompensationLog::new();
        log.record(Compensation::RefundCharge(ChargeId("ch_1".to_string())));
        log.record(Compensation::DeleteOrganization(org));
        log.record(Compensation::DeleteUser(user));

        assert_eq!(
            log.drain_reverse(),
            vec![
                Compensation::DeleteUser(user),
                Compensation::DeleteOrganization(org),
                Compensation::RefundCharge(ChargeId("ch_1".to_string())),
            ]
        );
        assert!(log.is_empty());
    }

    #[rocket::async_test]
    async fn disabled_gateway_refuses_paid_charges() {
        let result = DisabledGateway.charge("acme.edu", 4900).await;
        assert!(matches!(result, Err(BillingError::Unavailable(_))));
    }
}
