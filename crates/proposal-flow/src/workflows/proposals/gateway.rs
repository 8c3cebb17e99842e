//! Payment gateway boundary.
//!
//! The workflow only needs a hosted checkout session: an amount in cents,
//! a description, and redirect references in; a redirect URL and session id
//! out. Completion arrives separately through the payment-confirm call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::domain::{PaymentMethod, ProposalId};
use super::pricing::{Cents, PaymentOption};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid payment amount")]
    InvalidAmount,
    #[error("payment gateway is not configured")]
    Unconfigured,
    #[error("payment gateway call failed: {0}")]
    Upstream(String),
}

/// Checkout session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub proposal_id: ProposalId,
    pub option: PaymentOption,
    /// 1-based installment index the payer is settling.
    pub installment: u8,
    pub amount_cents: Cents,
    pub description: String,
    pub method: PaymentMethod,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
    pub session_id: String,
}

pub trait PaymentGateway: Send + Sync {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;
}

/// Fallback used when no processor credentials are configured; every
/// session attempt fails cleanly instead of half-working.
#[derive(Debug, Default, Clone)]
pub struct NullPaymentGateway;

impl PaymentGateway for NullPaymentGateway {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        tracing::warn!(
            proposal_id = %request.proposal_id,
            amount_cents = request.amount_cents,
            "checkout requested but no payment gateway is configured"
        );
        Err(GatewayError::Unconfigured)
    }
}
