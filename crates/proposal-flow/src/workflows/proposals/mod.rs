//! Proposal generation, pricing, and lifecycle tracking.
//!
//! The workflow covers the full life of a proposal: an operator drafts the
//! project parameters, the pricing engine derives the payment plans, a
//! document snapshot is rendered and stored, and every subsequent client
//! interaction (open, sign, pay) moves the record forward through the
//! lifecycle state machine while feeding the append-only event log.

pub mod assemble;
pub mod domain;
pub mod gateway;
pub mod lifecycle;
pub mod notify;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;
pub mod tax;

#[cfg(test)]
mod tests;

pub use assemble::{DocumentAssembler, RenderError, SummaryDocumentAssembler};
pub use domain::{
    AccessMetadata, ClientFields, EventKind, PaymentMethod, PaymentRecord, ProjectFields,
    ProposalConfig, ProposalDraft, ProposalEvent, ProposalId, ProposalRecord, ProposalStatus,
    SignatureRecord, ValidationError,
};
pub use gateway::{CheckoutRequest, CheckoutSession, GatewayError, NullPaymentGateway, PaymentGateway};
pub use lifecycle::{LifecycleError, LifecycleTracker, Transition, TransitionEffect};
pub use notify::{EmailMessage, NotificationSettings, Notifier, NullNotifier};
pub use pricing::{
    Cents, Installment, OptionVisibility, PaymentOption, PaymentPlan, PriceQuote, PricingEngine,
    PricingError, PricingInputs,
};
pub use repository::{InMemoryProposalRepository, ProposalRepository, StorageError};
pub use router::proposal_router;
pub use service::{
    PaymentNotice, ProposalService, ProposalServiceError, SendOutcome, SignatureRequest,
};
