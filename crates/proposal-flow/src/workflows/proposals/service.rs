//! Proposal workflow service composing pricing, lifecycle, storage, and the
//! external collaborator boundaries.
//!
//! Notification delivery is best-effort throughout: a mail failure is logged
//! and reported in the outcome, never surfaced as an operation error.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::assemble::{DocumentAssembler, RenderError};
use super::domain::{
    AccessMetadata, EventKind, PaymentMethod, PaymentRecord, ProposalConfig, ProposalDraft,
    ProposalEvent, ProposalId, ProposalRecord, SignatureRecord, ValidationError,
};
use super::gateway::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};
use super::lifecycle::{LifecycleError, LifecycleTracker, Transition};
use super::notify::{self, NotificationSettings, Notifier};
use super::pricing::{PaymentOption, PriceQuote, PricingEngine, PricingError};
use super::repository::{ProposalRepository, StorageError};

/// Error raised by the proposal service.
#[derive(Debug, thiserror::Error)]
pub enum ProposalServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Counterparty signature submission.
#[derive(Debug, Clone)]
pub struct SignatureRequest {
    pub signer_name: String,
    pub signer_date: String,
    /// 1-based payment option index.
    pub selected_option: u8,
    pub metadata: AccessMetadata,
}

/// Completed-payment notification, typically relayed from the processor's
/// success redirect or webhook.
#[derive(Debug, Clone)]
pub struct PaymentNotice {
    /// 1-based payment option index.
    pub option: u8,
    /// 1-based installment index within the plan.
    pub installment: u8,
    pub method: PaymentMethod,
    pub metadata: AccessMetadata,
}

/// Result of a send operation, including whether each notification was
/// actually delivered.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub record: ProposalRecord,
    pub recipient: String,
    pub client_notified: bool,
    pub admin_notified: bool,
}

fn new_proposal_id() -> ProposalId {
    let hex = Uuid::new_v4().simple().to_string();
    ProposalId(hex[..12].to_string())
}

/// Service composing the repository, document assembler, payment gateway,
/// and notifier around the pure pricing and lifecycle cores.
pub struct ProposalService<R, D, G, N> {
    repository: Arc<R>,
    assembler: Arc<D>,
    gateway: Arc<G>,
    notifier: Arc<N>,
    settings: NotificationSettings,
}

impl<R, D, G, N> ProposalService<R, D, G, N>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        assembler: Arc<D>,
        gateway: Arc<G>,
        notifier: Arc<N>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            repository,
            assembler,
            gateway,
            notifier,
            settings,
        }
    }

    /// Validate a draft, price it, render the document snapshot, and store
    /// the new proposal in `draft` status.
    pub fn create(&self, draft: &ProposalDraft) -> Result<ProposalRecord, ProposalServiceError> {
        let now = Utc::now();
        let config = ProposalConfig::from_draft(new_proposal_id(), draft, now.date_naive())?;
        let quote = PricingEngine::quote(&config.pricing_inputs())?;
        let document = self.assembler.render(&config, &quote)?;

        let record = ProposalRecord::new(config, now);
        self.repository.create(record.clone())?;
        self.repository.store_document(record.id(), document)?;
        self.audit(
            ProposalEvent::new(record.id().clone(), EventKind::Created, now)
                .with_detail("project", record.config.project.name.clone()),
        );

        tracing::info!(proposal_id = %record.id(), "proposal created");
        Ok(record)
    }

    pub fn get(&self, id: &ProposalId) -> Result<ProposalRecord, ProposalServiceError> {
        Ok(self.repository.fetch(id)?.ok_or(StorageError::NotFound)?)
    }

    pub fn list(&self) -> Result<Vec<ProposalRecord>, ProposalServiceError> {
        Ok(self.repository.list()?)
    }

    pub fn events(&self, id: &ProposalId) -> Result<Vec<ProposalEvent>, ProposalServiceError> {
        // Fetch first so a missing proposal is a 404, not an empty list.
        self.get(id)?;
        Ok(self.repository.events(id)?)
    }

    pub fn signature(
        &self,
        id: &ProposalId,
    ) -> Result<Option<SignatureRecord>, ProposalServiceError> {
        Ok(self.repository.signature(id)?)
    }

    pub fn payments(&self, id: &ProposalId) -> Result<Vec<PaymentRecord>, ProposalServiceError> {
        Ok(self.repository.payments(id)?)
    }

    /// Recompute the quote from the stored config snapshot. Pricing is pure,
    /// so this is always identical to the quote at creation time.
    pub fn quote(&self, id: &ProposalId) -> Result<PriceQuote, ProposalServiceError> {
        let record = self.get(id)?;
        Ok(PricingEngine::quote(&record.config.pricing_inputs())?)
    }

    /// The rendered document snapshot, re-rendered if the stored copy is
    /// missing.
    pub fn document(&self, id: &ProposalId) -> Result<Vec<u8>, ProposalServiceError> {
        let record = self.get(id)?;
        if let Some(bytes) = self.repository.document(id)? {
            return Ok(bytes);
        }
        let quote = PricingEngine::quote(&record.config.pricing_inputs())?;
        Ok(self.assembler.render(&record.config, &quote)?)
    }

    /// Deliver (or re-deliver) the proposal. The recipient defaults to the
    /// client email on file; re-sends advance nothing but still go out.
    pub fn send(
        &self,
        id: &ProposalId,
        recipient: Option<String>,
    ) -> Result<SendOutcome, ProposalServiceError> {
        let mut record = self.get(id)?;
        let recipient = recipient
            .and_then(|value| {
                let value = value.trim().to_string();
                (!value.is_empty()).then_some(value)
            })
            .or_else(|| record.config.client.email.clone())
            .ok_or(ValidationError::MissingEmail)?;

        let now = Utc::now();
        let effect = LifecycleTracker::apply(&mut record, Transition::Sent, now)?;
        if effect.changed() {
            self.repository.persist(&record)?;
        }

        let quote = PricingEngine::quote(&record.config.pricing_inputs())?;
        let document = self.repository.document(id)?;

        let client_message =
            notify::proposal_sent(&self.settings, &record.config, &quote, &recipient, document);
        let client_notified = self.notifier.send(&client_message);
        let admin_message =
            notify::proposal_sent_admin(&self.settings, &record.config, &quote, &recipient);
        let admin_notified = self.notifier.send(&admin_message);

        self.audit(
            ProposalEvent::new(id.clone(), EventKind::Sent, now)
                .with_detail("recipient", recipient.clone()),
        );
        tracing::info!(proposal_id = %id, %recipient, "proposal sent");

        Ok(SendOutcome {
            record,
            recipient,
            client_notified,
            admin_notified,
        })
    }

    /// Record a counterparty view. Every view is audited; the status and
    /// timestamp only move on the first one.
    pub fn view(
        &self,
        id: &ProposalId,
        metadata: &AccessMetadata,
    ) -> Result<ProposalRecord, ProposalServiceError> {
        let mut record = self.get(id)?;
        let now = Utc::now();
        let effect = LifecycleTracker::apply(&mut record, Transition::Viewed, now)?;
        if effect.changed() {
            self.repository.persist(&record)?;
        }

        let mut event = ProposalEvent::new(id.clone(), EventKind::Viewed, now);
        if let Some(ip) = &metadata.ip_address {
            event = event.with_detail("ip", ip.clone());
        }
        if let Some(agent) = &metadata.user_agent {
            event = event.with_detail("user_agent", agent.clone());
        }
        self.audit(event);

        Ok(record)
    }

    /// Accept a signature. First writer wins; everyone after gets
    /// `AlreadySigned`.
    pub fn sign(
        &self,
        id: &ProposalId,
        request: &SignatureRequest,
    ) -> Result<SignatureRecord, ProposalServiceError> {
        let signer_name = request.signer_name.trim();
        if signer_name.is_empty() {
            return Err(ValidationError::MissingSignerName.into());
        }
        let option = PaymentOption::from_index(request.selected_option)
            .ok_or(ValidationError::UnknownOption(request.selected_option))?;

        let mut record = self.get(id)?;
        let now = Utc::now();
        LifecycleTracker::apply(&mut record, Transition::Signed, now)?;

        let signature = SignatureRecord {
            proposal_id: id.clone(),
            signer_name: signer_name.to_string(),
            signer_date: request.signer_date.trim().to_string(),
            selected_option: option,
            ip_address: request.metadata.ip_address.clone(),
            user_agent: request.metadata.user_agent.clone(),
            accepted_at: now,
            project_name: record.config.project.name.clone(),
            client_company: record.config.client.company.clone(),
        };

        // The repository guard settles concurrent signers; a lost race
        // reads the same as signing an already-signed proposal.
        match self.repository.insert_signature(signature.clone()) {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(LifecycleError::AlreadySigned.into()),
            Err(other) => return Err(other.into()),
        }
        self.repository.persist(&record)?;

        self.audit(
            ProposalEvent::new(id.clone(), EventKind::Signed, now)
                .with_detail("signer", signature.signer_name.clone())
                .with_detail("option", option.label()),
        );

        let document = self.repository.document(id)?;
        let admin_message = notify::acceptance_admin(
            &self.settings,
            &record.config,
            &signature,
            document.clone(),
        );
        self.notifier.send(&admin_message);
        if let Some(client_message) =
            notify::acceptance_client(&self.settings, &record.config, &signature, document)
        {
            self.notifier.send(&client_message);
        }

        tracing::info!(proposal_id = %id, signer = %signature.signer_name, "proposal signed");
        Ok(signature)
    }

    /// Open a hosted checkout session for one installment of a plan.
    pub fn checkout(
        &self,
        id: &ProposalId,
        option_index: u8,
        installment: u8,
        method: PaymentMethod,
    ) -> Result<CheckoutSession, ProposalServiceError> {
        let record = self.get(id)?;
        let (option, amount_cents, label) =
            self.installment_amount(&record, option_index, installment)?;
        if amount_cents <= 0 {
            return Err(GatewayError::InvalidAmount.into());
        }

        let proposal_url = self.settings.proposal_url(&id.0);
        let session = self.gateway.create_session(&CheckoutRequest {
            proposal_id: id.clone(),
            option,
            installment,
            amount_cents,
            description: format!("{} | {}", record.config.project.name, label),
            method,
            success_url: format!("{proposal_url}?payment=success&option={option_index}&installment={installment}"),
            cancel_url: format!("{proposal_url}?payment=cancelled"),
        })?;

        tracing::info!(
            proposal_id = %id,
            option = option_index,
            installment,
            amount_cents,
            "checkout session created"
        );
        Ok(session)
    }

    /// Record a completed payment. The amount is always taken from the plan,
    /// never from the caller; duplicates of the same installment are
    /// rejected at the storage boundary.
    pub fn confirm_payment(
        &self,
        id: &ProposalId,
        notice: &PaymentNotice,
    ) -> Result<PaymentRecord, ProposalServiceError> {
        let mut record = self.get(id)?;
        let (option, amount_cents, label) =
            self.installment_amount(&record, notice.option, notice.installment)?;

        let now = Utc::now();
        LifecycleTracker::apply(&mut record, Transition::PaymentReceived, now)?;

        let payment = PaymentRecord {
            proposal_id: id.clone(),
            option,
            installment: notice.installment,
            amount_cents,
            method: notice.method,
            paid_at: now,
            ip_address: notice.metadata.ip_address.clone(),
        };
        self.repository.insert_payment(payment.clone())?;
        self.repository.persist(&record)?;

        self.audit(
            ProposalEvent::new(id.clone(), EventKind::Payment, now)
                .with_detail("installment", label)
                .with_detail("amount_cents", amount_cents.to_string()),
        );

        let admin_message = notify::payment_admin(&self.settings, &record.config, &payment);
        self.notifier.send(&admin_message);
        if let Some(client_message) = notify::payment_client(&record.config, &payment) {
            self.notifier.send(&client_message);
        }

        tracing::info!(proposal_id = %id, amount_cents, "payment recorded");
        Ok(payment)
    }

    /// Resolve an (option, installment) pair against the proposal's quote.
    fn installment_amount(
        &self,
        record: &ProposalRecord,
        option_index: u8,
        installment: u8,
    ) -> Result<(PaymentOption, super::pricing::Cents, String), ProposalServiceError> {
        let option = PaymentOption::from_index(option_index)
            .ok_or(ValidationError::UnknownOption(option_index))?;
        let quote = PricingEngine::quote(&record.config.pricing_inputs())?;
        let plan = quote
            .plan(option)
            .ok_or(ValidationError::UnknownOption(option_index))?;
        let scheduled = plan
            .installments
            .get(usize::from(installment).wrapping_sub(1))
            .ok_or(ValidationError::UnknownOption(installment))?;
        Ok((option, scheduled.amount_cents, scheduled.label.clone()))
    }

    /// Append an audit entry, logging instead of failing when storage
    /// rejects it. Audit is advisory; the operation already happened.
    fn audit(&self, event: ProposalEvent) {
        if let Err(error) = self.repository.append_event(event) {
            tracing::warn!(%error, "failed to append audit event");
        }
    }
}
