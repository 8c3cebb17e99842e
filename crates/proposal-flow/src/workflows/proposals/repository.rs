//! Storage abstraction for proposal state and audit records.
//!
//! The guards that matter for correctness live at this boundary, not in
//! process-local locks: signature insertion is first-writer-wins per
//! proposal, and payment insertion is keyed by (proposal, option,
//! installment) so retried webhooks cannot duplicate a payment row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{PaymentRecord, ProposalEvent, ProposalId, ProposalRecord, SignatureRecord};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary keyed by proposal id. Implementations may be
/// file-based, relational, or document-store backed; the workflow only
/// depends on these operations.
pub trait ProposalRepository: Send + Sync {
    /// Store a brand-new record; `Conflict` if the id is already taken.
    fn create(&self, record: ProposalRecord) -> Result<(), StorageError>;
    fn fetch(&self, id: &ProposalId) -> Result<Option<ProposalRecord>, StorageError>;
    /// Durably write an updated status/timestamp snapshot.
    fn persist(&self, record: &ProposalRecord) -> Result<(), StorageError>;
    /// First-writer-wins signature guard; `Conflict` if one already exists.
    fn insert_signature(&self, signature: SignatureRecord) -> Result<(), StorageError>;
    fn signature(&self, id: &ProposalId) -> Result<Option<SignatureRecord>, StorageError>;
    /// Insert a payment row; `Conflict` when the same (option, installment)
    /// was already recorded for this proposal.
    fn insert_payment(&self, payment: PaymentRecord) -> Result<(), StorageError>;
    fn payments(&self, id: &ProposalId) -> Result<Vec<PaymentRecord>, StorageError>;
    fn append_event(&self, event: ProposalEvent) -> Result<(), StorageError>;
    fn events(&self, id: &ProposalId) -> Result<Vec<ProposalEvent>, StorageError>;
    fn list(&self) -> Result<Vec<ProposalRecord>, StorageError>;
    /// Rendered document snapshot taken at creation time.
    fn store_document(&self, id: &ProposalId, bytes: Vec<u8>) -> Result<(), StorageError>;
    fn document(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, ProposalRecord>,
    signatures: HashMap<String, SignatureRecord>,
    payments: Vec<PaymentRecord>,
    events: Vec<ProposalEvent>,
    documents: HashMap<String, Vec<u8>>,
}

/// Reference repository used by the in-process server and the test suite.
#[derive(Default, Clone)]
pub struct InMemoryProposalRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl ProposalRepository for InMemoryProposalRepository {
    fn create(&self, record: ProposalRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.records.contains_key(&record.id().0) {
            return Err(StorageError::Conflict);
        }
        state.records.insert(record.id().0.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ProposalId) -> Result<Option<ProposalRecord>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.records.get(&id.0).cloned())
    }

    fn persist(&self, record: &ProposalRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if !state.records.contains_key(&record.id().0) {
            return Err(StorageError::NotFound);
        }
        state.records.insert(record.id().0.clone(), record.clone());
        Ok(())
    }

    fn insert_signature(&self, signature: SignatureRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.signatures.contains_key(&signature.proposal_id.0) {
            return Err(StorageError::Conflict);
        }
        state
            .signatures
            .insert(signature.proposal_id.0.clone(), signature);
        Ok(())
    }

    fn signature(&self, id: &ProposalId) -> Result<Option<SignatureRecord>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.signatures.get(&id.0).cloned())
    }

    fn insert_payment(&self, payment: PaymentRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let duplicate = state.payments.iter().any(|existing| {
            existing.proposal_id == payment.proposal_id
                && existing.option == payment.option
                && existing.installment == payment.installment
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        state.payments.push(payment);
        Ok(())
    }

    fn payments(&self, id: &ProposalId) -> Result<Vec<PaymentRecord>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .payments
            .iter()
            .filter(|payment| payment.proposal_id == *id)
            .cloned()
            .collect())
    }

    fn append_event(&self, event: ProposalEvent) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.events.push(event);
        Ok(())
    }

    fn events(&self, id: &ProposalId) -> Result<Vec<ProposalEvent>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .events
            .iter()
            .filter(|event| event.proposal_id == *id)
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<ProposalRecord>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = state.records.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn store_document(&self, id: &ProposalId, bytes: Vec<u8>) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.documents.insert(id.0.clone(), bytes);
        Ok(())
    }

    fn document(&self, id: &ProposalId) -> Result<Option<Vec<u8>>, StorageError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.documents.get(&id.0).cloned())
    }
}
