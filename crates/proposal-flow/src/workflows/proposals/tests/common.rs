//! Shared fixtures for the proposal workflow tests.

use std::sync::{Arc, Mutex};

use crate::workflows::proposals::{
    CheckoutRequest, CheckoutSession, EmailMessage, GatewayError, InMemoryProposalRepository,
    NotificationSettings, Notifier, PaymentGateway, PaymentRecord, ProposalDraft, ProposalEvent,
    ProposalId, ProposalRecord, ProposalRepository, ProposalService, SignatureRecord, StorageError,
    SummaryDocumentAssembler,
};
use crate::workflows::proposals::domain::RawNumber;

pub type TestService = ProposalService<
    InMemoryProposalRepository,
    SummaryDocumentAssembler,
    RecordingGateway,
    RecordingNotifier,
>;

pub struct TestHarness {
    pub service: Arc<TestService>,
    pub gateway: Arc<RecordingGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn settings() -> NotificationSettings {
    NotificationSettings {
        admin_email: "ops@example.com".to_string(),
        from_email: "proposals@example.com".to_string(),
        public_base_url: "https://proposals.example.com".to_string(),
    }
}

pub fn harness() -> TestHarness {
    let repository = Arc::new(InMemoryProposalRepository::default());
    let gateway = Arc::new(RecordingGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = Arc::new(ProposalService::new(
        repository,
        Arc::new(SummaryDocumentAssembler),
        gateway.clone(),
        notifier.clone(),
        settings(),
    ));
    TestHarness {
        service,
        gateway,
        notifier,
    }
}

/// The worked example used throughout the suite: an 11,600 SF school roof
/// in a 9.25% tax locality, four scans, all three plans presented.
pub fn sample_draft() -> ProposalDraft {
    ProposalDraft {
        client_company: Some("District Facilities Group".to_string()),
        client_contact: Some("Dana Reyes".to_string()),
        client_email: Some("dana@example.com".to_string()),
        project_name: Some("Crockett High School".to_string()),
        project_address: Some("1500 Stassney Ln".to_string()),
        project_city: Some("Austin".to_string()),
        project_state: Some("TX".to_string()),
        project_zip: Some("78745".to_string()),
        wet_sf: Some(RawNumber::Number(11600.0)),
        rate_psf: Some(RawNumber::Number(2.00)),
        scan_cost: Some(RawNumber::Number(4500.0)),
        num_scans: Some(RawNumber::Number(4.0)),
        tax_rate_override: Some(RawNumber::Number(0.0925)),
        show_option0: Some(true),
        show_option1: Some(true),
        show_option2: Some(true),
        ..ProposalDraft::default()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("lock").clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .map(|message| message.subject)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &EmailMessage) -> bool {
        self.messages.lock().expect("lock").push(message.clone());
        true
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl RecordingGateway {
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl PaymentGateway for RecordingGateway {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let mut requests = self.requests.lock().expect("lock");
        requests.push(request.clone());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/session/{}", requests.len()),
            session_id: format!("cs_test_{}", requests.len()),
        })
    }
}

/// Repository that fails every operation, for error-path coverage.
pub struct UnavailableRepository;

fn offline<T>() -> Result<T, StorageError> {
    Err(StorageError::Unavailable("database offline".to_string()))
}

impl ProposalRepository for UnavailableRepository {
    fn create(&self, _record: ProposalRecord) -> Result<(), StorageError> {
        offline()
    }

    fn fetch(&self, _id: &ProposalId) -> Result<Option<ProposalRecord>, StorageError> {
        offline()
    }

    fn persist(&self, _record: &ProposalRecord) -> Result<(), StorageError> {
        offline()
    }

    fn insert_signature(&self, _signature: SignatureRecord) -> Result<(), StorageError> {
        offline()
    }

    fn signature(&self, _id: &ProposalId) -> Result<Option<SignatureRecord>, StorageError> {
        offline()
    }

    fn insert_payment(&self, _payment: PaymentRecord) -> Result<(), StorageError> {
        offline()
    }

    fn payments(&self, _id: &ProposalId) -> Result<Vec<PaymentRecord>, StorageError> {
        offline()
    }

    fn append_event(&self, _event: ProposalEvent) -> Result<(), StorageError> {
        offline()
    }

    fn events(&self, _id: &ProposalId) -> Result<Vec<ProposalEvent>, StorageError> {
        offline()
    }

    fn list(&self) -> Result<Vec<ProposalRecord>, StorageError> {
        offline()
    }

    fn store_document(&self, _id: &ProposalId, _bytes: Vec<u8>) -> Result<(), StorageError> {
        offline()
    }

    fn document(&self, _id: &ProposalId) -> Result<Option<Vec<u8>>, StorageError> {
        offline()
    }
}
