use std::sync::Arc;

use crate::workflows::proposals::domain::RawNumber;
use crate::workflows::proposals::{
    AccessMetadata, EventKind, GatewayError, LifecycleError, NullPaymentGateway, PaymentMethod,
    PaymentNotice, ProposalId, ProposalService, ProposalServiceError, ProposalStatus,
    SignatureRequest, StorageError, SummaryDocumentAssembler, ValidationError,
};

use super::common::{harness, sample_draft, settings, RecordingNotifier, UnavailableRepository};

fn metadata() -> AccessMetadata {
    AccessMetadata {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

fn signature_request(option: u8) -> SignatureRequest {
    SignatureRequest {
        signer_name: "Dana Reyes".to_string(),
        signer_date: "2026-02-21".to_string(),
        selected_option: option,
        metadata: metadata(),
    }
}

#[test]
fn create_stores_record_document_and_audit_entry() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");

    assert_eq!(record.id().0.len(), 12);
    assert_eq!(record.status, ProposalStatus::Draft);
    assert_eq!(record.config.tax_rate, 0.0925);

    let document = fixture.service.document(record.id()).expect("document");
    let text = String::from_utf8(document).expect("utf8 document");
    assert!(text.contains("Crockett High School"));
    assert!(text.contains("CONTRACT TOTAL: $43,346.00"));

    let events = fixture.service.events(record.id()).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Created);
}

#[test]
fn create_rejects_negative_area() {
    let fixture = harness();
    let mut draft = sample_draft();
    draft.wet_sf = Some(RawNumber::Number(-5.0));

    match fixture.service.create(&draft) {
        Err(ProposalServiceError::Validation(ValidationError::NegativeNumber { field })) => {
            assert_eq!(field, "wet area");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn send_requires_some_recipient() {
    let fixture = harness();
    let mut draft = sample_draft();
    draft.client_email = None;
    let record = fixture.service.create(&draft).expect("create");

    match fixture.service.send(record.id(), None) {
        Err(ProposalServiceError::Validation(ValidationError::MissingEmail)) => {}
        other => panic!("expected missing-email error, got {other:?}"),
    }
}

#[test]
fn send_notifies_client_and_admin() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");

    let outcome = fixture.service.send(record.id(), None).expect("send");
    assert_eq!(outcome.recipient, "dana@example.com");
    assert!(outcome.client_notified);
    assert!(outcome.admin_notified);
    assert_eq!(outcome.record.status, ProposalStatus::Sent);

    let subjects = fixture.notifier.subjects();
    assert_eq!(subjects.len(), 2);
    assert!(subjects[0].starts_with("Proposal: Crockett High School"));
    assert!(subjects[1].starts_with("Proposal Sent:"));
}

#[test]
fn explicit_recipient_overrides_the_email_on_file() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");

    let outcome = fixture
        .service
        .send(record.id(), Some("board@example.com".to_string()))
        .expect("send");
    assert_eq!(outcome.recipient, "board@example.com");
}

#[test]
fn full_flow_from_draft_to_paid() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    let id = record.id().clone();

    fixture.service.send(&id, None).expect("send");
    let viewed = fixture.service.view(&id, &metadata()).expect("view");
    assert_eq!(viewed.status, ProposalStatus::Viewed);

    let signature = fixture.service.sign(&id, &signature_request(2)).expect("sign");
    assert_eq!(signature.signer_name, "Dana Reyes");
    assert_eq!(signature.project_name, "Crockett High School");

    let deposit = fixture
        .service
        .confirm_payment(
            &id,
            &PaymentNotice {
                option: 2,
                installment: 1,
                method: PaymentMethod::Card,
                metadata: metadata(),
            },
        )
        .expect("deposit");
    assert_eq!(deposit.amount_cents, 1_267_300);

    let paid = fixture.service.get(&id).expect("fetch");
    assert_eq!(paid.status, ProposalStatus::Paid);
    let first_paid_at = paid.paid_at.expect("paid timestamp");

    let balance = fixture
        .service
        .confirm_payment(
            &id,
            &PaymentNotice {
                option: 2,
                installment: 2,
                method: PaymentMethod::Ach,
                metadata: metadata(),
            },
        )
        .expect("balance");
    assert_eq!(balance.amount_cents, 1_267_300);

    let after_balance = fixture.service.get(&id).expect("fetch");
    assert_eq!(after_balance.paid_at, Some(first_paid_at));

    let payments = fixture.service.payments(&id).expect("payments");
    assert_eq!(payments.len(), 2);

    let kinds: Vec<EventKind> = fixture
        .service
        .events(&id)
        .expect("events")
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Created,
            EventKind::Sent,
            EventKind::Viewed,
            EventKind::Signed,
            EventKind::Payment,
            EventKind::Payment,
        ]
    );
}

#[test]
fn every_view_is_audited_but_only_the_first_is_stamped() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    let id = record.id().clone();

    let first = fixture.service.view(&id, &metadata()).expect("first view");
    let viewed_at = first.viewed_at.expect("viewed timestamp");

    let second = fixture.service.view(&id, &metadata()).expect("second view");
    assert_eq!(second.viewed_at, Some(viewed_at));
    assert_eq!(second.status, ProposalStatus::Viewed);

    let kinds: Vec<EventKind> = fixture
        .service
        .events(&id)
        .expect("events")
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![EventKind::Created, EventKind::Viewed, EventKind::Viewed]
    );
}

#[test]
fn duplicate_installment_confirmations_conflict() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    let id = record.id().clone();
    fixture.service.sign(&id, &signature_request(2)).expect("sign");

    let notice = PaymentNotice {
        option: 2,
        installment: 1,
        method: PaymentMethod::Card,
        metadata: metadata(),
    };
    fixture.service.confirm_payment(&id, &notice).expect("first");

    match fixture.service.confirm_payment(&id, &notice) {
        Err(ProposalServiceError::Storage(StorageError::Conflict)) => {}
        other => panic!("expected duplicate-payment conflict, got {other:?}"),
    }
    assert_eq!(fixture.service.payments(&id).expect("payments").len(), 1);
}

#[test]
fn second_signature_reports_already_signed() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    let id = record.id().clone();

    fixture.service.sign(&id, &signature_request(1)).expect("first signature");

    match fixture.service.sign(&id, &signature_request(2)) {
        Err(ProposalServiceError::Lifecycle(LifecycleError::AlreadySigned)) => {}
        other => panic!("expected already-signed error, got {other:?}"),
    }

    // The original signature is untouched.
    let stored = fixture
        .service
        .signature(&id)
        .expect("lookup")
        .expect("signature present");
    assert_eq!(stored.selected_option.index(), 1);
}

#[test]
fn blank_signer_name_is_rejected() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");

    let mut request = signature_request(2);
    request.signer_name = "   ".to_string();

    match fixture.service.sign(record.id(), &request) {
        Err(ProposalServiceError::Validation(ValidationError::MissingSignerName)) => {}
        other => panic!("expected missing-signer error, got {other:?}"),
    }
}

#[test]
fn payment_before_signature_is_rejected() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    fixture.service.send(record.id(), None).expect("send");

    match fixture.service.confirm_payment(
        record.id(),
        &PaymentNotice {
            option: 2,
            installment: 1,
            method: PaymentMethod::Card,
            metadata: metadata(),
        },
    ) {
        Err(ProposalServiceError::Lifecycle(LifecycleError::InvalidTransition { .. })) => {}
        other => panic!("expected invalid-transition error, got {other:?}"),
    }
}

#[test]
fn checkout_takes_the_amount_from_the_plan() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");
    fixture
        .service
        .sign(record.id(), &signature_request(3))
        .expect("sign");

    let session = fixture
        .service
        .checkout(record.id(), 3, 1, PaymentMethod::Card)
        .expect("checkout");
    assert!(session.url.starts_with("https://checkout.example.com/"));

    let requests = fixture.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_cents, 261_064);
    assert!(requests[0].description.contains("Deposit (10%)"));
    assert!(requests[0].success_url.contains(&record.id().0));
}

#[test]
fn checkout_rejects_unknown_installments() {
    let fixture = harness();
    let record = fixture.service.create(&sample_draft()).expect("create");

    match fixture.service.checkout(record.id(), 2, 9, PaymentMethod::Card) {
        Err(ProposalServiceError::Validation(ValidationError::UnknownOption(9))) => {}
        other => panic!("expected unknown-option error, got {other:?}"),
    }
}

#[test]
fn unconfigured_gateway_surfaces_cleanly() {
    let repository = Arc::new(crate::workflows::proposals::InMemoryProposalRepository::default());
    let service = ProposalService::new(
        repository,
        Arc::new(SummaryDocumentAssembler),
        Arc::new(NullPaymentGateway),
        Arc::new(RecordingNotifier::default()),
        settings(),
    );
    let record = service.create(&sample_draft()).expect("create");

    match service.checkout(record.id(), 2, 1, PaymentMethod::Card) {
        Err(ProposalServiceError::Gateway(GatewayError::Unconfigured)) => {}
        other => panic!("expected unconfigured-gateway error, got {other:?}"),
    }
}

#[test]
fn unknown_proposal_is_not_found() {
    let fixture = harness();
    let missing = ProposalId("nosuchrecord".to_string());

    match fixture.service.get(&missing) {
        Err(ProposalServiceError::Storage(StorageError::NotFound)) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}

#[test]
fn storage_outage_propagates() {
    let service = ProposalService::new(
        Arc::new(UnavailableRepository),
        Arc::new(SummaryDocumentAssembler),
        Arc::new(NullPaymentGateway),
        Arc::new(RecordingNotifier::default()),
        settings(),
    );

    match service.create(&sample_draft()) {
        Err(ProposalServiceError::Storage(StorageError::Unavailable(_))) => {}
        other => panic!("expected storage outage, got {other:?}"),
    }
}
