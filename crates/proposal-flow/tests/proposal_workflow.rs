use std::sync::Arc;

use proposal_flow::workflows::proposals::{
    AccessMetadata, InMemoryProposalRepository, NotificationSettings, NullNotifier,
    NullPaymentGateway, PaymentMethod, PaymentNotice, ProposalDraft, ProposalService,
    ProposalServiceError, ProposalStatus, SignatureRequest, StorageError,
    SummaryDocumentAssembler, ValidationError,
};

type WorkflowService = ProposalService<
    InMemoryProposalRepository,
    SummaryDocumentAssembler,
    NullPaymentGateway,
    NullNotifier,
>;

fn service() -> WorkflowService {
    ProposalService::new(
        Arc::new(InMemoryProposalRepository::default()),
        Arc::new(SummaryDocumentAssembler),
        Arc::new(NullPaymentGateway),
        Arc::new(NullNotifier),
        NotificationSettings {
            admin_email: "ops@example.com".to_string(),
            from_email: "proposals@example.com".to_string(),
            public_base_url: "https://proposals.example.com".to_string(),
        },
    )
}

fn warehouse_draft() -> ProposalDraft {
    let raw = serde_json::json!({
        "clientCompany": "Gulf Coast Logistics",
        "clientContact": "Sam Okafor",
        "clientEmail": "sam@example.com",
        "projectName": "Bay 4 Distribution Center",
        "projectCity": "Mobile",
        "projectState": "AL",
        "wetSF": 40250,
        "ratePSF": 1.85,
        "numScans": 2,
        "showOption1": true,
        "showOption2": true,
    });
    serde_json::from_value(raw).expect("draft deserializes")
}

#[test]
fn draft_to_paid_through_the_public_surface() {
    let service = service();

    let record = service.create(&warehouse_draft()).expect("create proposal");
    assert_eq!(record.status, ProposalStatus::Draft);
    // Alabama base rate applies when no override is given.
    assert_eq!(record.config.tax_rate, 0.04);

    let quote = service.quote(record.id()).expect("quote");
    assert_eq!(quote.plans.len(), 2);
    for plan in &quote.plans {
        let sum: i64 = plan.installments.iter().map(|i| i.amount_cents).sum();
        assert_eq!(sum, plan.total_cents);
    }

    let outcome = service.send(record.id(), None).expect("send");
    assert_eq!(outcome.recipient, "sam@example.com");
    assert!(!outcome.client_notified, "null notifier reports skipped delivery");

    let viewed = service
        .view(record.id(), &AccessMetadata::default())
        .expect("view");
    assert_eq!(viewed.status, ProposalStatus::Viewed);

    let signature = service
        .sign(
            record.id(),
            &SignatureRequest {
                signer_name: "Sam Okafor".to_string(),
                signer_date: "2026-03-02".to_string(),
                selected_option: 2,
                metadata: AccessMetadata::default(),
            },
        )
        .expect("sign");
    assert_eq!(signature.project_name, "Bay 4 Distribution Center");

    let deposit = service
        .confirm_payment(
            record.id(),
            &PaymentNotice {
                option: 2,
                installment: 1,
                method: PaymentMethod::Ach,
                metadata: AccessMetadata::default(),
            },
        )
        .expect("deposit");

    let fifty_fifty = quote.plans.iter().find(|plan| plan.option.index() == 2).expect("plan");
    assert_eq!(deposit.amount_cents, fifty_fifty.installments[0].amount_cents);

    let stored = service.get(record.id()).expect("fetch");
    assert_eq!(stored.status, ProposalStatus::Paid);
    assert!(stored.sent_at.is_some());
    assert!(stored.viewed_at.is_some());
    assert!(stored.signed_at.is_some());
    assert!(stored.paid_at.is_some());
}

#[test]
fn duplicate_signatures_and_payments_are_conflicts() {
    let service = service();
    let record = service.create(&warehouse_draft()).expect("create proposal");

    let request = SignatureRequest {
        signer_name: "Sam Okafor".to_string(),
        signer_date: String::new(),
        selected_option: 3,
        metadata: AccessMetadata::default(),
    };
    service.sign(record.id(), &request).expect("first signature");
    assert!(matches!(
        service.sign(record.id(), &request),
        Err(ProposalServiceError::Lifecycle(_))
    ));

    let notice = PaymentNotice {
        option: 3,
        installment: 1,
        method: PaymentMethod::Card,
        metadata: AccessMetadata::default(),
    };
    service.confirm_payment(record.id(), &notice).expect("first payment");
    assert!(matches!(
        service.confirm_payment(record.id(), &notice),
        Err(ProposalServiceError::Storage(StorageError::Conflict))
    ));
}

#[test]
fn sending_without_any_address_fails_validation() {
    let service = service();
    let mut draft = warehouse_draft();
    draft.client_email = None;
    let record = service.create(&draft).expect("create proposal");

    assert!(matches!(
        service.send(record.id(), None),
        Err(ProposalServiceError::Validation(ValidationError::MissingEmail))
    ));
}
