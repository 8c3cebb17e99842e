//! Outbound email boundary and message templates.
//!
//! Delivery is fire-and-forget: `send` reports success as a bool and never
//! raises, so a mail outage can't block a signature or a payment.

use super::domain::{PaymentRecord, ProposalConfig, SignatureRecord};
use super::pricing::{fmt_currency, PriceQuote};

/// Addressing shared by every message the workflow produces.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub admin_email: String,
    pub from_email: String,
    pub public_base_url: String,
}

impl NotificationSettings {
    pub fn proposal_url(&self, proposal_id: &str) -> String {
        format!("{}/proposal/{proposal_id}", self.public_base_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<EmailAttachment>,
}

pub trait Notifier: Send + Sync {
    /// Returns true when the message was handed to the transport, false
    /// when it was skipped or failed. Failures are logged, never raised.
    fn send(&self, message: &EmailMessage) -> bool;
}

/// Fallback when no mailer credentials are configured.
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, message: &EmailMessage) -> bool {
        tracing::info!(
            subject = %message.subject,
            recipients = message.to.len(),
            "email skipped: no mailer configured"
        );
        false
    }
}

fn document_attachment(config: &ProposalConfig, bytes: Vec<u8>) -> EmailAttachment {
    let mut name = format!("Proposal_{}", config.project.name.replace(' ', "_"));
    if let Some(section) = &config.project.section {
        name.push('_');
        name.push_str(&section.replace(' ', "_"));
    }
    name.push_str(".txt");
    EmailAttachment {
        filename: name,
        content_type: "text/plain",
        bytes,
    }
}

fn project_line(config: &ProposalConfig) -> String {
    match &config.project.section {
        Some(section) => format!("{} - {section}", config.project.name),
        None => config.project.name.clone(),
    }
}

fn investment_rows(config: &ProposalConfig, quote: &PriceQuote) -> String {
    let mut rows = format!(
        "<tr><td>Vent System Lease ({} SF)</td><td align=\"right\">{}</td></tr>",
        config.wet_area_sf,
        fmt_currency(quote.base_lease_cents)
    );
    if quote.tax_amount_cents > 0 {
        rows.push_str(&format!(
            "<tr><td>Rental Tax ({:.2}%)</td><td align=\"right\">{}</td></tr>",
            config.tax_rate * 100.0,
            fmt_currency(quote.tax_amount_cents)
        ));
    }
    if !config.waive_scans {
        rows.push_str(&format!(
            "<tr><td>Moisture Monitoring ({} scans)</td><td align=\"right\">{}</td></tr>",
            config.scan_count,
            fmt_currency(quote.scan_total_cents)
        ));
    }
    rows.push_str(&format!(
        "<tr><td><strong>Total</strong></td><td align=\"right\"><strong>{}</strong></td></tr>",
        fmt_currency(quote.grand_total_cents)
    ));
    rows
}

/// Client-facing delivery message with the proposal summary and link.
pub fn proposal_sent(
    settings: &NotificationSettings,
    config: &ProposalConfig,
    quote: &PriceQuote,
    to: &str,
    document: Option<Vec<u8>>,
) -> EmailMessage {
    let project = project_line(config);
    let greeting = match &config.client.contact {
        Some(contact) => format!("Hi {contact},"),
        None => "Hello,".to_string(),
    };
    let url = settings.proposal_url(&config.id.0);

    let html_body = format!(
        "<p>{greeting}</p>\
         <p>Thank you for the opportunity to work with you on <strong>{project}</strong>. \
         Your proposal is attached and summarized below; you can review the full details, \
         select a payment option, and accept online.</p>\
         <table>{rows}</table>\
         <p><a href=\"{url}\">View &amp; Accept Proposal</a></p>",
        rows = investment_rows(config, quote),
    );

    EmailMessage {
        to: vec![to.to_string()],
        subject: format!("Proposal: {project}"),
        html_body,
        attachments: document
            .map(|bytes| vec![document_attachment(config, bytes)])
            .unwrap_or_default(),
    }
}

/// Internal copy confirming a proposal went out.
pub fn proposal_sent_admin(
    settings: &NotificationSettings,
    config: &ProposalConfig,
    quote: &PriceQuote,
    to: &str,
) -> EmailMessage {
    let project = project_line(config);
    let company = config.client.company.as_deref().unwrap_or("Client");
    let url = settings.proposal_url(&config.id.0);

    EmailMessage {
        to: vec![settings.admin_email.clone()],
        subject: format!("Proposal Sent: {project} | {company}"),
        html_body: format!(
            "<p><strong>Proposal sent</strong> to {to}</p>\
             <p>{project} | {company} | {total}</p>\
             <p><a href=\"{url}\">View proposal</a></p>",
            total = fmt_currency(quote.grand_total_cents),
        ),
        attachments: Vec::new(),
    }
}

/// Internal acceptance notification carrying the full signature proof.
pub fn acceptance_admin(
    settings: &NotificationSettings,
    config: &ProposalConfig,
    signature: &SignatureRecord,
    document: Option<Vec<u8>>,
) -> EmailMessage {
    let project = project_line(config);
    let company = config.client.company.as_deref().unwrap_or("Client");
    let url = settings.proposal_url(&config.id.0);

    EmailMessage {
        to: vec![settings.admin_email.clone()],
        subject: format!("Proposal Accepted: {project} | {company}"),
        html_body: format!(
            "<h2>Proposal Accepted</h2>\
             <table>\
             <tr><td>Project</td><td>{project}</td></tr>\
             <tr><td>Client</td><td>{company}</td></tr>\
             <tr><td>Signed By</td><td>{signer}</td></tr>\
             <tr><td>Date Signed</td><td>{date}</td></tr>\
             <tr><td>Payment Option</td><td>{option}</td></tr>\
             <tr><td>Signed At (UTC)</td><td>{at}</td></tr>\
             <tr><td>IP Address</td><td>{ip}</td></tr>\
             </table>\
             <p><a href=\"{url}\">View Proposal</a></p>",
            signer = signature.signer_name,
            date = signature.signer_date,
            option = signature.selected_option.label(),
            at = signature.accepted_at.format("%Y-%m-%d %H:%M:%S"),
            ip = signature.ip_address.as_deref().unwrap_or("unknown"),
        ),
        attachments: document
            .map(|bytes| vec![document_attachment(config, bytes)])
            .unwrap_or_default(),
    }
}

/// Counter-signed copy for the client; `None` when no address is on file.
pub fn acceptance_client(
    settings: &NotificationSettings,
    config: &ProposalConfig,
    signature: &SignatureRecord,
    document: Option<Vec<u8>>,
) -> Option<EmailMessage> {
    let to = config.client.email.clone()?;
    let project = project_line(config);
    let name = config
        .client
        .contact
        .as_deref()
        .unwrap_or(&signature.signer_name);
    let url = settings.proposal_url(&config.id.0);

    Some(EmailMessage {
        to: vec![to],
        subject: format!("Your Signed Proposal: {}", config.project.name),
        html_body: format!(
            "<h2>Thank you, {name}!</h2>\
             <p>Your signed proposal for <strong>{project}</strong> has been received. \
             A copy is attached for your records.</p>\
             <p>Selected payment option: <strong>{option}</strong></p>\
             <p><a href=\"{url}\">View Your Proposal</a></p>",
            option = signature.selected_option.label(),
        ),
        attachments: document
            .map(|bytes| vec![document_attachment(config, bytes)])
            .unwrap_or_default(),
    })
}

fn payment_summary_rows(payment: &PaymentRecord) -> String {
    format!(
        "<tr><td>Payment</td><td>{label}</td></tr>\
         <tr><td>Amount</td><td>{amount}</td></tr>\
         <tr><td>Method</td><td>{method}</td></tr>\
         <tr><td>Date (UTC)</td><td>{at}</td></tr>",
        label = payment.option.installment_label(payment.installment),
        amount = fmt_currency(payment.amount_cents),
        method = payment.method.label(),
        at = payment.paid_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Internal payment notification.
pub fn payment_admin(
    settings: &NotificationSettings,
    config: &ProposalConfig,
    payment: &PaymentRecord,
) -> EmailMessage {
    let project = project_line(config);
    let company = config.client.company.as_deref().unwrap_or("Client");
    let url = settings.proposal_url(&config.id.0);

    EmailMessage {
        to: vec![settings.admin_email.clone()],
        subject: format!(
            "Payment Received: {} | {project}",
            payment.option.installment_label(payment.installment)
        ),
        html_body: format!(
            "<h2>Payment Received</h2>\
             <table>\
             <tr><td>Project</td><td>{project}</td></tr>\
             <tr><td>Client</td><td>{company}</td></tr>\
             {rows}\
             </table>\
             <p><a href=\"{url}\">View Proposal</a></p>",
            rows = payment_summary_rows(payment),
        ),
        attachments: Vec::new(),
    }
}

/// Payment receipt for the client; `None` when no address is on file.
pub fn payment_client(
    config: &ProposalConfig,
    payment: &PaymentRecord,
) -> Option<EmailMessage> {
    let to = config.client.email.clone()?;
    let project = config.project.name.clone();

    Some(EmailMessage {
        to: vec![to],
        subject: format!(
            "Payment Receipt: {project} | {}",
            payment.option.installment_label(payment.installment)
        ),
        html_body: format!(
            "<h2>Payment Confirmation</h2>\
             <p>Thank you! Your payment of <strong>{amount}</strong> for \
             <strong>{project}</strong> has been received.</p>\
             <table>{rows}</table>\
             <p>This serves as your payment receipt.</p>",
            amount = fmt_currency(payment.amount_cents),
            rows = payment_summary_rows(payment),
        ),
        attachments: Vec::new(),
    })
}
