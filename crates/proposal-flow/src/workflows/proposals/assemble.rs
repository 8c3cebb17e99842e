//! Document assembly boundary.
//!
//! Rendering is deterministic given the same config and quote. The default
//! assembler produces a plain-text rendition of the branded proposal;
//! deployments wanting a typeset PDF plug in their own implementation.

use std::fmt::Write;

use thiserror::Error;

use super::domain::ProposalConfig;
use super::pricing::{fmt_currency, PriceQuote};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document assembly failed: {0}")]
    Assembly(String),
}

pub trait DocumentAssembler: Send + Sync {
    fn render(&self, config: &ProposalConfig, quote: &PriceQuote) -> Result<Vec<u8>, RenderError>;
}

/// Text renderer covering the same field flow as the branded document:
/// header, parties, project scope figures, pricing, and payment schedule.
#[derive(Debug, Default, Clone)]
pub struct SummaryDocumentAssembler;

impl DocumentAssembler for SummaryDocumentAssembler {
    fn render(&self, config: &ProposalConfig, quote: &PriceQuote) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();

        let write = |out: &mut String, line: &str| {
            out.push_str(line);
            out.push('\n');
        };

        write(&mut out, "PROPOSAL");
        write(&mut out, &format!("Proposal No: {}", config.proposal_number()));
        write(&mut out, &format!("Date: {}", config.issue_date));
        write(&mut out, &format!("Valid Through: {}", config.valid_through()));
        write(&mut out, "");

        write(&mut out, &format!("PROJECT: {}", config.project.name));
        let address = config.full_address();
        if !address.is_empty() {
            write(&mut out, &address);
        }
        if let Some(section) = &config.project.section {
            write(&mut out, section);
        }
        if let Some(company) = &config.client.company {
            write(&mut out, &format!("TO: {company}"));
        }
        if let Some(contact) = &config.client.contact {
            write(&mut out, contact);
        }
        write(&mut out, "");

        write(
            &mut out,
            &format!(
                "Wet insulation area: {} SF at {}/SF",
                config.wet_area_sf,
                fmt_currency((config.rate_per_sf * 100.0).round() as i64)
            ),
        );
        if let Some(vents) = config.total_vents {
            write(&mut out, &format!("Estimated vents: {vents}"));
        }

        write(&mut out, "");
        write(&mut out, "PRICING");
        write(
            &mut out,
            &format!(
                "Vent System Lease and Commissioning: {}",
                fmt_currency(quote.base_lease_cents)
            ),
        );
        if quote.tax_amount_cents > 0 {
            write(
                &mut out,
                &format!(
                    "Rental Tax ({:.2}%): {}",
                    config.tax_rate * 100.0,
                    fmt_currency(quote.tax_amount_cents)
                ),
            );
        }
        if !config.waive_scans {
            write(
                &mut out,
                &format!(
                    "Moisture Monitoring ({} scans at {}-month intervals): {}",
                    config.scan_count,
                    config.scan_interval,
                    fmt_currency(quote.scan_total_cents)
                ),
            );
        }
        write(
            &mut out,
            &format!("CONTRACT TOTAL: {}", fmt_currency(quote.grand_total_cents)),
        );

        write(&mut out, "");
        write(&mut out, "PAYMENT OPTIONS");
        for plan in &quote.plans {
            let mut line = format!("{}: {}", plan.label, fmt_currency(plan.total_cents));
            if let Some(note) = &plan.note {
                let _ = write!(line, " ({note})");
            }
            write(&mut out, &line);
            for installment in &plan.installments {
                write(
                    &mut out,
                    &format!(
                        "  {} - {} - {}",
                        installment.label,
                        fmt_currency(installment.amount_cents),
                        installment.due
                    ),
                );
            }
        }

        for scan in &quote.scan_schedule {
            write(
                &mut out,
                &format!(
                    "{} - {} - {}",
                    scan.label,
                    fmt_currency(scan.amount_cents),
                    scan.due
                ),
            );
        }

        write(&mut out, "");
        write(
            &mut out,
            &format!(
                "This proposal is valid for {} days from the date of issue.",
                config.valid_days
            ),
        );

        Ok(out.into_bytes())
    }
}
