//! Proposal records and construction-time validation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pricing::{Cents, OptionVisibility, PaymentOption, PricingInputs};
use super::tax;

/// Opaque, externally generated proposal token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("proposal id must be a non-empty token")]
    EmptyId,
    #[error("{field} must not be negative")]
    NegativeNumber { field: &'static str },
    #[error("{field} is not a valid calendar date: '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("no recipient email address available")]
    MissingEmail,
    #[error("signer name is required")]
    MissingSignerName,
    #[error("unknown payment option index {0}")]
    UnknownOption(u8),
}

/// A numeric field as submitted by the builder UI: sometimes a JSON number,
/// sometimes a string, sometimes blank.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Parse a non-negative number, falling closed to `default` on missing
    /// or malformed input. Negative values are a hard error, never clamped.
    fn parse_or_default(
        value: Option<&RawNumber>,
        default: f64,
        field: &'static str,
    ) -> Result<f64, ValidationError> {
        let parsed = match value {
            None => return Ok(default),
            Some(RawNumber::Number(n)) => Some(*n),
            Some(RawNumber::Text(raw)) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Ok(default);
                }
                raw.parse::<f64>().ok()
            }
        };

        match parsed {
            Some(n) if n < 0.0 => Err(ValidationError::NegativeNumber { field }),
            Some(n) => Ok(n),
            None => Ok(default),
        }
    }

    /// Lenient parse for display-only integers; anything unusable is `None`.
    fn parse_display(value: Option<&RawNumber>) -> Option<u32> {
        match value {
            Some(RawNumber::Number(n)) if *n >= 0.0 => Some(*n as u32),
            Some(RawNumber::Text(raw)) => raw.trim().parse::<f64>().ok().and_then(|n| {
                if n >= 0.0 {
                    Some(n as u32)
                } else {
                    None
                }
            }),
            _ => None,
        }
    }

    /// Optional rate: blank or malformed means "not provided".
    fn parse_optional_rate(value: Option<&RawNumber>) -> Option<f64> {
        match value {
            Some(RawNumber::Number(n)) => Some(*n),
            Some(RawNumber::Text(raw)) => raw.trim().parse::<f64>().ok(),
            None => None,
        }
    }
}

/// Raw builder payload for a new proposal. Field names match the builder
/// UI's JSON; every field is optional and defaults apply during validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalDraft {
    pub client_company: Option<String>,
    pub client_contact: Option<String>,
    pub client_title: Option<String>,
    pub client_phone: Option<String>,
    pub client_email: Option<String>,
    pub project_name: Option<String>,
    pub project_address: Option<String>,
    pub project_city: Option<String>,
    pub project_state: Option<String>,
    pub project_zip: Option<String>,
    pub project_section: Option<String>,
    #[serde(rename = "wetSF")]
    pub wet_sf: Option<RawNumber>,
    #[serde(rename = "ratePSF")]
    pub rate_psf: Option<RawNumber>,
    pub scan_cost: Option<RawNumber>,
    pub num_scans: Option<RawNumber>,
    pub scan_interval: Option<String>,
    pub total_vents: Option<RawNumber>,
    pub tax_rate: Option<RawNumber>,
    pub tax_rate_override: Option<RawNumber>,
    pub proposal_date: Option<String>,
    pub valid_days: Option<RawNumber>,
    pub show_option0: Option<bool>,
    pub show_option1: Option<bool>,
    pub show_option2: Option<bool>,
    pub waive_scans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFields {
    pub company: Option<String>,
    pub contact: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub section: Option<String>,
}

/// Immutable-once-created proposal parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalConfig {
    pub id: ProposalId,
    pub client: ClientFields,
    pub project: ProjectFields,
    pub wet_area_sf: u32,
    pub rate_per_sf: f64,
    pub scan_unit_cost: f64,
    pub scan_count: u32,
    pub scan_interval: String,
    pub total_vents: Option<u32>,
    pub tax_rate: f64,
    pub visibility: OptionVisibility,
    pub waive_scans: bool,
    pub issue_date: NaiveDate,
    pub valid_days: u32,
}

impl ProposalConfig {
    /// Validate a raw draft into a config. Missing or malformed numeric
    /// fields fall closed to the documented defaults; negative numbers and
    /// unparseable dates are hard errors.
    pub fn from_draft(
        id: ProposalId,
        draft: &ProposalDraft,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        if id.0.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }

        let wet_area_sf =
            RawNumber::parse_or_default(draft.wet_sf.as_ref(), 0.0, "wet area")? as u32;
        let rate_per_sf = RawNumber::parse_or_default(draft.rate_psf.as_ref(), 2.00, "rate")?;
        let scan_unit_cost =
            RawNumber::parse_or_default(draft.scan_cost.as_ref(), 4500.0, "scan cost")?;
        let scan_count =
            RawNumber::parse_or_default(draft.num_scans.as_ref(), 4.0, "scan count")? as u32;
        let valid_days =
            RawNumber::parse_or_default(draft.valid_days.as_ref(), 30.0, "validity window")? as u32;

        let override_rate = RawNumber::parse_optional_rate(draft.tax_rate_override.as_ref())
            .or_else(|| RawNumber::parse_optional_rate(draft.tax_rate.as_ref()));
        if let Some(rate) = override_rate {
            if rate < 0.0 {
                return Err(ValidationError::NegativeNumber { field: "tax rate" });
            }
        }
        let tax_rate = tax::resolve(override_rate, draft.project_state.as_deref());

        let issue_date = match draft.proposal_date.as_deref() {
            None => today,
            Some(raw) if raw.trim().is_empty() => today,
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ValidationError::InvalidDate {
                    field: "proposal date",
                    value: raw.to_string(),
                }
            })?,
        };

        Ok(Self {
            id,
            client: ClientFields {
                company: non_blank(&draft.client_company),
                contact: non_blank(&draft.client_contact),
                title: non_blank(&draft.client_title),
                phone: non_blank(&draft.client_phone),
                email: non_blank(&draft.client_email),
            },
            project: ProjectFields {
                name: non_blank(&draft.project_name).unwrap_or_else(|| "Project".to_string()),
                address: non_blank(&draft.project_address),
                city: non_blank(&draft.project_city),
                state: non_blank(&draft.project_state),
                zip: non_blank(&draft.project_zip),
                section: non_blank(&draft.project_section),
            },
            wet_area_sf,
            rate_per_sf,
            scan_unit_cost,
            scan_count,
            scan_interval: non_blank(&draft.scan_interval).unwrap_or_else(|| "3".to_string()),
            total_vents: RawNumber::parse_display(draft.total_vents.as_ref()),
            tax_rate,
            visibility: OptionVisibility {
                pay_in_full: draft.show_option0.unwrap_or(false),
                fifty_fifty: draft.show_option1.unwrap_or(true),
                easy_start: draft.show_option2.unwrap_or(false),
            },
            waive_scans: draft.waive_scans.unwrap_or(false),
            issue_date,
            valid_days,
        })
    }

    pub fn pricing_inputs(&self) -> PricingInputs {
        PricingInputs {
            wet_area_sf: self.wet_area_sf,
            rate_per_sf: self.rate_per_sf,
            tax_rate: self.tax_rate,
            scan_unit_cost: self.scan_unit_cost,
            scan_count: self.scan_count,
            waive_scans: self.waive_scans,
            visibility: self.visibility,
        }
    }

    pub fn valid_through(&self) -> NaiveDate {
        self.issue_date + Duration::days(i64::from(self.valid_days))
    }

    /// Display number derived from the issue date, e.g. `P-2026-0220`.
    pub fn proposal_number(&self) -> String {
        format!(
            "P-{}-{:02}{:02}",
            self.issue_date.year(),
            self.issue_date.month(),
            self.issue_date.day()
        )
    }

    /// Single-line mailing form of the project address.
    pub fn full_address(&self) -> String {
        let mut city_state_zip = [self.project.city.as_deref(), self.project.state.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if let Some(zip) = self.project.zip.as_deref() {
            if city_state_zip.is_empty() {
                city_state_zip = zip.to_string();
            } else {
                city_state_zip.push(' ');
                city_state_zip.push_str(zip);
            }
        }

        [self.project.address.clone(), Some(city_state_zip)]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Lifecycle status, strictly ordered for forward-only transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Signed,
    Paid,
}

impl ProposalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Signed => "signed",
            Self::Paid => "paid",
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Sent => 1,
            Self::Viewed => 2,
            Self::Signed => 3,
            Self::Paid => 4,
        }
    }
}

/// Server-owned proposal state: the config snapshot plus lifecycle status
/// and once-only transition timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub config: ProposalConfig,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl ProposalRecord {
    pub fn new(config: ProposalConfig, created_at: DateTime<Utc>) -> Self {
        Self {
            config,
            status: ProposalStatus::Draft,
            created_at,
            sent_at: None,
            viewed_at: None,
            signed_at: None,
            paid_at: None,
        }
    }

    pub fn id(&self) -> &ProposalId {
        &self.config.id
    }
}

/// Request metadata captured on counterparty-facing actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One accepted signature. Project and client identifiers are denormalized
/// so the audit record stands on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub proposal_id: ProposalId,
    pub signer_name: String,
    pub signer_date: String,
    pub selected_option: PaymentOption,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub accepted_at: DateTime<Utc>,
    pub project_name: String,
    pub client_company: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Ach,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Credit Card",
            Self::Ach => "ACH / Bank Transfer",
        }
    }
}

/// One completed payment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub proposal_id: ProposalId,
    pub option: PaymentOption,
    /// 1-based installment index within the chosen plan.
    pub installment: u8,
    pub amount_cents: Cents,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Sent,
    Viewed,
    Signed,
    Payment,
}

impl EventKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Signed => "signed",
            Self::Payment => "payment",
        }
    }
}

/// Append-only audit entry; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalEvent {
    pub proposal_id: ProposalId,
    pub kind: EventKind,
    pub detail: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

impl ProposalEvent {
    pub fn new(proposal_id: ProposalId, kind: EventKind, at: DateTime<Utc>) -> Self {
        Self {
            proposal_id,
            kind,
            detail: BTreeMap::new(),
            at,
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }
}
