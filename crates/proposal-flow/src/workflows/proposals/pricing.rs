//! Payment-plan pricing for the vent system lease.
//!
//! All money is carried as integer cents. Fractional intermediate results
//! are rounded half-away-from-zero at every step enumerated below, and the
//! final installment of a multi-part plan is always the remainder, so each
//! plan's installments sum to its total to the cent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monetary amount in minor currency units (cents).
pub type Cents = i64;

/// Pay-in-Full discount and Easy Start surcharge, both applied to the
/// untaxed lease base.
const PAY_IN_FULL_DISCOUNT: f64 = 0.03;
const EASY_START_SURCHARGE: f64 = 0.03;

/// Easy Start installment split: 10% deposit, 40% at install readiness,
/// remainder at installation.
const EASY_START_DEPOSIT_SHARE: f64 = 0.10;
const EASY_START_INSTALL_SHARE: f64 = 0.40;

/// The three alternative payment plans offered on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    PayInFull,
    FiftyFifty,
    EasyStart,
}

impl PaymentOption {
    /// 1-based index used on the wire and in stored payment records.
    pub const fn index(self) -> u8 {
        match self {
            Self::PayInFull => 1,
            Self::FiftyFifty => 2,
            Self::EasyStart => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::PayInFull),
            2 => Some(Self::FiftyFifty),
            3 => Some(Self::EasyStart),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PayInFull => "Pay in Full",
            Self::FiftyFifty => "50% Now. 50% at Install.",
            Self::EasyStart => "Let\u{2019}s Get Going!",
        }
    }

    /// Label for the nth installment of this plan, used on receipts.
    pub fn installment_label(self, number: u8) -> String {
        match (self, number) {
            (Self::PayInFull, 1) => "Full Payment".to_string(),
            (Self::FiftyFifty, 1) => "Deposit (50%)".to_string(),
            (Self::FiftyFifty, 2) => "Balance (50%)".to_string(),
            (Self::EasyStart, 1) => "Deposit (10%)".to_string(),
            (Self::EasyStart, 2) => "Install Payment (40%)".to_string(),
            (Self::EasyStart, 3) => "Final Payment (50%)".to_string(),
            (_, number) => format!("Payment {number}"),
        }
    }
}

/// Which payment plans the operator chose to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionVisibility {
    pub pay_in_full: bool,
    pub fifty_fifty: bool,
    pub easy_start: bool,
}

impl Default for OptionVisibility {
    fn default() -> Self {
        Self {
            pay_in_full: false,
            fifty_fifty: true,
            easy_start: false,
        }
    }
}

impl OptionVisibility {
    fn is_visible(&self, option: PaymentOption) -> bool {
        match option {
            PaymentOption::PayInFull => self.pay_in_full,
            PaymentOption::FiftyFifty => self.fifty_fifty,
            PaymentOption::EasyStart => self.easy_start,
        }
    }

    fn any(&self) -> bool {
        self.pay_in_full || self.fifty_fifty || self.easy_start
    }
}

/// Inputs to a quote. Produced from a validated [`ProposalConfig`], so the
/// engine re-checks only what the type system cannot express.
///
/// [`ProposalConfig`]: super::domain::ProposalConfig
#[derive(Debug, Clone, PartialEq)]
pub struct PricingInputs {
    pub wet_area_sf: u32,
    pub rate_per_sf: f64,
    pub tax_rate: f64,
    pub scan_unit_cost: f64,
    pub scan_count: u32,
    pub waive_scans: bool,
    pub visibility: OptionVisibility,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

/// One scheduled partial payment within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installment {
    pub label: String,
    pub amount_cents: Cents,
    pub due: &'static str,
}

/// A fully computed payment plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentPlan {
    pub option: PaymentOption,
    pub label: &'static str,
    pub total_cents: Cents,
    /// Savings (Pay in Full) or convenience-fee note, when the plan total
    /// differs from the standard lease subtotal.
    pub note: Option<String>,
    pub installments: Vec<Installment>,
}

/// Shared figures plus the visible payment plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub base_lease_cents: Cents,
    pub tax_amount_cents: Cents,
    pub lease_subtotal_cents: Cents,
    pub scan_total_cents: Cents,
    pub grand_total_cents: Cents,
    /// Flat per-scan invoices, never discounted or split.
    pub scan_schedule: Vec<Installment>,
    pub plans: Vec<PaymentPlan>,
}

impl PriceQuote {
    pub fn plan(&self, option: PaymentOption) -> Option<&PaymentPlan> {
        self.plans.iter().find(|plan| plan.option == option)
    }
}

/// Round a dollar amount to cents, half away from zero.
fn to_cents(dollars: f64) -> Cents {
    (dollars * 100.0).round() as Cents
}

fn dollars(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as a display amount, e.g. `$25,346.00`.
pub fn fmt_currency(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Pure pricing calculator; no side effects, no I/O.
pub struct PricingEngine;

impl PricingEngine {
    pub fn quote(inputs: &PricingInputs) -> Result<PriceQuote, PricingError> {
        for (field, value) in [
            ("rate_per_sf", inputs.rate_per_sf),
            ("tax_rate", inputs.tax_rate),
            ("scan_unit_cost", inputs.scan_unit_cost),
        ] {
            if value < 0.0 {
                return Err(PricingError::Negative { field });
            }
        }

        let base_lease = f64::from(inputs.wet_area_sf) * inputs.rate_per_sf;
        let base_lease_cents = to_cents(base_lease);
        let tax_amount_cents = to_cents(base_lease * inputs.tax_rate);
        let lease_subtotal_cents = base_lease_cents + tax_amount_cents;

        let scan_unit_cents = to_cents(inputs.scan_unit_cost);
        let scan_total_cents = if inputs.waive_scans {
            0
        } else {
            to_cents(inputs.scan_unit_cost * f64::from(inputs.scan_count))
        };
        let grand_total_cents = lease_subtotal_cents + scan_total_cents;

        let scan_schedule = if inputs.waive_scans {
            Vec::new()
        } else {
            (1..=inputs.scan_count)
                .map(|n| Installment {
                    label: format!("Moisture Scan {n} of {}", inputs.scan_count),
                    amount_cents: scan_unit_cents,
                    due: "Net 15 from report delivery",
                })
                .collect()
        };

        // An operator who hides every plan still needs something to accept;
        // the standard 50/50 plan is the forced fallback.
        let visibility = if inputs.visibility.any() {
            inputs.visibility
        } else {
            OptionVisibility::default()
        };

        let mut plans = Vec::new();
        if visibility.is_visible(PaymentOption::PayInFull) {
            plans.push(Self::pay_in_full(
                base_lease,
                inputs.tax_rate,
                lease_subtotal_cents,
            ));
        }
        if visibility.is_visible(PaymentOption::FiftyFifty) {
            plans.push(Self::fifty_fifty(lease_subtotal_cents));
        }
        if visibility.is_visible(PaymentOption::EasyStart) {
            plans.push(Self::easy_start(base_lease, inputs.tax_rate));
        }

        Ok(PriceQuote {
            base_lease_cents,
            tax_amount_cents,
            lease_subtotal_cents,
            scan_total_cents,
            grand_total_cents,
            scan_schedule,
            plans,
        })
    }

    /// Option 1: 3% discount on the lease base before tax, one payment.
    fn pay_in_full(base_lease: f64, tax_rate: f64, lease_subtotal_cents: Cents) -> PaymentPlan {
        let discounted_cents = to_cents(base_lease * (1.0 - PAY_IN_FULL_DISCOUNT));
        let tax_cents = to_cents(dollars(discounted_cents) * tax_rate);
        let total_cents = discounted_cents + tax_cents;
        let savings_cents = lease_subtotal_cents - total_cents;

        PaymentPlan {
            option: PaymentOption::PayInFull,
            label: PaymentOption::PayInFull.label(),
            total_cents,
            note: Some(format!("Save {} (3% discount)", fmt_currency(savings_cents))),
            installments: vec![Installment {
                label: PaymentOption::PayInFull.installment_label(1),
                amount_cents: total_cents,
                due: "Upon contract execution",
            }],
        }
    }

    /// Option 2: the standard plan, two equal halves of the lease subtotal.
    /// The balance is the remainder so the halves always rejoin exactly.
    fn fifty_fifty(lease_subtotal_cents: Cents) -> PaymentPlan {
        let deposit_cents = (lease_subtotal_cents as f64 / 2.0).round() as Cents;
        let balance_cents = lease_subtotal_cents - deposit_cents;

        PaymentPlan {
            option: PaymentOption::FiftyFifty,
            label: PaymentOption::FiftyFifty.label(),
            total_cents: lease_subtotal_cents,
            note: None,
            installments: vec![
                Installment {
                    label: PaymentOption::FiftyFifty.installment_label(1),
                    amount_cents: deposit_cents,
                    due: "Upon contract execution",
                },
                Installment {
                    label: PaymentOption::FiftyFifty.installment_label(2),
                    amount_cents: balance_cents,
                    due: "Net 30 from installation completion",
                },
            ],
        }
    }

    /// Option 3: 3% convenience surcharge on the lease base before tax,
    /// split 10% / 40% / remainder.
    fn easy_start(base_lease: f64, tax_rate: f64) -> PaymentPlan {
        let surcharged_cents = to_cents(base_lease * (1.0 + EASY_START_SURCHARGE));
        let tax_cents = to_cents(dollars(surcharged_cents) * tax_rate);
        let total_cents = surcharged_cents + tax_cents;

        let deposit_cents = (total_cents as f64 * EASY_START_DEPOSIT_SHARE).round() as Cents;
        let install_cents = (total_cents as f64 * EASY_START_INSTALL_SHARE).round() as Cents;
        let final_cents = total_cents - deposit_cents - install_cents;

        PaymentPlan {
            option: PaymentOption::EasyStart,
            label: PaymentOption::EasyStart.label(),
            total_cents,
            note: Some("Includes a 3% convenience fee".to_string()),
            installments: vec![
                Installment {
                    label: PaymentOption::EasyStart.installment_label(1),
                    amount_cents: deposit_cents,
                    due: "Upon contract execution",
                },
                Installment {
                    label: PaymentOption::EasyStart.installment_label(2),
                    amount_cents: install_cents,
                    due: "Upon installation readiness",
                },
                Installment {
                    label: PaymentOption::EasyStart.installment_label(3),
                    amount_cents: final_cents,
                    due: "Upon installation completion",
                },
            ],
        }
    }
}
