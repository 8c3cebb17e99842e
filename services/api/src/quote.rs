use clap::Args;
use proposal_flow::error::AppError;
use proposal_flow::workflows::proposals::pricing::fmt_currency;
use proposal_flow::workflows::proposals::{
    tax, OptionVisibility, PricingEngine, PricingInputs,
};

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Wet insulation area in square feet
    #[arg(long)]
    pub(crate) wet_sf: u32,
    /// Lease rate per square foot
    #[arg(long, default_value_t = 2.00)]
    pub(crate) rate_psf: f64,
    /// 2-letter state code used to look up the rental tax rate
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Explicit tax rate, overriding the state lookup (e.g. 0.0925)
    #[arg(long)]
    pub(crate) tax_rate: Option<f64>,
    /// Cost per moisture scan
    #[arg(long, default_value_t = 4500.0)]
    pub(crate) scan_cost: f64,
    /// Number of scheduled moisture scans
    #[arg(long, default_value_t = 4)]
    pub(crate) num_scans: u32,
    /// Omit the moisture scan program entirely
    #[arg(long)]
    pub(crate) waive_scans: bool,
    /// Include the Pay in Full plan
    #[arg(long)]
    pub(crate) pay_in_full: bool,
    /// Include the Easy Start plan
    #[arg(long)]
    pub(crate) easy_start: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let tax_rate = tax::resolve(args.tax_rate, args.state.as_deref());
    let inputs = PricingInputs {
        wet_area_sf: args.wet_sf,
        rate_per_sf: args.rate_psf,
        tax_rate,
        scan_unit_cost: args.scan_cost,
        scan_count: args.num_scans,
        waive_scans: args.waive_scans,
        visibility: OptionVisibility {
            pay_in_full: args.pay_in_full,
            fifty_fifty: true,
            easy_start: args.easy_start,
        },
    };

    let quote = PricingEngine::quote(&inputs).map_err(|err| AppError::Proposal(err.into()))?;

    println!("Proposal pricing");
    println!(
        "- Vent system lease ({} SF at {}/SF): {}",
        args.wet_sf,
        fmt_currency((args.rate_psf * 100.0).round() as i64),
        fmt_currency(quote.base_lease_cents)
    );
    if quote.tax_amount_cents > 0 {
        println!(
            "- Rental tax ({:.2}%): {}",
            tax_rate * 100.0,
            fmt_currency(quote.tax_amount_cents)
        );
    }
    if !args.waive_scans {
        println!(
            "- Moisture monitoring ({} scans at {} each): {}",
            args.num_scans,
            fmt_currency((args.scan_cost * 100.0).round() as i64),
            fmt_currency(quote.scan_total_cents)
        );
    }
    println!("- Contract total: {}", fmt_currency(quote.grand_total_cents));

    println!("\nPayment options");
    for plan in &quote.plans {
        match &plan.note {
            Some(note) => println!(
                "- {} | {} ({note})",
                plan.label,
                fmt_currency(plan.total_cents)
            ),
            None => println!("- {} | {}", plan.label, fmt_currency(plan.total_cents)),
        }
        for installment in &plan.installments {
            println!(
                "    {} | {} | {}",
                installment.label,
                fmt_currency(installment.amount_cents),
                installment.due
            );
        }
    }

    if !quote.scan_schedule.is_empty() {
        println!("\nMoisture scan invoicing");
        for scan in &quote.scan_schedule {
            println!(
                "- {} | {} | {}",
                scan.label,
                fmt_currency(scan.amount_cents),
                scan.due
            );
        }
    }

    Ok(())
}
