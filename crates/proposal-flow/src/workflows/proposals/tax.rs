//! State-level rental tax lookup.
//!
//! Base rates for the 50 US states plus DC. Local surcharges are out of
//! scope; operators supply an override rate when a locality applies one.

const STATE_TAX_RATES: [(&str, f64); 51] = [
    ("AL", 0.04),
    ("AK", 0.00),
    ("AZ", 0.056),
    ("AR", 0.065),
    ("CA", 0.0725),
    ("CO", 0.029),
    ("CT", 0.0635),
    ("DE", 0.00),
    ("FL", 0.06),
    ("GA", 0.04),
    ("HI", 0.04),
    ("ID", 0.06),
    ("IL", 0.0625),
    ("IN", 0.07),
    ("IA", 0.06),
    ("KS", 0.065),
    ("KY", 0.06),
    ("LA", 0.05),
    ("ME", 0.055),
    ("MD", 0.06),
    ("MA", 0.0625),
    ("MI", 0.06),
    ("MN", 0.06875),
    ("MS", 0.07),
    ("MO", 0.04225),
    ("MT", 0.00),
    ("NE", 0.055),
    ("NV", 0.0685),
    ("NH", 0.00),
    ("NJ", 0.06625),
    ("NM", 0.05125),
    ("NY", 0.04),
    ("NC", 0.0475),
    ("ND", 0.05),
    ("OH", 0.0575),
    ("OK", 0.045),
    ("OR", 0.00),
    ("PA", 0.06),
    ("RI", 0.07),
    ("SC", 0.06),
    ("SD", 0.045),
    ("TN", 0.07),
    ("TX", 0.0625),
    ("UT", 0.0610),
    ("VT", 0.06),
    ("VA", 0.053),
    ("WA", 0.065),
    ("WV", 0.06),
    ("WI", 0.05),
    ("WY", 0.04),
    ("DC", 0.06),
];

/// Look up the base rate for a 2-letter state/DC code, case-insensitive.
pub fn rate_for_state(code: &str) -> Option<f64> {
    let code = code.trim().to_ascii_uppercase();
    STATE_TAX_RATES
        .iter()
        .find(|(state, _)| *state == code)
        .map(|(_, rate)| *rate)
}

/// Resolve the effective tax rate: an explicit override wins, otherwise the
/// state table applies, otherwise zero.
pub fn resolve(override_rate: Option<f64>, state: Option<&str>) -> f64 {
    if let Some(rate) = override_rate {
        return rate;
    }
    state.and_then(rate_for_state).unwrap_or(0.0)
}
