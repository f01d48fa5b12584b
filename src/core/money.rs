/// Half-up rounding to whole cents: `floor(x * 100 + 0.5) / 100`
pub(crate) fn round_to_cents(amount: f64) -> f64 {
    ((amount * 100.0) + 0.5).floor() / 100.0
}

/// Round to cents and render with exactly two decimals
pub(crate) fn format_cents(amount: f64) -> String {
    format!("{:.2}", round_to_cents(amount))
}
