//! Refresh Rate Rounding
//!
//! Numeric helpers deciding when a refresh rate can be shown as a whole
//! number and how many decimals are needed to keep neighbouring rates apart.
//!
//! EDID-derived rates are rarely exact (59.94, 59.9999, 60.0012), so anything
//! within [`ROUNDING_TOLERANCE`] of an integer is displayed rounded.

/// Distance from an integer (Hz) under which a rate counts as whole
pub const ROUNDING_TOLERANCE: f64 = 0.1;

/// Most decimal places a disambiguated label will use
pub const MAX_DECIMALS: usize = 6;

/// Decimals used for a lone rate that is not close to an integer
const LONE_RATE_DECIMALS: usize = 3;

/// Whether `rate` is close enough to an integer to be displayed rounded
pub fn is_roundable(rate: f64) -> bool {
    rate.ceil() - rate < ROUNDING_TOLERANCE || rate - rate.floor() < ROUNDING_TOLERANCE
}

/// Whether two rates would be displayed with the same rounded value
///
/// Exactly equal rates always round the same, roundable or not.
pub fn would_round_the_same(a: f64, b: f64) -> bool {
    a == b || (is_roundable(a) && is_roundable(b) && a.round() == b.round())
}

/// Round `value` to `log10(denom)` decimal places
pub fn round_to_precision(value: f64, denom: f64) -> f64 {
    (value * denom).round() / denom
}

/// Label for a rate that has no rounding conflict with its neighbours
pub fn lone_label(rate: f64) -> String {
    if is_roundable(rate) {
        format!("{}", rate.round())
    } else {
        trim_decimals(format!(
            "{:.*}",
            LONE_RATE_DECIMALS,
            round_to_precision(rate, 10f64.powi(LONE_RATE_DECIMALS as i32))
        ))
    }
}

/// Find the fewest decimals at which every distinct adjacent pair of `rates`
/// stays distinct after rounding
///
/// Exactly equal neighbours are ignored, they can never be split. Gives up at
/// [`MAX_DECIMALS`].
pub fn distinguishing_decimals(rates: &[f64]) -> usize {
    (1..=MAX_DECIMALS)
        .find(|&decimals| {
            let denom = 10f64.powi(decimals as i32);
            rates.windows(2).all(|pair| {
                pair[0] == pair[1]
                    || round_to_precision(pair[0], denom) != round_to_precision(pair[1], denom)
            })
        })
        .unwrap_or(MAX_DECIMALS)
}

/// Format `rate` with exactly `decimals` decimal places
pub fn fixed_label(rate: f64, decimals: usize) -> String {
    format!(
        "{:.*}",
        decimals,
        round_to_precision(rate, 10f64.powi(decimals as i32))
    )
}

fn trim_decimals(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}
