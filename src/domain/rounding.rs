//! Decimal rounding used for every reported multiple and price.

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round up to `decimals` places. Values already on the grid, up to float
/// noise, are kept. The result is never below `value`.
pub fn ceil_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let nearest = scaled.round();
    let steps = if (scaled - nearest).abs() < 1e-9 {
        nearest
    } else {
        scaled.ceil()
    };
    let top = steps / factor;
    if top >= value {
        return top;
    }
    ((steps + 1.0) / factor).max(value)
}
