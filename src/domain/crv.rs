//! Chance-risk ratio (CRV) from scenario price targets.
//!
//! downside             = price               if price <= WC
//!                      = price - WC          otherwise
//! upside_conservative  = max(FV - price, 0)
//! upside_aggressive    = max(SELL - price, 0)
//! crv_*                = upside_* / downside, undefined when downside <= 0

use crate::domain::error::{MetricIssue, ValuationError};
use crate::domain::multiple::Multiple;
use crate::domain::rounding::round2;
use crate::domain::targets::PriceTargetSet;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrvInputs {
    pub current_price: f64,
    pub downside: f64,
    pub upside_conservative: f64,
    pub upside_aggressive: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrvResult {
    pub symbol: String,
    pub multiple: Multiple,
    pub crv_conservative: f64,
    pub crv_aggressive: f64,
    pub inputs: CrvInputs,
    pub course_targets: PriceTargetSet,
    pub buy_fallback_used: bool,
}

impl CrvResult {
    /// Whether the conservative ratio reaches a caller-owned threshold.
    pub fn is_positive(&self, threshold: f64) -> bool {
        self.crv_conservative >= threshold
    }
}

pub fn downside(current_price: f64, worst_case_price: f64) -> f64 {
    if current_price <= worst_case_price {
        current_price
    } else {
        current_price - worst_case_price
    }
}

/// Compute both ratios for a current price against a set of targets.
pub fn crv_from_targets(
    symbol: &str,
    current_price: f64,
    targets: &PriceTargetSet,
) -> Result<CrvResult, ValuationError> {
    if !current_price.is_finite() {
        return Err(ValuationError::invalid_metric(
            symbol,
            "current price",
            current_price,
            MetricIssue::NonFinite,
        ));
    }

    let downside = downside(current_price, targets.wc);
    let upside_conservative = (targets.fv - current_price).max(0.0);
    let upside_aggressive = (targets.sell - current_price).max(0.0);

    if downside <= 0.0 {
        tracing::warn!(symbol, current_price, wc = targets.wc, "crv undefined");
        return Err(ValuationError::UndefinedRatio {
            symbol: symbol.to_string(),
            current_price,
            worst_case_price: targets.wc,
            fair_value_price: targets.fv,
            sell_price: targets.sell,
        });
    }

    let result = CrvResult {
        symbol: symbol.to_string(),
        multiple: targets.multiple,
        crv_conservative: round2(upside_conservative / downside),
        crv_aggressive: round2(upside_aggressive / downside),
        inputs: CrvInputs {
            current_price,
            downside: round2(downside),
            upside_conservative: round2(upside_conservative),
            upside_aggressive: round2(upside_aggressive),
        },
        course_targets: targets.clone(),
        buy_fallback_used: targets.buy_fallback_used,
    };
    tracing::info!(
        symbol,
        multiple = %result.multiple,
        crv_conservative = result.crv_conservative,
        crv_aggressive = result.crv_aggressive,
        "crv computed"
    );
    Ok(result)
}
