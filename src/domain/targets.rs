//! Projection of scenario multiples into per-share price targets.
//!
//! Price multiples: target = multiple x current metric per share.
//! EV multiples:    EV target = multiple x current base, then
//!                  equity = EV - net debt - minority interest - preferred stock,
//!                  target = equity / shares outstanding.

use crate::domain::error::{MetricIssue, ValuationError};
use crate::domain::multiple::{EvBase, Multiple, MultipleFamily, PerShareMetric};
use crate::domain::rounding::round2;
use crate::domain::scenario::ScenarioSet;
use crate::ports::fundamentals_port::{BalanceSheetItem, FundamentalsPort};

/// Inputs that turned scenario multiples into prices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetBasis {
    PerShare {
        metric: PerShareMetric,
        value: f64,
    },
    EnterpriseValue(EvBridge),
}

/// Current-quarter terms of the EV to equity bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvBridge {
    pub base: EvBase,
    pub base_value: f64,
    pub net_debt: f64,
    pub minority_interest: f64,
    pub preferred_stock: f64,
    pub shares_outstanding: f64,
}

impl EvBridge {
    pub fn validate(&self, symbol: &str) -> Result<(), ValuationError> {
        require_finite(symbol, self.base, self.base_value)?;
        if self.base_value < 0.0 {
            return Err(ValuationError::invalid_metric(
                symbol,
                self.base,
                self.base_value,
                MetricIssue::Negative,
            ));
        }
        if self.base_value == 0.0 {
            return Err(ValuationError::invalid_metric(
                symbol,
                self.base,
                self.base_value,
                MetricIssue::Zero,
            ));
        }
        require_finite(symbol, BalanceSheetItem::NetDebt, self.net_debt)?;
        require_finite(symbol, BalanceSheetItem::SharesOutstanding, self.shares_outstanding)?;
        if self.shares_outstanding <= 0.0 {
            return Err(ValuationError::invalid_metric(
                symbol,
                BalanceSheetItem::SharesOutstanding,
                self.shares_outstanding,
                MetricIssue::NotPositive,
            ));
        }
        for (item, value) in [
            (BalanceSheetItem::MinorityInterest, self.minority_interest),
            (BalanceSheetItem::PreferredStock, self.preferred_stock),
        ] {
            require_finite(symbol, item, value)?;
            if value < 0.0 {
                return Err(ValuationError::invalid_metric(
                    symbol,
                    item,
                    value,
                    MetricIssue::Negative,
                ));
            }
        }
        Ok(())
    }

    /// Equity value per share for an enterprise-value multiple.
    fn price_for(&self, multiple: f64) -> f64 {
        let ev = self.base_value * multiple;
        let equity = ev - self.net_debt - self.minority_interest - self.preferred_stock;
        equity / self.shares_outstanding
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceTargetSet {
    pub multiple: Multiple,
    pub wc: f64,
    pub buy: f64,
    pub fv: f64,
    pub sell: f64,
    pub basis: TargetBasis,
    /// Carried from the scenarios the targets were projected from.
    pub buy_fallback_used: bool,
}

/// Resolve the current fundamentals for the scenario's multiple and project
/// the four targets.
pub fn project_price_targets(
    fundamentals: &dyn FundamentalsPort,
    scenarios: &ScenarioSet,
    symbol: &str,
) -> Result<PriceTargetSet, ValuationError> {
    match scenarios.multiple.family() {
        MultipleFamily::Price(metric) => {
            let value = fundamentals.current_per_share_metric(symbol, metric)?;
            tracing::debug!(symbol, %metric, value, "current per-share metric");
            targets_from_metric(symbol, scenarios, metric, value)
        }
        MultipleFamily::Enterprise(base) => {
            let bridge = EvBridge {
                base,
                base_value: fundamentals.current_ev_base(symbol, base)?,
                net_debt: fundamentals.balance_sheet_item(symbol, BalanceSheetItem::NetDebt)?,
                minority_interest: fundamentals
                    .balance_sheet_item(symbol, BalanceSheetItem::MinorityInterest)?,
                preferred_stock: fundamentals
                    .balance_sheet_item(symbol, BalanceSheetItem::PreferredStock)?,
                shares_outstanding: fundamentals
                    .balance_sheet_item(symbol, BalanceSheetItem::SharesOutstanding)?,
            };
            tracing::debug!(symbol, ?bridge, "current EV bridge");
            targets_from_ev_bridge(symbol, scenarios, bridge)
        }
    }
}

pub fn targets_from_metric(
    symbol: &str,
    scenarios: &ScenarioSet,
    metric: PerShareMetric,
    metric_per_share: f64,
) -> Result<PriceTargetSet, ValuationError> {
    require_finite(symbol, metric, metric_per_share)?;
    if metric_per_share <= 0.0 {
        return Err(ValuationError::invalid_metric(
            symbol,
            metric,
            metric_per_share,
            MetricIssue::NotPositive,
        ));
    }

    let targets = PriceTargetSet {
        multiple: scenarios.multiple,
        wc: round2(scenarios.wc * metric_per_share),
        buy: round2(scenarios.buy * metric_per_share),
        fv: round2(scenarios.fv * metric_per_share),
        sell: round2(scenarios.sell * metric_per_share),
        basis: TargetBasis::PerShare {
            metric,
            value: metric_per_share,
        },
        buy_fallback_used: scenarios.buy_fallback_used,
    };
    log_targets(symbol, &targets);
    Ok(targets)
}

pub fn targets_from_ev_bridge(
    symbol: &str,
    scenarios: &ScenarioSet,
    bridge: EvBridge,
) -> Result<PriceTargetSet, ValuationError> {
    bridge.validate(symbol)?;

    let price = |multiple: f64| -> Result<f64, ValuationError> {
        let p = bridge.price_for(multiple);
        require_finite(symbol, "equity target per share", p)?;
        Ok(round2(p))
    };

    let targets = PriceTargetSet {
        multiple: scenarios.multiple,
        wc: price(scenarios.wc)?,
        buy: price(scenarios.buy)?,
        fv: price(scenarios.fv)?,
        sell: price(scenarios.sell)?,
        basis: TargetBasis::EnterpriseValue(bridge),
        buy_fallback_used: scenarios.buy_fallback_used,
    };
    log_targets(symbol, &targets);
    Ok(targets)
}

fn require_finite(
    symbol: &str,
    name: impl std::fmt::Display,
    value: f64,
) -> Result<(), ValuationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValuationError::invalid_metric(
            symbol,
            name,
            value,
            MetricIssue::NonFinite,
        ))
    }
}

fn log_targets(symbol: &str, targets: &PriceTargetSet) {
    tracing::info!(
        symbol,
        multiple = %targets.multiple,
        wc = targets.wc,
        buy = targets.buy,
        fv = targets.fv,
        sell = targets.sell,
        "price targets projected"
    );
}
