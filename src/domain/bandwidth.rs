//! Bandwidth / regression-to-the-mean zone evaluation.
//!
//! Classifies the current multiple against fixed buy and sell zones and
//! counts how often the history touched a canonical fair multiple. Each
//! evaluation is stateless.

use crate::domain::error::{MetricIssue, Stage, ValuationError};
use crate::domain::multiple::{Multiple, PerShareMetric};
use crate::domain::rounding::{round2, round_to};
use crate::domain::series::MultipleSeries;
use chrono::NaiveDate;
use std::fmt;

pub const DEFAULT_MIN_HISTORY_YEARS: f64 = 10.0;

/// Closed interval of multiple values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Fixed multiples applied to the current metric per share.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetMultiples {
    pub wc: f64,
    pub buy: f64,
    pub sell: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BandwidthRules {
    pub buy_zone: Band,
    pub sell_threshold: f64,
    pub touch_band: Band,
    pub targets: TargetMultiples,
}

impl BandwidthRules {
    /// P/TBV: value zone up to 1.5x, overvalued from 3x, touches around 1x.
    pub const TANGIBLE_BOOK: BandwidthRules = BandwidthRules {
        buy_zone: Band::new(0.0, 1.5),
        sell_threshold: 3.0,
        touch_band: Band::new(0.9, 1.1),
        targets: TargetMultiples {
            wc: 0.90,
            buy: 1.15,
            sell: 3.00,
        },
    };

    /// P/EBIT: value zone 6x to 10x, overvalued from 20x, touches around 8x.
    pub const EBIT: BandwidthRules = BandwidthRules {
        buy_zone: Band::new(6.0, 10.0),
        sell_threshold: 20.0,
        touch_band: Band::new(7.5, 8.5),
        targets: TargetMultiples {
            wc: 7.5,
            buy: 8.5,
            sell: 22.0,
        },
    };

    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.buy_zone.min,
            self.buy_zone.max,
            self.sell_threshold,
            self.touch_band.min,
            self.touch_band.max,
            self.targets.wc,
            self.targets.buy,
            self.targets.sell,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("all bandwidth values must be finite and non-negative".into());
        }
        if self.buy_zone.min > self.buy_zone.max {
            return Err("buy zone min must not exceed buy zone max".into());
        }
        if self.touch_band.min > self.touch_band.max {
            return Err("touch band min must not exceed touch band max".into());
        }
        if self.buy_zone.max >= self.sell_threshold {
            return Err("buy zone must lie below the sell threshold".into());
        }
        if !(self.targets.wc <= self.targets.buy && self.targets.buy <= self.targets.sell) {
            return Err("target multiples must be ordered wc <= buy <= sell".into());
        }
        Ok(())
    }
}

/// Metric family the bandwidth approach is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BandwidthFamily {
    TangibleBook,
    Ebit,
}

impl BandwidthFamily {
    pub fn multiple(self) -> Multiple {
        match self {
            BandwidthFamily::TangibleBook => Multiple::PriceTangibleBookValue,
            BandwidthFamily::Ebit => Multiple::PriceEbit,
        }
    }

    pub fn metric(self) -> PerShareMetric {
        match self {
            BandwidthFamily::TangibleBook => PerShareMetric::TangibleBookValue,
            BandwidthFamily::Ebit => PerShareMetric::Ebit,
        }
    }

    pub fn default_rules(self) -> BandwidthRules {
        match self {
            BandwidthFamily::TangibleBook => BandwidthRules::TANGIBLE_BOOK,
            BandwidthFamily::Ebit => BandwidthRules::EBIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Signal {
    Buy,
    Neutral,
    Sell,
    Warning,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Buy => "buy",
            Signal::Neutral => "neutral",
            Signal::Sell => "sell",
            Signal::Warning => "warning",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZonePoint {
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneTargets {
    pub wc: f64,
    pub buy: f64,
    pub sell: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurrentValuation {
    pub price: f64,
    pub metric_per_share: f64,
    /// `None` when the metric per share is zero or negative.
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneEvaluation {
    pub symbol: String,
    pub family: BandwidthFamily,
    pub targets: ZoneTargets,
    pub current: CurrentValuation,
    pub signal: Signal,
    pub message: String,
    pub buy_zone_points: Vec<ZonePoint>,
    pub sell_zone_points: Vec<ZonePoint>,
    pub touches: usize,
    pub history_years: f64,
    pub rules: BandwidthRules,
}

/// Evaluate a series against `rules` given the current price and metric.
pub fn evaluate_zone(
    series: &MultipleSeries,
    family: BandwidthFamily,
    rules: &BandwidthRules,
    min_history_years: f64,
    current_price: f64,
    metric_per_share: f64,
) -> Result<ZoneEvaluation, ValuationError> {
    let symbol = series.symbol();
    if series.multiple() != family.multiple() {
        return Err(ValuationError::InvalidSeries {
            symbol: symbol.to_string(),
            reason: format!(
                "expected {} series, got {}",
                family.multiple(),
                series.multiple()
            ),
        });
    }

    let span = series.span_years();
    if series.is_empty() || span < min_history_years {
        return Err(ValuationError::insufficient(
            symbol,
            Stage::BandwidthZone,
            format!(
                "insufficient history: {:.2} years < {:.2} years",
                span, min_history_years
            ),
        ));
    }

    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(ValuationError::invalid_metric(
            symbol,
            "current price",
            current_price,
            if current_price.is_finite() {
                MetricIssue::NotPositive
            } else {
                MetricIssue::NonFinite
            },
        ));
    }
    if !metric_per_share.is_finite() {
        return Err(ValuationError::invalid_metric(
            symbol,
            family.metric(),
            metric_per_share,
            MetricIssue::NonFinite,
        ));
    }

    let skipped = series.valid().filter(|o| o.value < 0.0).count();
    if skipped > 0 {
        tracing::debug!(symbol, skipped, "negative multiples excluded from zone statistics");
    }

    let mut buy_zone_points = Vec::new();
    let mut sell_zone_points = Vec::new();
    let mut touches = 0usize;
    for o in series.non_negative() {
        let point = ZonePoint {
            date: o.date,
            price: o.price,
            ratio: o.value,
        };
        if rules.buy_zone.contains(o.value) {
            buy_zone_points.push(point);
        }
        if o.value >= rules.sell_threshold {
            sell_zone_points.push(point);
        }
        if rules.touch_band.contains(o.value) {
            touches += 1;
        }
    }

    let multiple = family.multiple();
    let (targets, ratio, signal, message) = if metric_per_share <= 0.0 {
        (
            ZoneTargets {
                wc: 0.0,
                buy: 0.0,
                sell: 0.0,
            },
            None,
            Signal::Warning,
            format!(
                "{} is zero or negative ({:.2}); {} is not interpretable",
                family.metric(),
                metric_per_share,
                multiple
            ),
        )
    } else {
        let ratio = round2(current_price / metric_per_share);
        let targets = ZoneTargets {
            wc: round2(rules.targets.wc * metric_per_share),
            buy: round2(rules.targets.buy * metric_per_share),
            sell: round2(rules.targets.sell * metric_per_share),
        };
        let (signal, message) = if ratio >= rules.sell_threshold {
            (
                Signal::Sell,
                format!(
                    "overvalued zone ({} = {} >= {})",
                    multiple, ratio, rules.sell_threshold
                ),
            )
        } else if ratio <= rules.buy_zone.max {
            (
                Signal::Buy,
                format!(
                    "value zone ({} = {} <= {})",
                    multiple, ratio, rules.buy_zone.max
                ),
            )
        } else {
            (
                Signal::Neutral,
                "outside clear buy and sell zones".to_string(),
            )
        };
        (targets, Some(ratio), signal, message)
    };

    tracing::info!(
        symbol,
        multiple = %multiple,
        %signal,
        touches,
        history_years = span,
        "bandwidth zone evaluated"
    );

    Ok(ZoneEvaluation {
        symbol: symbol.to_string(),
        family,
        targets,
        current: CurrentValuation {
            price: round_to(current_price, 4),
            metric_per_share: round_to(metric_per_share, 4),
            ratio,
        },
        signal,
        message,
        buy_zone_points,
        sell_zone_points,
        touches,
        history_years: round2(span),
        rules: *rules,
    })
}
