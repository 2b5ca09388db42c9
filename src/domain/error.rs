//! Domain error types.
//!
//! Every engine operation returns one of these as a value; nothing is
//! raised past the engine boundary.

use std::fmt;

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    ScenarioExtraction,
    PriceTargets,
    Crv,
    BandwidthZone,
    Percentiles,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ScenarioExtraction => "scenario extraction",
            Stage::PriceTargets => "price targets",
            Stage::Crv => "crv",
            Stage::BandwidthZone => "bandwidth zone",
            Stage::Percentiles => "percentiles",
        };
        f.write_str(name)
    }
}

/// Why a fundamental value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetricIssue {
    /// NaN or infinite.
    NonFinite,
    Negative,
    /// Zero where a ratio would be meaningless.
    Zero,
    /// Zero or negative where strict positivity is required.
    NotPositive,
}

impl fmt::Display for MetricIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MetricIssue::NonFinite => "missing or not finite",
            MetricIssue::Negative => "negative, no meaningful target possible",
            MetricIssue::Zero => "zero, not meaningful",
            MetricIssue::NotPositive => "must be strictly positive",
        };
        f.write_str(text)
    }
}

/// Top-level error type for multicrv.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValuationError {
    #[error("insufficient data for {symbol} ({stage}): {reason}")]
    InsufficientData {
        symbol: String,
        stage: Stage,
        reason: String,
    },

    #[error("invalid {metric} for {symbol}: {value} is {issue}")]
    InvalidMetric {
        symbol: String,
        metric: String,
        value: f64,
        issue: MetricIssue,
    },

    #[error(
        "crv undefined for {symbol}: downside <= 0 (price {current_price}, worst case {worst_case_price}, \
         fair value {fair_value_price}, sell {sell_price})"
    )]
    UndefinedRatio {
        symbol: String,
        current_price: f64,
        worst_case_price: f64,
        fair_value_price: f64,
        sell_price: f64,
    },

    #[error("inconsistent buckets for {symbol} ({stage}): {reason}")]
    InconsistentBuckets {
        symbol: String,
        stage: Stage,
        reason: String,
    },

    #[error("{source_name} unavailable for {symbol}: {reason}")]
    UpstreamUnavailable {
        symbol: String,
        source_name: String,
        reason: String,
    },

    #[error("invalid series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("unsupported multiple: {name}")]
    UnsupportedMultiple { name: String },

    #[error("no sector mapping for {symbol}")]
    NoSectorMapping { symbol: String },

    #[error("no relevant multiples defined for the sectors of {symbol}: {sectors:?}")]
    NoSectorMultiples { symbol: String, sectors: Vec<String> },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },
}

impl ValuationError {
    pub(crate) fn insufficient(symbol: &str, stage: Stage, reason: impl Into<String>) -> Self {
        ValuationError::InsufficientData {
            symbol: symbol.to_string(),
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent_buckets(symbol: &str, reason: impl Into<String>) -> Self {
        ValuationError::InconsistentBuckets {
            symbol: symbol.to_string(),
            stage: Stage::Percentiles,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_metric(
        symbol: &str,
        metric: impl fmt::Display,
        value: f64,
        issue: MetricIssue,
    ) -> Self {
        ValuationError::InvalidMetric {
            symbol: symbol.to_string(),
            metric: metric.to_string(),
            value,
            issue,
        }
    }

    pub fn upstream(
        symbol: &str,
        source_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ValuationError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
