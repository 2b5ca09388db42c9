//! Percentile buckets and duration-in-range probabilities.
//!
//! The observed range `[min, max]` is cut into 12 equal-width buckets and a
//! 13th bucket `[0, min)` is prepended for live values below history.
//! Buckets are half-open `[lower, upper)`; the last one is closed.

use crate::domain::error::{Stage, ValuationError};
use crate::domain::multiple::Multiple;
use crate::domain::rounding::{ceil_to, round_to};
use crate::domain::series::MultipleSeries;

/// Equal-width divisions of the observed range.
pub const RANGE_DIVISIONS: usize = 12;
pub const BUCKET_COUNT: usize = RANGE_DIVISIONS + 1;
pub const DEFAULT_DECIMALS: u32 = 2;
const MIN_OBSERVATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketRange {
    pub lower: f64,
    pub upper: f64,
}

impl BucketRange {
    pub fn label(&self) -> String {
        format!("{:.3}-{:.3}", self.lower, self.upper)
    }
}

/// Contiguous, strictly increasing bucket ranges. Checked on construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketRanges {
    ranges: Vec<BucketRange>,
}

impl BucketRanges {
    pub fn new(symbol: &str, ranges: Vec<BucketRange>) -> Result<Self, ValuationError> {
        if ranges.is_empty() {
            return Err(ValuationError::inconsistent_buckets(symbol, "no ranges"));
        }
        if let Some(r) = ranges.iter().find(|r| !(r.lower < r.upper)) {
            return Err(ValuationError::inconsistent_buckets(
                symbol,
                format!(
                    "lower edge must be below upper edge, got {} >= {}",
                    r.lower, r.upper
                ),
            ));
        }
        if let Some(w) = ranges.windows(2).find(|w| w[0].upper != w[1].lower) {
            return Err(ValuationError::inconsistent_buckets(
                symbol,
                format!("gap between ranges: {} != {}", w[0].upper, w[1].lower),
            ));
        }
        Ok(Self { ranges })
    }

    pub fn from_edges(symbol: &str, edges: &[f64]) -> Result<Self, ValuationError> {
        let ranges = edges
            .windows(2)
            .map(|w| BucketRange {
                lower: w[0],
                upper: w[1],
            })
            .collect();
        Self::new(symbol, ranges)
    }

    pub fn ranges(&self) -> &[BucketRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn edges(&self) -> Vec<f64> {
        let mut edges: Vec<f64> = self.ranges.iter().map(|r| r.lower).collect();
        if let Some(last) = self.ranges.last() {
            edges.push(last.upper);
        }
        edges
    }

    /// Index of the bucket holding `value`, if any.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let last = self.ranges.len().checked_sub(1)?;
        if value.is_nan() {
            return None;
        }
        self.ranges.iter().enumerate().find_map(|(i, r)| {
            let in_upper = if i == last {
                value <= r.upper
            } else {
                value < r.upper
            };
            (value >= r.lower && in_upper).then_some(i)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DurationInRange {
    pub counts: Vec<usize>,
    pub shares: Vec<f64>,
    /// Valid observations, including any outside every range.
    pub total: usize,
    pub outside: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbabilityTable {
    pub labels: Vec<String>,
    pub probability_down: Vec<f64>,
    pub probability_up: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucket {
    pub range: BucketRange,
    pub count: usize,
    pub share: f64,
    pub probability_down: f64,
    pub probability_up: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketTable {
    pub multiple: Multiple,
    pub buckets: Vec<Bucket>,
    pub total_observations: usize,
}

impl BucketTable {
    pub fn edges(&self) -> Vec<f64> {
        let mut edges: Vec<f64> = self.buckets.iter().map(|b| b.range.lower).collect();
        if let Some(last) = self.buckets.last() {
            edges.push(last.range.upper);
        }
        edges
    }

    /// Bucket a live multiple value falls in. `None` above the historical
    /// maximum or below zero.
    pub fn locate(&self, value: f64) -> Option<&Bucket> {
        let last = self.buckets.len().checked_sub(1)?;
        self.buckets.iter().enumerate().find_map(|(i, b)| {
            let below_upper = if i == last {
                value <= b.range.upper
            } else {
                value < b.range.upper
            };
            (value >= b.range.lower && below_upper).then_some(b)
        })
    }
}

/// Bucket ranges for a series: `[0, min)` followed by 12 equal-width
/// buckets up to the maximum, edges rounded to `decimals`.
pub fn calculate_percentiles(
    series: &MultipleSeries,
    decimals: u32,
) -> Result<BucketRanges, ValuationError> {
    let values = series.valid_values();
    let (min, max) = min_max(&values).ok_or_else(|| {
        ValuationError::insufficient(series.symbol(), Stage::Percentiles, "no valid observations")
    })?;
    if min == max {
        return Err(ValuationError::inconsistent_buckets(
            series.symbol(),
            format!("{} has identical min and max ({})", series.multiple(), min),
        ));
    }

    let interval = (max - min) / RANGE_DIVISIONS as f64;
    let mut edges = Vec::with_capacity(BUCKET_COUNT + 1);
    edges.push(0.0);
    for i in 0..RANGE_DIVISIONS {
        edges.push(round_to(min + i as f64 * interval, decimals));
    }
    // Rounding up keeps the maximum inside the last bucket.
    edges.push(ceil_to(max, decimals));

    tracing::debug!(
        symbol = series.symbol(),
        multiple = %series.multiple(),
        ?edges,
        "percentile edges"
    );
    BucketRanges::from_edges(series.symbol(), &edges)
}

pub fn calculate_duration_in_range(
    series: &MultipleSeries,
    ranges: &BucketRanges,
) -> Result<DurationInRange, ValuationError> {
    let values = series.valid_values();
    if values.len() < MIN_OBSERVATIONS {
        return Err(ValuationError::insufficient(
            series.symbol(),
            Stage::Percentiles,
            format!(
                "need at least {} valid observations, have {}",
                MIN_OBSERVATIONS,
                values.len()
            ),
        ));
    }

    let mut counts = vec![0usize; ranges.len()];
    let mut outside = 0usize;
    for v in &values {
        match ranges.index_of(*v) {
            Some(i) => counts[i] += 1,
            None => outside += 1,
        }
    }
    if outside > 0 {
        tracing::warn!(
            symbol = series.symbol(),
            outside,
            "observations outside every bucket"
        );
    }

    let total = values.len();
    let shares = counts.iter().map(|&c| c as f64 / total as f64).collect();
    Ok(DurationInRange {
        counts,
        shares,
        total,
        outside,
    })
}

pub fn calculate_probability(
    series: &MultipleSeries,
    ranges: &BucketRanges,
) -> Result<ProbabilityTable, ValuationError> {
    let duration = calculate_duration_in_range(series, ranges)?;
    let (probability_down, probability_up) = cumulative(&duration);
    Ok(ProbabilityTable {
        labels: ranges.ranges().iter().map(BucketRange::label).collect(),
        probability_down,
        probability_up,
    })
}

/// Buckets, counts, shares and cumulative probabilities in one table.
pub fn compute_percentiles_and_probability(
    series: &MultipleSeries,
    decimals: u32,
) -> Result<BucketTable, ValuationError> {
    let ranges = calculate_percentiles(series, decimals)?;
    let duration = calculate_duration_in_range(series, &ranges)?;
    let (down, up) = cumulative(&duration);

    let buckets = ranges
        .ranges()
        .iter()
        .enumerate()
        .map(|(i, range)| Bucket {
            range: *range,
            count: duration.counts[i],
            share: duration.shares[i],
            probability_down: down[i],
            probability_up: up[i],
        })
        .collect();

    Ok(BucketTable {
        multiple: series.multiple(),
        buckets,
        total_observations: duration.total,
    })
}

/// Cumulative counts over the total, so the top bucket reaches exactly 1.0
/// when every observation is inside a bucket.
fn cumulative(duration: &DurationInRange) -> (Vec<f64>, Vec<f64>) {
    let mut running = 0usize;
    let down: Vec<f64> = duration
        .counts
        .iter()
        .map(|&c| {
            running += c;
            running as f64 / duration.total as f64
        })
        .collect();
    let up = down.iter().map(|d| 1.0 - d).collect();
    (down, up)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
