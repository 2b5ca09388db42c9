//! Scenario extraction: Worst-Case, Buy, Fair-Value and Sell multiples
//! from a multi-year multiple history.
//!
//! BUY  = median of the 3 lowest yearly minima strictly before the year of
//!        the global minimum (whole series as fallback).
//! SELL = median of the 3 highest yearly maxima over the whole series.
//! WC   = BUY / 1.2, FV = (BUY + SELL) / 2. All rounded to 2 decimals.

use crate::domain::error::{MetricIssue, Stage, ValuationError};
use crate::domain::multiple::Multiple;
use crate::domain::rounding::round2;
use crate::domain::series::MultipleSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Number of distinct years the buy and sell medians are taken over.
pub const SCENARIO_YEARS: usize = 3;

/// BUY multiple divided by this gives the worst case.
pub const WORST_CASE_DIVISOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalMin {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuyCase {
    pub global_min: GlobalMin,
    pub buy: f64,
    /// The pre-minimum years were too few and the whole series was used.
    pub fallback_used: bool,
}

/// The four scenario multiples of one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioSet {
    pub multiple: Multiple,
    pub wc: f64,
    pub buy: f64,
    pub fv: f64,
    pub sell: f64,
    pub global_min: GlobalMin,
    pub buy_fallback_used: bool,
}

impl ScenarioSet {
    /// True when WC <= BUY <= FV <= SELL. Not guaranteed by construction
    /// since BUY and SELL are drawn from different year sets.
    pub fn is_ordered(&self) -> bool {
        self.wc <= self.buy && self.buy <= self.fv && self.fv <= self.sell
    }
}

pub fn extract_scenarios(series: &MultipleSeries) -> Result<ScenarioSet, ValuationError> {
    let buy_case = calculate_buy_case(series)?;
    let wc = calculate_worst_case(series.symbol(), buy_case.buy)?;
    let sell = calculate_sell_case(series)?;
    let fv = calculate_fair_value(buy_case.buy, sell);

    let scenarios = ScenarioSet {
        multiple: series.multiple(),
        wc,
        buy: buy_case.buy,
        fv,
        sell,
        global_min: buy_case.global_min,
        buy_fallback_used: buy_case.fallback_used,
    };

    tracing::info!(
        symbol = series.symbol(),
        multiple = %series.multiple(),
        wc, buy = scenarios.buy, fv, sell,
        "scenario multiples extracted"
    );
    if !scenarios.is_ordered() {
        tracing::warn!(
            symbol = series.symbol(),
            multiple = %series.multiple(),
            "scenario multiples are not ordered WC <= BUY <= FV <= SELL"
        );
    }

    Ok(scenarios)
}

pub fn calculate_buy_case(series: &MultipleSeries) -> Result<BuyCase, ValuationError> {
    let symbol = series.symbol();
    let min = series.global_min().ok_or_else(|| {
        ValuationError::insufficient(symbol, Stage::ScenarioExtraction, "no valid observations")
    })?;
    let global_min = GlobalMin {
        date: min.date,
        value: min.value,
    };

    let before_min = series.yearly_minima(Some(min.year()));
    if let Some(buy) = median_of_extremes(&before_min, Extreme::Lowest) {
        return Ok(BuyCase {
            global_min,
            buy: round2(buy),
            fallback_used: false,
        });
    }

    tracing::warn!(
        symbol,
        years_before_min = before_min.len(),
        min_year = min.year(),
        "too few years before global minimum, using whole series for buy case"
    );
    let all_years = series.yearly_minima(None);
    let buy = median_of_extremes(&all_years, Extreme::Lowest)
        .ok_or_else(|| not_enough_years(symbol, all_years.len()))?;

    Ok(BuyCase {
        global_min,
        buy: round2(buy),
        fallback_used: true,
    })
}

pub fn calculate_worst_case(symbol: &str, buy: f64) -> Result<f64, ValuationError> {
    if !buy.is_finite() {
        return Err(ValuationError::invalid_metric(
            symbol,
            "buy multiple",
            buy,
            MetricIssue::NonFinite,
        ));
    }
    if buy <= 0.0 {
        return Err(ValuationError::invalid_metric(
            symbol,
            "buy multiple",
            buy,
            MetricIssue::NotPositive,
        ));
    }
    Ok(round2(buy / WORST_CASE_DIVISOR))
}

pub fn calculate_sell_case(series: &MultipleSeries) -> Result<f64, ValuationError> {
    let maxima = series.yearly_maxima();
    median_of_extremes(&maxima, Extreme::Highest)
        .map(round2)
        .ok_or_else(|| not_enough_years(series.symbol(), maxima.len()))
}

pub fn calculate_fair_value(buy: f64, sell: f64) -> f64 {
    round2((buy + sell) / 2.0)
}

#[derive(Clone, Copy)]
enum Extreme {
    Lowest,
    Highest,
}

/// Median of the `SCENARIO_YEARS` most extreme yearly values, one per year.
fn median_of_extremes(per_year: &BTreeMap<i32, f64>, extreme: Extreme) -> Option<f64> {
    if per_year.len() < SCENARIO_YEARS {
        return None;
    }
    let mut values: Vec<f64> = per_year.values().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    if let Extreme::Highest = extreme {
        values.reverse();
    }
    values.truncate(SCENARIO_YEARS);
    Some(median(&mut values))
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn not_enough_years(symbol: &str, years: usize) -> ValuationError {
    ValuationError::insufficient(
        symbol,
        Stage::ScenarioExtraction,
        format!(
            "not enough distinct years for {} values (have {})",
            SCENARIO_YEARS, years
        ),
    )
}
