//! Historical time series of a single valuation multiple.

use crate::domain::error::ValuationError;
use crate::domain::multiple::Multiple;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use std::collections::BTreeMap;

const DAYS_PER_YEAR: f64 = 365.25;

/// One dated multiple value plus the raw inputs it was computed from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
    pub price: Option<f64>,
    pub fundamental: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value,
            price: None,
            fundamental: None,
            shares_outstanding: None,
        }
    }

    /// Reduce a zoned timestamp to its local calendar date.
    pub fn from_timestamp<Tz: TimeZone>(timestamp: &DateTime<Tz>, value: f64) -> Self {
        Self::new(timestamp.naive_local().date(), value)
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_fundamental(mut self, fundamental: f64) -> Self {
        self.fundamental = Some(fundamental);
        self
    }

    pub fn with_shares(mut self, shares: f64) -> Self {
        self.shares_outstanding = Some(shares);
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// Immutable, date-sorted series of one multiple for one symbol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultipleSeries {
    symbol: String,
    multiple: Multiple,
    observations: Vec<Observation>,
}

impl MultipleSeries {
    pub fn new(
        symbol: impl Into<String>,
        multiple: Multiple,
        mut observations: Vec<Observation>,
    ) -> Result<Self, ValuationError> {
        let symbol = symbol.into();
        observations.sort_by_key(|o| o.date);
        if let Some(dup) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ValuationError::InvalidSeries {
                symbol,
                reason: format!("duplicate date {}", dup[0].date),
            });
        }
        Ok(Self {
            symbol,
            multiple,
            observations,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn multiple(&self) -> Multiple {
        self.multiple
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations with a finite multiple value.
    pub fn valid(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.is_valid())
    }

    /// Finite, non-negative observations. Negative multiples come from
    /// negative fundamentals and carry no zone information.
    pub fn non_negative(&self) -> impl Iterator<Item = &Observation> {
        self.valid().filter(|o| o.value >= 0.0)
    }

    pub fn valid_values(&self) -> Vec<f64> {
        self.valid().map(|o| o.value).collect()
    }

    /// Calendar span between first and last observation in years.
    pub fn span_years(&self) -> f64 {
        match (self.observations.first(), self.observations.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR,
            _ => 0.0,
        }
    }

    /// Lowest valid observation; the earliest one wins ties.
    pub fn global_min(&self) -> Option<&Observation> {
        self.valid()
            .fold(None, |best: Option<&Observation>, o| match best {
                Some(b) if b.value <= o.value => Some(b),
                _ => Some(o),
            })
    }

    /// Minimum valid value per calendar year, optionally restricted to years
    /// strictly before `before_year`.
    pub fn yearly_minima(&self, before_year: Option<i32>) -> BTreeMap<i32, f64> {
        let mut minima: BTreeMap<i32, f64> = BTreeMap::new();
        for o in self.valid() {
            if before_year.is_some_and(|limit| o.year() >= limit) {
                continue;
            }
            minima
                .entry(o.year())
                .and_modify(|m| *m = m.min(o.value))
                .or_insert(o.value);
        }
        minima
    }

    pub fn yearly_maxima(&self) -> BTreeMap<i32, f64> {
        let mut maxima: BTreeMap<i32, f64> = BTreeMap::new();
        for o in self.valid() {
            maxima
                .entry(o.year())
                .and_modify(|m| *m = m.max(o.value))
                .or_insert(o.value);
        }
        maxima
    }
}
