#![allow(dead_code)]

use chrono::NaiveDate;
use multicrv::domain::error::ValuationError;
use multicrv::domain::multiple::{EvBase, Multiple, PerShareMetric};
use multicrv::domain::series::{MultipleSeries, Observation};
use multicrv::ports::fundamentals_port::{BalanceSheetItem, FundamentalsPort};
use multicrv::ports::series_port::MultipleSeriesPort;
use std::collections::HashMap;

/// In-memory fundamentals for one or more symbols. Anything not set is
/// reported as upstream unavailable.
pub struct MockFundamentalsPort {
    pub prices: HashMap<String, f64>,
    pub metrics: HashMap<(String, PerShareMetric), f64>,
    pub ev_bases: HashMap<(String, EvBase), f64>,
    pub items: HashMap<(String, BalanceSheetItem), f64>,
    pub errors: HashMap<String, String>,
}

impl MockFundamentalsPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            metrics: HashMap::new(),
            ev_bases: HashMap::new(),
            items: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_metric(mut self, symbol: &str, metric: PerShareMetric, value: f64) -> Self {
        self.metrics.insert((symbol.to_string(), metric), value);
        self
    }

    pub fn with_ev_base(mut self, symbol: &str, base: EvBase, value: f64) -> Self {
        self.ev_bases.insert((symbol.to_string(), base), value);
        self
    }

    pub fn with_item(mut self, symbol: &str, item: BalanceSheetItem, value: f64) -> Self {
        self.items.insert((symbol.to_string(), item), value);
        self
    }

    /// Net debt, minority interest, preferred stock and shares in one go.
    pub fn with_bridge(
        self,
        symbol: &str,
        net_debt: f64,
        minority: f64,
        preferred: f64,
        shares: f64,
    ) -> Self {
        self.with_item(symbol, BalanceSheetItem::NetDebt, net_debt)
            .with_item(symbol, BalanceSheetItem::MinorityInterest, minority)
            .with_item(symbol, BalanceSheetItem::PreferredStock, preferred)
            .with_item(symbol, BalanceSheetItem::SharesOutstanding, shares)
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn lookup<K: std::hash::Hash + Eq>(
        &self,
        symbol: &str,
        map: &HashMap<K, f64>,
        key: K,
        source: &str,
    ) -> Result<f64, ValuationError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ValuationError::upstream(symbol, source, reason.clone()));
        }
        map.get(&key)
            .copied()
            .ok_or_else(|| ValuationError::upstream(symbol, source, "not set"))
    }
}

impl FundamentalsPort for MockFundamentalsPort {
    fn current_per_share_metric(
        &self,
        symbol: &str,
        metric: PerShareMetric,
    ) -> Result<f64, ValuationError> {
        self.lookup(symbol, &self.metrics, (symbol.to_string(), metric), "per-share metric")
    }

    fn current_ev_base(&self, symbol: &str, base: EvBase) -> Result<f64, ValuationError> {
        self.lookup(symbol, &self.ev_bases, (symbol.to_string(), base), "ev base")
    }

    fn balance_sheet_item(
        &self,
        symbol: &str,
        item: BalanceSheetItem,
    ) -> Result<f64, ValuationError> {
        self.lookup(symbol, &self.items, (symbol.to_string(), item), "balance sheet")
    }

    fn current_price(&self, symbol: &str) -> Result<f64, ValuationError> {
        self.lookup(symbol, &self.prices, symbol.to_string(), "current price")
    }
}

pub struct MockSeriesPort {
    pub series: HashMap<(String, Multiple), MultipleSeries>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: MultipleSeries) -> Self {
        self.series
            .insert((series.symbol().to_string(), series.multiple()), series);
        self
    }
}

impl MultipleSeriesPort for MockSeriesPort {
    fn get_multiple_series(
        &self,
        symbol: &str,
        multiple: Multiple,
    ) -> Result<MultipleSeries, ValuationError> {
        self.series
            .get(&(symbol.to_string(), multiple))
            .cloned()
            .ok_or_else(|| ValuationError::upstream(symbol, "series", "no data"))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One quarterly observation per (year, value) pair, on 31 March.
pub fn yearly_series(symbol: &str, multiple: Multiple, points: &[(i32, f64)]) -> MultipleSeries {
    let obs = points
        .iter()
        .map(|&(y, v)| Observation::new(date(y, 3, 31), v))
        .collect();
    MultipleSeries::new(symbol, multiple, obs).unwrap()
}

/// The EV/EBITDA history with yearly minima 2018:4, 2019:5, 2020:3,
/// 2021:9, 2022:12 and a second, higher point per year.
pub fn ev_ebitda_history(symbol: &str) -> MultipleSeries {
    let obs = [
        (2018, 4.0, 6.0),
        (2019, 5.0, 7.0),
        (2020, 3.0, 8.0),
        (2021, 9.0, 10.0),
        (2022, 12.0, 14.0),
    ]
    .iter()
    .flat_map(|&(y, low, high)| {
        [
            Observation::new(date(y, 3, 31), low),
            Observation::new(date(y, 9, 30), high),
        ]
    })
    .collect();
    MultipleSeries::new(symbol, Multiple::EvEbitda, obs).unwrap()
}

/// Quarterly series over `years` years starting 2010, cycling `values`.
pub fn quarterly_series(
    symbol: &str,
    multiple: Multiple,
    years: i32,
    values: &[f64],
) -> MultipleSeries {
    let mut obs = Vec::new();
    let mut i = 0;
    for y in 2010..2010 + years {
        for m in [3, 6, 9, 12] {
            obs.push(Observation::new(date(y, m, 28), values[i % values.len()]));
            i += 1;
        }
    }
    MultipleSeries::new(symbol, multiple, obs).unwrap()
}
