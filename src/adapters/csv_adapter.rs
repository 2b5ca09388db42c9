//! CSV file data adapter.
//!
//! Reads pre-materialised files from one directory:
//! `{SYMBOL}_{Multiple}.csv` with a `date,value` header plus optional
//! `price`, `fundamental` and `shares` columns, and
//! `{SYMBOL}_fundamentals.csv` with `item,value` rows for the latest quarter.

use crate::domain::error::ValuationError;
use crate::domain::multiple::{EvBase, Multiple, PerShareMetric};
use crate::domain::series::{MultipleSeries, Observation};
use crate::ports::fundamentals_port::{BalanceSheetItem, FundamentalsPort};
use crate::ports::series_port::MultipleSeriesPort;
use chrono::{DateTime, NaiveDate};
use std::fs;
use std::path::PathBuf;

const FUNDAMENTALS_SOURCE: &str = "fundamentals";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, symbol: &str, multiple: Multiple) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, multiple.column_name()))
    }

    fn fundamentals_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}_fundamentals.csv", symbol))
    }

    fn fundamental(&self, symbol: &str, item: &str) -> Result<f64, ValuationError> {
        let path = self.fundamentals_path(symbol);
        let fail = |reason: String| ValuationError::upstream(symbol, FUNDAMENTALS_SOURCE, reason);

        let content = fs::read_to_string(&path)
            .map_err(|e| fail(format!("failed to read {}: {}", path.display(), e)))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        for result in rdr.records() {
            let record = result.map_err(|e| fail(format!("CSV parse error: {}", e)))?;
            if record.get(0).map(str::trim) != Some(item) {
                continue;
            }
            let raw = record
                .get(1)
                .ok_or_else(|| fail(format!("missing value for {}", item)))?;
            return raw
                .trim()
                .parse()
                .map_err(|e| fail(format!("invalid value for {}: {}", item, e)));
        }
        Err(fail(format!("{} not found in {}", item, path.display())))
    }
}

impl MultipleSeriesPort for CsvAdapter {
    fn get_multiple_series(
        &self,
        symbol: &str,
        multiple: Multiple,
    ) -> Result<MultipleSeries, ValuationError> {
        let path = self.series_path(symbol, multiple);
        let source = format!("{} series", multiple);
        let fail = |reason: String| ValuationError::upstream(symbol, source.as_str(), reason);

        let content = fs::read_to_string(&path)
            .map_err(|e| fail(format!("failed to read {}: {}", path.display(), e)))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| fail(format!("CSV header error: {}", e)))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let date_col = column("date").ok_or_else(|| fail("missing date column".into()))?;
        let value_col = column("value").ok_or_else(|| fail("missing value column".into()))?;
        let price_col = column("price");
        let fundamental_col = column("fundamental");
        let shares_col = column("shares");

        let mut observations = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| fail(format!("CSV parse error: {}", e)))?;
            let row = line + 2;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| fail(format!("row {}: missing date", row)))?;
            let date = parse_date(date_str)
                .ok_or_else(|| fail(format!("row {}: invalid date '{}'", row, date_str)))?;

            let value = match record.get(value_col).map(str::trim) {
                None | Some("") => f64::NAN,
                Some(raw) => raw
                    .parse::<f64>()
                    .map_err(|e| fail(format!("row {}: invalid value: {}", row, e)))?,
            };
            let optional = |col: Option<usize>, name: &str| -> Result<Option<f64>, ValuationError> {
                match col.and_then(|c| record.get(c)).map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(raw) => raw
                        .parse()
                        .map(Some)
                        .map_err(|e| fail(format!("row {}: invalid {}: {}", row, name, e))),
                }
            };

            observations.push(Observation {
                date,
                value,
                price: optional(price_col, "price")?,
                fundamental: optional(fundamental_col, "fundamental")?,
                shares_outstanding: optional(shares_col, "shares")?,
            });
        }

        if observations.is_empty() {
            return Err(fail(format!("{} has no rows", path.display())));
        }
        tracing::debug!(symbol, %multiple, rows = observations.len(), "series loaded");
        MultipleSeries::new(symbol, multiple, observations)
    }
}

impl FundamentalsPort for CsvAdapter {
    fn current_per_share_metric(
        &self,
        symbol: &str,
        metric: PerShareMetric,
    ) -> Result<f64, ValuationError> {
        self.fundamental(symbol, metric_item(metric))
    }

    fn current_ev_base(&self, symbol: &str, base: EvBase) -> Result<f64, ValuationError> {
        let item = match base {
            EvBase::Revenue => "revenue",
            EvBase::Ebit => "ebit",
            EvBase::Ebitda => "ebitda",
        };
        self.fundamental(symbol, item)
    }

    fn balance_sheet_item(
        &self,
        symbol: &str,
        item: BalanceSheetItem,
    ) -> Result<f64, ValuationError> {
        let key = match item {
            BalanceSheetItem::NetDebt => "net_debt",
            BalanceSheetItem::MinorityInterest => "minority_interest",
            BalanceSheetItem::PreferredStock => "preferred_stock",
            BalanceSheetItem::SharesOutstanding => "shares_outstanding",
        };
        self.fundamental(symbol, key)
    }

    fn current_price(&self, symbol: &str) -> Result<f64, ValuationError> {
        self.fundamental(symbol, "price")
    }
}

fn metric_item(metric: PerShareMetric) -> &'static str {
    match metric {
        PerShareMetric::BookValue => "book_value_per_share",
        PerShareMetric::Revenue => "revenue_per_share",
        PerShareMetric::Ebit => "ebit_per_share",
        PerShareMetric::NetCurrentAssets => "net_current_assets_per_share",
        PerShareMetric::OperatingCashflow => "operating_cashflow_per_share",
        PerShareMetric::FreeCashflow => "free_cashflow_per_share",
        PerShareMetric::TangibleBookValue => "tangible_book_value_per_share",
    }
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its local date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.naive_local().date())
    })
}
