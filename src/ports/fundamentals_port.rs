//! Current fundamentals provider port.
//!
//! All values refer to the latest reported quarter. Failures are returned
//! as [`ValuationError::UpstreamUnavailable`] and passed through unchanged.

use crate::domain::error::ValuationError;
use crate::domain::multiple::{EvBase, PerShareMetric};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BalanceSheetItem {
    NetDebt,
    MinorityInterest,
    PreferredStock,
    SharesOutstanding,
}

impl fmt::Display for BalanceSheetItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BalanceSheetItem::NetDebt => "net debt",
            BalanceSheetItem::MinorityInterest => "minority interest",
            BalanceSheetItem::PreferredStock => "preferred stock",
            BalanceSheetItem::SharesOutstanding => "shares outstanding",
        };
        f.write_str(name)
    }
}

pub trait FundamentalsPort {
    fn current_per_share_metric(
        &self,
        symbol: &str,
        metric: PerShareMetric,
    ) -> Result<f64, ValuationError>;

    /// Company-level revenue, EBIT or EBITDA.
    fn current_ev_base(&self, symbol: &str, base: EvBase) -> Result<f64, ValuationError>;

    fn balance_sheet_item(
        &self,
        symbol: &str,
        item: BalanceSheetItem,
    ) -> Result<f64, ValuationError>;

    fn current_price(&self, symbol: &str) -> Result<f64, ValuationError>;
}
