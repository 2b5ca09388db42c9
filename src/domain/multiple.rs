//! Supported valuation multiples and their families.
//!
//! Price multiples already encode per-share economics; enterprise-value
//! multiples price the whole firm and need the EV bridge before a share
//! count can be applied. The family of a multiple is fixed here so that an
//! unsupported multiple is a parse failure, not a runtime fallthrough.

use crate::domain::error::ValuationError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Multiple {
    PriceBook,
    PriceSales,
    PriceEbit,
    PriceNetCurrentAssets,
    PriceOperatingCashflow,
    PriceFreeCashflow,
    PriceTangibleBookValue,
    EvSales,
    EvEbit,
    EvEbitda,
}

/// Per-share fundamental a price multiple divides the share price by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PerShareMetric {
    BookValue,
    Revenue,
    Ebit,
    NetCurrentAssets,
    OperatingCashflow,
    FreeCashflow,
    TangibleBookValue,
}

/// Company-level base an EV multiple divides enterprise value by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvBase {
    Revenue,
    Ebit,
    Ebitda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipleFamily {
    Price(PerShareMetric),
    Enterprise(EvBase),
}

impl Multiple {
    pub const ALL: [Multiple; 10] = [
        Multiple::PriceBook,
        Multiple::PriceSales,
        Multiple::PriceEbit,
        Multiple::PriceNetCurrentAssets,
        Multiple::PriceOperatingCashflow,
        Multiple::PriceFreeCashflow,
        Multiple::PriceTangibleBookValue,
        Multiple::EvSales,
        Multiple::EvEbit,
        Multiple::EvEbitda,
    ];

    pub fn family(self) -> MultipleFamily {
        match self {
            Multiple::PriceBook => MultipleFamily::Price(PerShareMetric::BookValue),
            Multiple::PriceSales => MultipleFamily::Price(PerShareMetric::Revenue),
            Multiple::PriceEbit => MultipleFamily::Price(PerShareMetric::Ebit),
            Multiple::PriceNetCurrentAssets => {
                MultipleFamily::Price(PerShareMetric::NetCurrentAssets)
            }
            Multiple::PriceOperatingCashflow => {
                MultipleFamily::Price(PerShareMetric::OperatingCashflow)
            }
            Multiple::PriceFreeCashflow => MultipleFamily::Price(PerShareMetric::FreeCashflow),
            Multiple::PriceTangibleBookValue => {
                MultipleFamily::Price(PerShareMetric::TangibleBookValue)
            }
            Multiple::EvSales => MultipleFamily::Enterprise(EvBase::Revenue),
            Multiple::EvEbit => MultipleFamily::Enterprise(EvBase::Ebit),
            Multiple::EvEbitda => MultipleFamily::Enterprise(EvBase::Ebitda),
        }
    }

    /// Column name used by data providers and configuration files.
    pub fn column_name(self) -> &'static str {
        match self {
            Multiple::PriceBook => "Price_Book",
            Multiple::PriceSales => "Price_Sales",
            Multiple::PriceEbit => "Price_EBIT",
            Multiple::PriceNetCurrentAssets => "Price_NetCurrentAssets",
            Multiple::PriceOperatingCashflow => "Price_OperatingCashflow",
            Multiple::PriceFreeCashflow => "Price_FreeCashflow",
            Multiple::PriceTangibleBookValue => "Price_TangibleBookValue",
            Multiple::EvSales => "EV_Sales",
            Multiple::EvEbit => "EV_EBIT",
            Multiple::EvEbitda => "EV_EBITDA",
        }
    }
}

impl fmt::Display for Multiple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Multiple {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Multiple::ALL
            .iter()
            .copied()
            .find(|m| m.column_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValuationError::UnsupportedMultiple {
                name: trimmed.to_string(),
            })
    }
}

impl fmt::Display for PerShareMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerShareMetric::BookValue => "book value per share",
            PerShareMetric::Revenue => "revenue per share",
            PerShareMetric::Ebit => "EBIT per share",
            PerShareMetric::NetCurrentAssets => "net current assets per share",
            PerShareMetric::OperatingCashflow => "operating cashflow per share",
            PerShareMetric::FreeCashflow => "free cashflow per share",
            PerShareMetric::TangibleBookValue => "tangible book value per share",
        };
        f.write_str(name)
    }
}

impl fmt::Display for EvBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvBase::Revenue => "revenue",
            EvBase::Ebit => "EBIT",
            EvBase::Ebitda => "EBITDA",
        };
        f.write_str(name)
    }
}
