//! Immutable company to sector and sector to multiple lookup tables.

use crate::domain::crv::CrvResult;
use crate::domain::error::ValuationError;
use crate::domain::multiple::Multiple;
use crate::ports::config_port::ConfigPort;
use std::collections::{BTreeMap, BTreeSet};

pub const SECTORS_SECTION: &str = "sectors";
pub const SECTOR_MULTIPLES_SECTION: &str = "sector_multiples";

const DEFAULT_SECTOR_MULTIPLES: &[(&str, &[Multiple])] = {
    use Multiple::*;
    &[
        ("Biotech", &[PriceTangibleBookValue, PriceNetCurrentAssets]),
        ("Pharma", &[PriceTangibleBookValue, PriceNetCurrentAssets]),
        ("Genomics", &[PriceTangibleBookValue, PriceNetCurrentAssets]),
        ("Healthcare", &[EvEbit, PriceOperatingCashflow]),
        ("Tech", &[PriceFreeCashflow, EvEbitda]),
        ("AI", &[EvSales, PriceSales]),
        ("Robotics", &[EvSales, PriceSales]),
        ("Chips", &[EvEbitda, EvEbit]),
        ("Semiconductors", &[EvEbitda, EvEbit]),
        ("EV", &[EvSales, EvEbitda]),
        ("Energy", &[EvSales, EvEbitda]),
        ("FinTech", &[PriceFreeCashflow, EvEbitda]),
        ("Digital Payments", &[PriceFreeCashflow, EvEbitda]),
        ("E-Commerce", &[EvSales, PriceFreeCashflow]),
        ("Digital Media", &[EvSales, PriceFreeCashflow]),
        ("Logistics", &[EvEbitda, PriceTangibleBookValue]),
        ("Telecommunications", &[EvEbitda, PriceFreeCashflow]),
        ("Sporting Goods", &[PriceEbit, PriceFreeCashflow]),
        ("Game Publisher", &[PriceFreeCashflow, EvEbit]),
        ("Film", &[EvEbitda, PriceFreeCashflow]),
        ("Streaming", &[EvEbitda, PriceFreeCashflow]),
        ("Tobacco", &[PriceFreeCashflow, EvEbitda, PriceOperatingCashflow]),
    ]
};

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorTable {
    companies: BTreeMap<String, Vec<String>>,
    sector_multiples: BTreeMap<String, Vec<Multiple>>,
}

impl SectorTable {
    /// Empty company map with the built-in sector multiples.
    pub fn with_default_multiples() -> Self {
        let sector_multiples = DEFAULT_SECTOR_MULTIPLES
            .iter()
            .map(|(sector, multiples)| (sector.to_string(), multiples.to_vec()))
            .collect();
        Self {
            companies: BTreeMap::new(),
            sector_multiples,
        }
    }

    pub fn with_company<S: Into<String>>(
        mut self,
        symbol: impl Into<String>,
        sectors: impl IntoIterator<Item = S>,
    ) -> Self {
        self.companies
            .insert(symbol.into(), sectors.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sector(
        mut self,
        sector: impl Into<String>,
        multiples: impl IntoIterator<Item = Multiple>,
    ) -> Self {
        self.sector_multiples
            .insert(sector.into(), multiples.into_iter().collect());
        self
    }

    /// Built-in sector multiples overridden by `[sector_multiples]`, plus the
    /// company sectors listed under `[sectors]`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ValuationError> {
        let mut table = Self::with_default_multiples();

        for sector in config.keys(SECTOR_MULTIPLES_SECTION) {
            let raw = config
                .get_string(SECTOR_MULTIPLES_SECTION, &sector)
                .unwrap_or_default();
            let multiples = split_list(&raw)
                .map(|name| name.parse::<Multiple>())
                .collect::<Result<Vec<_>, _>>()?;
            table.sector_multiples.insert(sector, multiples);
        }

        for symbol in config.keys(SECTORS_SECTION) {
            let raw = config
                .get_string(SECTORS_SECTION, &symbol)
                .unwrap_or_default();
            let sectors: Vec<String> = split_list(&raw).map(str::to_string).collect();
            if sectors.is_empty() {
                return Err(ValuationError::ConfigInvalid {
                    section: SECTORS_SECTION.to_string(),
                    key: symbol,
                    reason: "no sectors listed".to_string(),
                });
            }
            table.companies.insert(symbol, sectors);
        }

        tracing::debug!(
            companies = table.companies.len(),
            sectors = table.sector_multiples.len(),
            "sector table loaded"
        );
        Ok(table)
    }

    pub fn sectors_for(&self, symbol: &str) -> Option<&[String]> {
        self.companies.get(symbol).map(Vec::as_slice)
    }

    pub fn multiples_for_sector(&self, sector: &str) -> Option<&[Multiple]> {
        self.sector_multiples.get(sector).map(Vec::as_slice)
    }

    /// Sectors of `symbol` and the union of their relevant multiples.
    pub fn relevant_multiples(
        &self,
        symbol: &str,
    ) -> Result<(Vec<String>, BTreeSet<Multiple>), ValuationError> {
        let sectors = self
            .sectors_for(symbol)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValuationError::NoSectorMapping {
                symbol: symbol.to_string(),
            })?;

        let multiples: BTreeSet<Multiple> = sectors
            .iter()
            .filter_map(|s| self.multiples_for_sector(s))
            .flatten()
            .copied()
            .collect();

        if multiples.is_empty() {
            return Err(ValuationError::NoSectorMultiples {
                symbol: symbol.to_string(),
                sectors: sectors.to_vec(),
            });
        }
        Ok((sectors.to_vec(), multiples))
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorCrvEntry {
    pub crv: CrvResult,
    pub crv_positive: bool,
}

/// CRV per sector-relevant multiple. A failed multiple keeps its error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorCrvReport {
    pub symbol: String,
    pub sectors: Vec<String>,
    pub multiples_used: Vec<Multiple>,
    pub results: BTreeMap<Multiple, Result<SectorCrvEntry, ValuationError>>,
}

impl SectorCrvReport {
    pub fn positive(&self) -> impl Iterator<Item = (&Multiple, &SectorCrvEntry)> {
        self.results.iter().filter_map(|(m, r)| match r {
            Ok(entry) if entry.crv_positive => Some((m, entry)),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Multiple, &ValuationError)> {
        self.results
            .iter()
            .filter_map(|(m, r)| r.as_ref().err().map(|e| (m, e)))
    }
}
