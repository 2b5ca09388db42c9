//! Valuation engine: the operations exposed to the screening layer.
//!
//! The engine holds the fundamentals provider, validated configuration and
//! the sector table. It keeps no state between calls.

use crate::domain::bandwidth::{self, BandwidthFamily, ZoneEvaluation};
use crate::domain::config::EngineConfig;
use crate::domain::crv::{self, CrvResult};
use crate::domain::error::{MetricIssue, ValuationError};
use crate::domain::multiple::Multiple;
use crate::domain::percentile::{self, BucketTable};
use crate::domain::scenario::{self, ScenarioSet};
use crate::domain::sector::{SectorCrvEntry, SectorCrvReport, SectorTable};
use crate::domain::series::MultipleSeries;
use crate::domain::targets::{self, PriceTargetSet};
use crate::ports::config_port::ConfigPort;
use crate::ports::fundamentals_port::FundamentalsPort;
use crate::ports::series_port::MultipleSeriesPort;
use std::collections::BTreeMap;

pub struct ValuationEngine<'a> {
    fundamentals: &'a dyn FundamentalsPort,
    config: EngineConfig,
    sectors: SectorTable,
}

impl<'a> ValuationEngine<'a> {
    /// Engine with default configuration and the built-in sector multiples.
    pub fn new(fundamentals: &'a dyn FundamentalsPort) -> Self {
        Self {
            fundamentals,
            config: EngineConfig::default(),
            sectors: SectorTable::with_default_multiples(),
        }
    }

    pub fn from_config(
        fundamentals: &'a dyn FundamentalsPort,
        config: &dyn ConfigPort,
    ) -> Result<Self, ValuationError> {
        Ok(Self {
            fundamentals,
            config: EngineConfig::from_config(config)?,
            sectors: SectorTable::from_config(config)?,
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sectors(mut self, sectors: SectorTable) -> Self {
        self.sectors = sectors;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sectors(&self) -> &SectorTable {
        &self.sectors
    }

    pub fn extract_scenarios(
        &self,
        series: &MultipleSeries,
    ) -> Result<ScenarioSet, ValuationError> {
        scenario::extract_scenarios(series)
    }

    /// The multiple family is taken from `scenarios.multiple`.
    pub fn project_price_targets(
        &self,
        scenarios: &ScenarioSet,
        symbol: &str,
    ) -> Result<PriceTargetSet, ValuationError> {
        targets::project_price_targets(self.fundamentals, scenarios, symbol)
    }

    /// Scenarios, price targets and both ratios against the current price.
    pub fn compute_crv(
        &self,
        symbol: &str,
        series: &MultipleSeries,
    ) -> Result<CrvResult, ValuationError> {
        let scenarios = self.extract_scenarios(series)?;
        let targets = self.project_price_targets(&scenarios, symbol)?;
        let price = self.current_price(symbol)?;

        crv::crv_from_targets(symbol, price, &targets)
    }

    pub fn evaluate_bandwidth_zone(
        &self,
        symbol: &str,
        series: &MultipleSeries,
        family: BandwidthFamily,
    ) -> Result<ZoneEvaluation, ValuationError> {
        let price = self.current_price(symbol)?;
        let metric = self
            .fundamentals
            .current_per_share_metric(symbol, family.metric())?;
        bandwidth::evaluate_zone(
            series,
            family,
            self.config.rules_for(family),
            self.config.min_history_years,
            price,
            metric,
        )
    }

    pub fn compute_percentiles_and_probability(
        &self,
        series: &MultipleSeries,
    ) -> Result<BucketTable, ValuationError> {
        percentile::compute_percentiles_and_probability(series, self.config.percentile_decimals)
    }

    /// CRV for every multiple relevant to the sectors of `symbol`.
    ///
    /// Fails only when the symbol has no sectors or its sectors have no
    /// multiples. Every other failure is kept per multiple in the report.
    pub fn crv_by_sector_multiples(
        &self,
        symbol: &str,
        series_port: &dyn MultipleSeriesPort,
    ) -> Result<SectorCrvReport, ValuationError> {
        let (sectors, multiples) = self.sectors.relevant_multiples(symbol)?;
        tracing::info!(symbol, ?sectors, ?multiples, "sector multiples resolved");

        let threshold = self.config.crv_positive_threshold;
        let mut results: BTreeMap<Multiple, Result<SectorCrvEntry, ValuationError>> =
            BTreeMap::new();
        for &multiple in &multiples {
            let outcome = series_port
                .get_multiple_series(symbol, multiple)
                .and_then(|series| self.compute_crv(symbol, &series))
                .map(|crv| SectorCrvEntry {
                    crv_positive: crv.is_positive(threshold),
                    crv,
                });
            if let Err(e) = &outcome {
                tracing::warn!(symbol, %multiple, error = %e, "crv failed for multiple");
            }
            results.insert(multiple, outcome);
        }

        Ok(SectorCrvReport {
            symbol: symbol.to_string(),
            sectors,
            multiples_used: multiples.into_iter().collect(),
            results,
        })
    }

    fn current_price(&self, symbol: &str) -> Result<f64, ValuationError> {
        let price = self.fundamentals.current_price(symbol)?;
        if !price.is_finite() {
            return Err(ValuationError::invalid_metric(
                symbol,
                "current price",
                price,
                MetricIssue::NonFinite,
            ));
        }
        if price <= 0.0 {
            return Err(ValuationError::invalid_metric(
                symbol,
                "current price",
                price,
                MetricIssue::NotPositive,
            ));
        }
        Ok(price)
    }
}
