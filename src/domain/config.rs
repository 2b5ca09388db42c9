//! Engine configuration and its validation.
//!
//! Every value has a default, so an empty config yields
//! [`EngineConfig::default`]. Present values are parsed strictly: a value that
//! is not a number is rejected rather than replaced by the default.

use crate::domain::bandwidth::{
    Band, BandwidthFamily, BandwidthRules, DEFAULT_MIN_HISTORY_YEARS, TargetMultiples,
};
use crate::domain::error::ValuationError;
use crate::domain::percentile::DEFAULT_DECIMALS;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const DEFAULT_CRV_POSITIVE_THRESHOLD: f64 = 3.0;
const MAX_DECIMALS: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub percentile_decimals: u32,
    /// Conservative CRV at or above which a result counts as positive.
    pub crv_positive_threshold: f64,
    pub min_history_years: f64,
    pub tangible_book: BandwidthRules,
    pub ebit: BandwidthRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            percentile_decimals: DEFAULT_DECIMALS,
            crv_positive_threshold: DEFAULT_CRV_POSITIVE_THRESHOLD,
            min_history_years: DEFAULT_MIN_HISTORY_YEARS,
            tangible_book: BandwidthRules::TANGIBLE_BOOK,
            ebit: BandwidthRules::EBIT,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ValuationError> {
        let defaults = Self::default();

        let decimals = parse_value(
            config,
            "percentile",
            "decimals",
            i64::from(defaults.percentile_decimals),
        )?;
        if !(0..=i64::from(MAX_DECIMALS)).contains(&decimals) {
            return Err(invalid(
                "percentile",
                "decimals",
                format!("decimals must be between 0 and {}", MAX_DECIMALS),
            ));
        }

        let crv_positive_threshold =
            parse_value(config, "crv", "positive_threshold", defaults.crv_positive_threshold)?;
        if !crv_positive_threshold.is_finite() || crv_positive_threshold <= 0.0 {
            return Err(invalid(
                "crv",
                "positive_threshold",
                "positive_threshold must be positive",
            ));
        }

        let min_history_years =
            parse_value(config, "bandwidth", "min_history_years", defaults.min_history_years)?;
        if !min_history_years.is_finite() || min_history_years <= 0.0 {
            return Err(invalid(
                "bandwidth",
                "min_history_years",
                "min_history_years must be positive",
            ));
        }

        let cfg = Self {
            percentile_decimals: decimals as u32,
            crv_positive_threshold,
            min_history_years,
            tangible_book: rules_from_config(config, BandwidthFamily::TangibleBook)?,
            ebit: rules_from_config(config, BandwidthFamily::Ebit)?,
        };
        tracing::debug!(?cfg, "engine config loaded");
        Ok(cfg)
    }

    pub fn rules_for(&self, family: BandwidthFamily) -> &BandwidthRules {
        match family {
            BandwidthFamily::TangibleBook => &self.tangible_book,
            BandwidthFamily::Ebit => &self.ebit,
        }
    }
}

pub fn rules_section(family: BandwidthFamily) -> &'static str {
    match family {
        BandwidthFamily::TangibleBook => "bandwidth.tangible_book",
        BandwidthFamily::Ebit => "bandwidth.ebit",
    }
}

fn rules_from_config(
    config: &dyn ConfigPort,
    family: BandwidthFamily,
) -> Result<BandwidthRules, ValuationError> {
    let section = rules_section(family);
    let d = family.default_rules();
    let get = |key: &str, default: f64| parse_value(config, section, key, default);

    let rules = BandwidthRules {
        buy_zone: Band::new(
            get("buy_zone_min", d.buy_zone.min)?,
            get("buy_zone_max", d.buy_zone.max)?,
        ),
        sell_threshold: get("sell_threshold", d.sell_threshold)?,
        touch_band: Band::new(
            get("touch_min", d.touch_band.min)?,
            get("touch_max", d.touch_band.max)?,
        ),
        targets: TargetMultiples {
            wc: get("target_wc", d.targets.wc)?,
            buy: get("target_buy", d.targets.buy)?,
            sell: get("target_sell", d.targets.sell)?,
        },
    };
    rules
        .validate()
        .map_err(|reason| invalid(section, "rules", reason))?;
    Ok(rules)
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, ValuationError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ValuationError {
    ValuationError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
