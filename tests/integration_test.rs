//! Integration tests for the valuation engine.
//!
//! Tests cover:
//! - Full CRV pipeline for price multiples and EV multiples with mock ports
//! - Error propagation from the fundamentals provider
//! - Sector-driven CRV report with per-multiple failures
//! - Bandwidth zone signals through the engine
//! - Percentile buckets and live-value lookup
//! - File-backed pipeline through CsvAdapter and FileConfigAdapter

mod common;

use approx::assert_relative_eq;
use common::*;
use multicrv::adapters::csv_adapter::CsvAdapter;
use multicrv::adapters::file_config_adapter::FileConfigAdapter;
use multicrv::domain::bandwidth::{BandwidthFamily, Signal};
use multicrv::domain::engine::ValuationEngine;
use multicrv::domain::error::{MetricIssue, Stage, ValuationError};
use multicrv::domain::multiple::{EvBase, Multiple, PerShareMetric};
use multicrv::domain::percentile::BUCKET_COUNT;
use multicrv::domain::sector::SectorTable;
use multicrv::domain::targets::TargetBasis;

/// Pre-minimum years 2015..2017, global minimum 2018.
/// BUY 12, WC 10, SELL 20, FV 16.
fn fcf_history(symbol: &str) -> multicrv::domain::series::MultipleSeries {
    yearly_series(
        symbol,
        Multiple::PriceFreeCashflow,
        &[
            (2015, 10.0),
            (2016, 12.0),
            (2017, 14.0),
            (2018, 8.0),
            (2019, 20.0),
            (2020, 22.0),
            (2021, 18.0),
        ],
    )
}

mod crv_pipeline {
    use super::*;

    #[test]
    fn price_multiple_pipeline() {
        let port = MockFundamentalsPort::new()
            .with_price("ACME", 26.0)
            .with_metric("ACME", PerShareMetric::FreeCashflow, 2.0);
        let engine = ValuationEngine::new(&port);

        let result = engine.compute_crv("ACME", &fcf_history("ACME")).unwrap();

        assert_eq!(result.multiple, Multiple::PriceFreeCashflow);
        assert!(!result.buy_fallback_used);
        let t = &result.course_targets;
        assert_eq!((t.wc, t.buy, t.fv, t.sell), (20.0, 24.0, 32.0, 40.0));
        assert_eq!(result.inputs.downside, 6.0);
        assert_eq!(result.inputs.upside_conservative, 6.0);
        assert_eq!(result.inputs.upside_aggressive, 14.0);
        assert_eq!(result.crv_conservative, 1.0);
        assert_eq!(result.crv_aggressive, 2.33);
        assert!(!result.is_positive(engine.config().crv_positive_threshold));
    }

    #[test]
    fn ev_multiple_pipeline_uses_bridge() {
        let port = MockFundamentalsPort::new()
            .with_price("EVCO", 25.0)
            .with_ev_base("EVCO", EvBase::Ebitda, 1_000.0)
            .with_bridge("EVCO", 2_000.0, 0.0, 0.0, 100.0);
        let engine = ValuationEngine::new(&port);

        let result = engine.compute_crv("EVCO", &ev_ebitda_history("EVCO")).unwrap();

        assert!(result.buy_fallback_used);
        let t = &result.course_targets;
        assert_relative_eq!(t.wc, 13.3, epsilon = 1e-9);
        assert_relative_eq!(t.buy, 20.0, epsilon = 1e-9);
        assert_relative_eq!(t.fv, 50.0, epsilon = 1e-9);
        assert_relative_eq!(t.sell, 80.0, epsilon = 1e-9);
        match &t.basis {
            TargetBasis::EnterpriseValue(bridge) => {
                assert_eq!(bridge.base, EvBase::Ebitda);
                assert_eq!(bridge.net_debt, 2_000.0);
            }
            other => panic!("unexpected basis: {other:?}"),
        }
        assert_relative_eq!(result.inputs.downside, 11.7, epsilon = 1e-9);
        assert_eq!(result.crv_conservative, 2.14);
        assert_eq!(result.crv_aggressive, 4.7);
    }

    #[test]
    fn price_below_worst_case_caps_downside() {
        let port = MockFundamentalsPort::new()
            .with_price("ACME", 15.0)
            .with_metric("ACME", PerShareMetric::FreeCashflow, 2.0);
        let engine = ValuationEngine::new(&port);

        let result = engine.compute_crv("ACME", &fcf_history("ACME")).unwrap();
        assert_eq!(result.inputs.downside, 15.0);
        // (32 - 15) / 15
        assert_eq!(result.crv_conservative, 1.13);
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let port = MockFundamentalsPort::new()
            .with_price("ACME", 0.0)
            .with_metric("ACME", PerShareMetric::FreeCashflow, 2.0);
        let engine = ValuationEngine::new(&port);

        let err = engine.compute_crv("ACME", &fcf_history("ACME")).unwrap_err();
        assert!(matches!(
            err,
            ValuationError::InvalidMetric {
                issue: MetricIssue::NotPositive,
                ..
            }
        ));
    }

    #[test]
    fn negative_ebitda_fails_explicitly() {
        let port = MockFundamentalsPort::new()
            .with_price("EVCO", 25.0)
            .with_ev_base("EVCO", EvBase::Ebitda, -50.0)
            .with_bridge("EVCO", 0.0, 0.0, 0.0, 100.0);
        let engine = ValuationEngine::new(&port);

        let err = engine
            .compute_crv("EVCO", &ev_ebitda_history("EVCO"))
            .unwrap_err();
        assert!(matches!(
            err,
            ValuationError::InvalidMetric {
                issue: MetricIssue::Negative,
                ..
            }
        ));
        assert!(err.to_string().contains("EBITDA"));
    }

    #[test]
    fn upstream_errors_pass_through_unchanged() {
        let port = MockFundamentalsPort::new().with_error("DOWN", "timeout");
        let engine = ValuationEngine::new(&port);

        let err = engine.compute_crv("DOWN", &fcf_history("DOWN")).unwrap_err();
        match err {
            ValuationError::UpstreamUnavailable { symbol, reason, .. } => {
                assert_eq!(symbol, "DOWN");
                assert_eq!(reason, "timeout");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_few_years_is_insufficient_data() {
        let port = MockFundamentalsPort::new().with_price("NEW", 10.0);
        let engine = ValuationEngine::new(&port);
        let series = yearly_series("NEW", Multiple::PriceSales, &[(2022, 2.0), (2023, 3.0)]);

        let err = engine.compute_crv("NEW", &series).unwrap_err();
        assert!(matches!(
            err,
            ValuationError::InsufficientData {
                stage: Stage::ScenarioExtraction,
                ..
            }
        ));
    }

    #[test]
    fn project_price_targets_from_extracted_scenarios() {
        let port =
            MockFundamentalsPort::new().with_metric("ACME", PerShareMetric::FreeCashflow, 0.5);
        let engine = ValuationEngine::new(&port);

        let scenarios = engine.extract_scenarios(&fcf_history("ACME")).unwrap();
        assert_eq!(
            (scenarios.wc, scenarios.buy, scenarios.fv, scenarios.sell),
            (10.0, 12.0, 16.0, 20.0)
        );
        assert_eq!(scenarios.global_min.date, date(2018, 3, 31));

        let targets = engine.project_price_targets(&scenarios, "ACME").unwrap();
        assert_eq!((targets.wc, targets.buy, targets.fv, targets.sell), (5.0, 6.0, 8.0, 10.0));
    }
}

mod sector_report {
    use super::*;

    fn sectors() -> SectorTable {
        SectorTable::with_default_multiples()
            .with_company("ACME", ["Tech"])
            .with_company("ODD", ["Apparel"])
    }

    #[test]
    fn computes_each_multiple_and_keeps_failures() {
        let port = MockFundamentalsPort::new()
            .with_price("ACME", 22.0)
            .with_metric("ACME", PerShareMetric::FreeCashflow, 2.0);
        let series = MockSeriesPort::new().with_series(fcf_history("ACME"));
        let engine = ValuationEngine::new(&port).with_sectors(sectors());

        let report = engine.crv_by_sector_multiples("ACME", &series).unwrap();

        assert_eq!(report.sectors, vec!["Tech".to_string()]);
        assert_eq!(
            report.multiples_used,
            vec![Multiple::PriceFreeCashflow, Multiple::EvEbitda]
        );

        let fcf = report.results[&Multiple::PriceFreeCashflow].as_ref().unwrap();
        assert_eq!(fcf.crv.crv_conservative, 5.0);
        assert!(fcf.crv_positive);

        assert!(matches!(
            report.results[&Multiple::EvEbitda],
            Err(ValuationError::UpstreamUnavailable { .. })
        ));
        assert_eq!(report.positive().count(), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn threshold_comes_from_config() {
        let port = MockFundamentalsPort::new()
            .with_price("ACME", 22.0)
            .with_metric("ACME", PerShareMetric::FreeCashflow, 2.0);
        let series = MockSeriesPort::new().with_series(fcf_history("ACME"));
        let mut config = multicrv::domain::config::EngineConfig::default();
        config.crv_positive_threshold = 6.0;
        let engine = ValuationEngine::new(&port)
            .with_sectors(sectors())
            .with_config(config);

        let report = engine.crv_by_sector_multiples("ACME", &series).unwrap();
        let fcf = report.results[&Multiple::PriceFreeCashflow].as_ref().unwrap();
        assert!(!fcf.crv_positive);
    }

    #[test]
    fn unknown_symbol_fails_whole_report() {
        let port = MockFundamentalsPort::new();
        let engine = ValuationEngine::new(&port).with_sectors(sectors());
        let err = engine
            .crv_by_sector_multiples("ZZZ", &MockSeriesPort::new())
            .unwrap_err();
        assert!(matches!(err, ValuationError::NoSectorMapping { .. }));
    }

    #[test]
    fn sectors_without_multiples_fail_whole_report() {
        let port = MockFundamentalsPort::new();
        let engine = ValuationEngine::new(&port).with_sectors(sectors());
        let err = engine
            .crv_by_sector_multiples("ODD", &MockSeriesPort::new())
            .unwrap_err();
        assert!(matches!(err, ValuationError::NoSectorMultiples { .. }));
    }
}

mod bandwidth_zone {
    use super::*;

    fn tbv_history() -> multicrv::domain::series::MultipleSeries {
        quarterly_series(
            "BANK",
            Multiple::PriceTangibleBookValue,
            12,
            &[0.8, 1.0, 1.6, 3.5, -0.5],
        )
    }

    fn port_with(price: f64, tbv: f64) -> MockFundamentalsPort {
        MockFundamentalsPort::new()
            .with_price("BANK", price)
            .with_metric("BANK", PerShareMetric::TangibleBookValue, tbv)
    }

    #[test]
    fn value_zone_is_buy() {
        let port = port_with(12.0, 10.0);
        let engine = ValuationEngine::new(&port);
        let z = engine
            .evaluate_bandwidth_zone("BANK", &tbv_history(), BandwidthFamily::TangibleBook)
            .unwrap();

        assert_eq!(z.signal, Signal::Buy);
        assert_eq!(z.current.ratio, Some(1.2));
        assert_eq!((z.targets.wc, z.targets.buy, z.targets.sell), (9.0, 11.5, 30.0));
        assert_eq!(z.touches, 10);
        assert_eq!(z.buy_zone_points.len(), 20);
        assert_eq!(z.sell_zone_points.len(), 9);
        assert!(z.history_years >= 10.0);
    }

    #[test]
    fn overvalued_and_neutral_zones() {
        let port = port_with(35.0, 10.0);
        let engine = ValuationEngine::new(&port);
        let z = engine
            .evaluate_bandwidth_zone("BANK", &tbv_history(), BandwidthFamily::TangibleBook)
            .unwrap();
        assert_eq!(z.signal, Signal::Sell);

        let port = port_with(20.0, 10.0);
        let engine = ValuationEngine::new(&port);
        let z = engine
            .evaluate_bandwidth_zone("BANK", &tbv_history(), BandwidthFamily::TangibleBook)
            .unwrap();
        assert_eq!(z.signal, Signal::Neutral);
    }

    #[test]
    fn negative_tangible_book_is_warning() {
        let port = port_with(20.0, -1.0);
        let engine = ValuationEngine::new(&port);
        let z = engine
            .evaluate_bandwidth_zone("BANK", &tbv_history(), BandwidthFamily::TangibleBook)
            .unwrap();
        assert_eq!(z.signal, Signal::Warning);
        assert_eq!(z.current.ratio, None);
        assert_eq!((z.targets.wc, z.targets.buy, z.targets.sell), (0.0, 0.0, 0.0));
    }

    #[test]
    fn configured_history_minimum_applies() {
        let port = port_with(12.0, 10.0);
        let mut config = multicrv::domain::config::EngineConfig::default();
        config.min_history_years = 15.0;
        let engine = ValuationEngine::new(&port).with_config(config);
        let err = engine
            .evaluate_bandwidth_zone("BANK", &tbv_history(), BandwidthFamily::TangibleBook)
            .unwrap_err();
        assert!(matches!(
            err,
            ValuationError::InsufficientData {
                stage: Stage::BandwidthZone,
                ..
            }
        ));
    }
}

mod percentiles {
    use super::*;

    #[test]
    fn engine_builds_bucket_table() {
        let port = MockFundamentalsPort::new();
        let engine = ValuationEngine::new(&port);
        let table = engine
            .compute_percentiles_and_probability(&ev_ebitda_history("EVCO"))
            .unwrap();

        assert_eq!(table.buckets.len(), BUCKET_COUNT);
        assert_eq!(table.total_observations, 10);
        assert_eq!(table.buckets.iter().map(|b| b.count).sum::<usize>(), 10);
        let edges = table.edges();
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[1], 3.0);
        assert_eq!(edges[2], 3.92);
        assert_eq!(*edges.last().unwrap(), 14.0);

        let live = table.locate(3.5).unwrap();
        assert_relative_eq!(live.probability_down, 0.1);
        assert_relative_eq!(live.probability_up, 0.9);
        assert_eq!(table.locate(2.0).unwrap().probability_down, 0.0);
        assert_eq!(table.buckets.last().unwrap().probability_up, 0.0);
    }
}

mod file_backed {
    use super::*;
    use std::fs;

    #[test]
    fn csv_and_ini_drive_the_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut series = String::from("date,value\n");
        for (y, v) in [
            (2015, 10.0),
            (2016, 12.0),
            (2017, 14.0),
            (2018, 8.0),
            (2019, 20.0),
            (2020, 22.0),
            (2021, 18.0),
        ] {
            series.push_str(&format!("{}-03-31,{}\n", y, v));
        }
        fs::write(dir.path().join("ACME_Price_FreeCashflow.csv"), series).unwrap();
        fs::write(
            dir.path().join("ACME_fundamentals.csv"),
            "item,value\nprice,22\nfree_cashflow_per_share,2\n",
        )
        .unwrap();

        let config = FileConfigAdapter::from_string(
            "[crv]\npositive_threshold = 4\n\n[sectors]\nACME = Tech\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let engine = ValuationEngine::from_config(&adapter, &config).unwrap();

        let report = engine.crv_by_sector_multiples("ACME", &adapter).unwrap();
        let fcf = report.results[&Multiple::PriceFreeCashflow].as_ref().unwrap();
        assert_eq!(fcf.crv.crv_conservative, 5.0);
        assert!(fcf.crv_positive);
        assert!(report.results[&Multiple::EvEbitda].is_err());
    }
}
