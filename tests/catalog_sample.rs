use std::path::Path;

use tariff_engine::annual::{compare_catalog, AnnualParams, MonthlyRecord, MONTHS};
use tariff_engine::catalog::Catalog;
use tariff_engine::engine::evaluate;
use tariff_engine::models::{DemandReading, EnergyReadings, PeriodReadings, PowerReadings, Season};

fn sample_catalog() -> Catalog {
    Catalog::load(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tariffs/tarifas.json"))).unwrap()
}

fn demand(contracted_kw: f64, metered_kw: f64) -> DemandReading {
    DemandReading {
        contracted_kw,
        metered_kw,
    }
}

fn power() -> PowerReadings {
    PowerReadings {
        simple_kw: 6.6,
        peak_plain: demand(40.0, 58.0),
        peak: demand(40.0, 45.0),
        plain: demand(40.0, 38.0),
        valley: demand(40.0, 30.0),
    }
}

fn readings_for_shape(energy: EnergyReadings) -> PeriodReadings {
    PeriodReadings {
        energy,
        power: power(),
        reactive_kvarh: 3500.0,
        compute_reactive: true,
        season: Season::InSeason,
    }
}

fn three_period() -> EnergyReadings {
    EnergyReadings::ThreePeriod {
        peak_kwh: 1200.0,
        plain_kwh: 3100.0,
        valley_kwh: 1700.0,
    }
}

#[test]
fn sample_catalog_loads_cleanly() {
    let catalog = sample_catalog();
    assert!(catalog.rejected().is_empty());
    let ids: Vec<&str> = catalog.tariffs().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["TRS", "TCB", "TRD", "TRT", "MC1", "MC2", "GC1", "TZ1"]);
}

#[test]
fn every_tariff_bills_a_consistent_total() {
    let catalog = sample_catalog();
    for tariff in catalog.tariffs() {
        let month = tariff_engine::annual::energy_for(tariff, &three_period());
        let bill = evaluate(tariff, &readings_for_shape(month));

        let taxable: f64 = bill.line_items().filter(|i| i.taxable).map(|i| i.amount).sum();
        let exempt: f64 = bill.line_items().filter(|i| !i.taxable).map(|i| i.amount).sum();
        assert!((bill.taxable_subtotal - taxable).abs() < 1e-6, "{}", tariff.id);
        assert!((bill.non_taxable_subtotal - exempt).abs() < 1e-6, "{}", tariff.id);
        assert_eq!(
            bill.total,
            bill.taxable_subtotal + bill.non_taxable_subtotal + bill.vat_amount,
            "{}",
            tariff.id
        );
        assert!(bill.total > 0.0, "{}", tariff.id);
    }
}

#[test]
fn three_period_lines_follow_the_display_order() {
    let catalog = sample_catalog();
    let readings = readings_for_shape(three_period());

    let residential = evaluate(catalog.get("TRT").unwrap(), &readings);
    assert!(residential.energy[0].description.starts_with("Valle"));
    assert!(residential.energy[2].description.starts_with("Punta"));

    let medium = evaluate(catalog.get("MC1").unwrap(), &readings);
    assert!(medium.energy[0].description.starts_with("Punta"));
    assert!(medium.energy[2].description.starts_with("Valle"));
}

#[test]
fn seasonal_tariff_carries_the_reactive_power_surcharge() {
    let catalog = sample_catalog();
    let readings = readings_for_shape(three_period());

    let seasonal = evaluate(catalog.get("TZ1").unwrap(), &readings);
    assert!(seasonal
        .power
        .iter()
        .any(|item| item.description.starts_with("Potencia Reactiva P-LL")));

    let large = evaluate(catalog.get("GC1").unwrap(), &readings);
    assert!(large
        .power
        .iter()
        .all(|item| !item.description.contains("Reactiva")));
}

#[test]
fn annual_comparison_over_the_sample_catalog() {
    let catalog = sample_catalog();
    let months: [MonthlyRecord; MONTHS] = std::array::from_fn(|i| EnergyReadings::ThreePeriod {
        peak_kwh: 60.0 + 5.0 * i as f64,
        plain_kwh: 180.0,
        valley_kwh: 110.0,
    });
    let params = AnnualParams {
        power: power(),
        reactive_kvarh: 90.0,
        season: Season::OutOfSeason,
    };
    let ids: Vec<String> = ["TRS", "TCB", "TRD", "TRT", "MISSING"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let comparison = compare_catalog(&catalog, &ids, &months, &params, "TRS");
    assert_eq!(comparison.ranking.len(), 4);
    assert_eq!(comparison.excluded.len(), 1);
    assert_eq!(comparison.excluded[0].id, "MISSING");

    assert!(comparison
        .ranking
        .windows(2)
        .all(|pair| pair[0].annual_total <= pair[1].annual_total));
    for result in &comparison.ranking {
        let sum: f64 = result.monthly_totals.iter().sum();
        assert_eq!(sum, result.annual_total);
        assert!(result.savings_vs_baseline.is_some());
    }
}
