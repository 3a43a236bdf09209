//! Tariff evaluation engine.
//!
//! The `engine` module turns a [`TariffDefinition`] and the
//! [`PeriodReadings`] of one billing period into an itemised
//! [`BillResult`].  Evaluation is a pure function: no state is kept
//! between calls and nothing is rounded.  Pricing is delegated to the
//! evaluators of each charge family and VAT classification to
//! [`crate::tax`].

use crate::energy;
use crate::models::{BillResult, PeriodReadings, TariffDefinition};
use crate::power::{self, PowerCharge};
use crate::reactive::{self, ReactiveCharges};
use crate::tax::{self, Charge, ChargeCategory};

/// Evaluate one tariff for one period.
pub fn evaluate(tariff: &TariffDefinition, readings: &PeriodReadings) -> BillResult {
    let mut fixed = Vec::new();
    if tariff.fixed_charge != 0.0 {
        fixed.push(Charge::new(
            tariff.ui.fixed_charge_label(),
            tariff.fixed_charge,
            ChargeCategory::FixedCharge,
        ));
    }

    let power = match &tariff.power {
        Some(model) => power::evaluate(model, &readings.power, readings.season),
        None => PowerCharge::default(),
    };

    let energy = energy::evaluate(tariff, &readings.energy);

    // Reactive lines are appended after the lines of their own group.
    let reactive = match &tariff.reactive {
        Some(model) if readings.compute_reactive => {
            reactive::evaluate(tariff, model, readings.reactive_kvarh, &energy, &power)
        }
        _ => ReactiveCharges::default(),
    };

    let mut power_items = power.items;
    power_items.extend(reactive.power);
    let mut energy_items = energy.items;
    energy_items.extend(reactive.energy);

    tax::assemble(
        &tariff.vat,
        tariff.ui.fixed_charge_title(),
        fixed,
        power_items,
        energy_items,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DemandReading, EnergyReadings, PowerReadings, Season};
    use serde_json::json;

    fn medium_consumer() -> TariffDefinition {
        TariffDefinition::from_value(json!({
            "id": "MC1",
            "name": "Mediano Consumidor 1",
            "fixed_charge": 1500.0,
            "vat": {
                "rate": 0.22,
                "applies_to": {"fixed_charge": true, "power": true, "energy": true, "reactive": true, "excess": false}
            },
            "energy": {
                "kind": "three_period",
                "valley": {"price_per_kwh": 2.0},
                "plain": {"price_per_kwh": 4.0},
                "peak": {"price_per_kwh": 10.0}
            },
            "power": {
                "kind": "two_block_threshold",
                "peak_plain": {"price_per_kw": 100.0},
                "valley": {"price_per_kw": 20.0}
            },
            "reactive": {"model": "group1"}
        }))
        .unwrap()
    }

    fn readings() -> PeriodReadings {
        PeriodReadings {
            energy: EnergyReadings::ThreePeriod {
                peak_kwh: 100.0,
                plain_kwh: 500.0,
                valley_kwh: 400.0,
            },
            power: PowerReadings {
                peak_plain: DemandReading {
                    contracted_kw: 10.0,
                    metered_kw: 14.0,
                },
                valley: DemandReading {
                    contracted_kw: 10.0,
                    metered_kw: 8.0,
                },
                ..PowerReadings::default()
            },
            reactive_kvarh: 800.0,
            compute_reactive: true,
            season: Season::InSeason,
        }
    }

    #[test]
    fn bill_groups_and_totals() {
        let bill = evaluate(&medium_consumer(), &readings());

        assert_eq!(bill.fixed_title, "CARGO FIJO");
        assert_eq!(bill.fixed.len(), 1);
        assert_eq!(bill.fixed[0].amount, 1500.0);

        // two bases plus two surcharge bands on the peak-plain block
        assert_eq!(bill.power.len(), 4);
        assert!(!bill.power[2].taxable);
        assert!(!bill.power[3].taxable);

        // peak, plain, valley, then reactive
        assert_eq!(bill.energy.len(), 4);
        assert!(bill.energy[0].description.starts_with("Punta"));
        assert!(bill.energy[3].description.starts_with("Energía Reactiva"));

        let energy_cost = 1000.0 + 2000.0 + 800.0;
        let reactive = (0.4 * (0.8 - 0.426) + 0.6 * (0.8 - 0.7)) * energy_cost;
        assert!((bill.energy[3].amount - reactive).abs() < 1e-9);

        let taxable = 1500.0 + 1400.0 + 160.0 + energy_cost + reactive;
        assert!((bill.taxable_subtotal - taxable).abs() < 1e-9);
        assert!((bill.non_taxable_subtotal - 600.0).abs() < 1e-9);
        assert_eq!(bill.vat_amount, bill.taxable_subtotal * 0.22);
        assert_eq!(
            bill.total,
            bill.taxable_subtotal + bill.non_taxable_subtotal + bill.vat_amount
        );
    }

    #[test]
    fn reactive_skipped_when_disabled() {
        let mut r = readings();
        r.compute_reactive = false;
        let bill = evaluate(&medium_consumer(), &r);
        assert_eq!(bill.energy.len(), 3);
        assert!(bill
            .line_items()
            .all(|item| !item.description.contains("Reactiva")));
    }

    #[test]
    fn missing_optional_models_contribute_nothing() {
        let tariff = TariffDefinition::from_value(json!({
            "id": "TRS",
            "name": "Residencial Simple",
            "energy": {
                "kind": "step_tiered",
                "tiers": [{"up_to": 100, "price_per_kwh": 6.0}, {"price_per_kwh": 9.0}]
            }
        }))
        .unwrap();
        let bill = evaluate(&tariff, &readings());
        assert!(bill.fixed.is_empty());
        assert!(bill.power.is_empty());
        // 1000 kWh total across the three periods
        assert_eq!(bill.energy.len(), 2);
        assert_eq!(bill.energy[1].amount, 900.0 * 9.0);
        // nothing is taxable with the default exemption map
        assert_eq!(bill.vat_amount, 0.0);
        assert_eq!(bill.total, bill.non_taxable_subtotal);
    }

    #[test]
    fn group2_reactive_ignored_on_three_period_energy() {
        let tariff = TariffDefinition::from_value(json!({
            "id": "TRT",
            "name": "Residencial Triple Horario",
            "energy": {
                "kind": "three_period",
                "valley": {"price_per_kwh": 2.0},
                "plain": {"price_per_kwh": 4.0},
                "peak": {"price_per_kwh": 10.0}
            },
            "reactive": {"model": "group2_two_period"}
        }))
        .unwrap();
        let readings = PeriodReadings {
            energy: EnergyReadings::ThreePeriod {
                peak_kwh: 100.0,
                plain_kwh: 100.0,
                valley_kwh: 100.0,
            },
            reactive_kvarh: 300.0,
            compute_reactive: true,
            ..PeriodReadings::default()
        };
        let bill = evaluate(&tariff, &readings);
        assert_eq!(bill.energy.len(), 3);
        assert_eq!(bill.non_taxable_subtotal, 200.0 + 400.0 + 1000.0);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let tariff = medium_consumer();
        let r = readings();
        let first = serde_json::to_vec(&evaluate(&tariff, &r)).unwrap();
        let second = serde_json::to_vec(&evaluate(&tariff, &r)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_readings_leave_only_the_fixed_charge() {
        let bill = evaluate(&medium_consumer(), &PeriodReadings::default());
        assert_eq!(bill.fixed[0].amount, 1500.0);
        assert!(bill.power.iter().all(|item| item.amount == 0.0));
        assert!(bill.energy.iter().all(|item| item.amount == 0.0));
        assert_eq!(bill.total, 1500.0 + 1500.0 * 0.22);
    }
}
