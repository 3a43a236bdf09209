//! Annual comparison of tariffs.
//!
//! The aggregator evaluates every selected tariff once per month,
//! sums the twelve monthly totals and ranks the tariffs from cheapest
//! to most expensive.  Monthly consumption is entered in a single
//! shape (total, two periods or three periods) and converted to the
//! shape each tariff expects; the conversion is approximate by nature
//! (an off-peak figure is billed as plain energy, a missing valley
//! split counts as zero valley energy).
//!
//! Tariffs are evaluated in parallel with [`rayon`]; each monthly
//! evaluation is independent, and ranking only happens once every
//! total is known.

use crate::catalog::Catalog;
use crate::engine;
use crate::models::{EnergyModel, EnergyReadings, PeriodReadings, PowerReadings, Season, TariffDefinition};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const MONTHS: usize = 12;

/// Consumption entered for one month.
pub type MonthlyRecord = EnergyReadings;

/// Readings that stay the same for every month of the comparison.
///
/// `power` is a single set of demand readings for every tariff compared:
/// two-block and seasonal tariffs both read `power.peak_plain`, so a
/// comparison between them assumes the same peak-plain demand.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnnualParams {
    #[serde(default)]
    pub power: PowerReadings,
    #[serde(default, deserialize_with = "crate::models::lenient::non_negative")]
    pub reactive_kvarh: f64,
    #[serde(default)]
    pub season: Season,
}

/// Annual cost of one tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAnnualResult {
    pub id: String,
    pub name: String,
    /// Sum of the twelve monthly totals, unrounded.
    pub annual_total: f64,
    pub monthly_totals: [f64; MONTHS],
    /// Baseline annual total minus this one; positive means cheaper
    /// than the baseline.  `None` when the baseline was not evaluated.
    pub savings_vs_baseline: Option<f64>,
}

/// A tariff requested for comparison that could not take part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedTariff {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualComparison {
    pub ranking: Vec<RankedAnnualResult>,
    pub excluded: Vec<ExcludedTariff>,
}

/// Convert one month of consumption to the shape `tariff` bills.
pub fn energy_for(tariff: &TariffDefinition, month: &MonthlyRecord) -> EnergyReadings {
    match tariff.energy {
        EnergyModel::StepTiered { .. } | EnergyModel::AbsoluteRangeTiered { .. } => {
            EnergyReadings::Total {
                kwh: month.total_kwh(),
            }
        }
        EnergyModel::TwoPeriod { .. } => match *month {
            EnergyReadings::TwoPeriod { .. } => *month,
            EnergyReadings::ThreePeriod {
                peak_kwh,
                plain_kwh,
                valley_kwh,
            } => EnergyReadings::TwoPeriod {
                peak_kwh,
                off_peak_kwh: plain_kwh + valley_kwh,
            },
            EnergyReadings::Total { kwh } => EnergyReadings::TwoPeriod {
                peak_kwh: 0.0,
                off_peak_kwh: kwh,
            },
        },
        EnergyModel::ThreePeriod { .. } => match *month {
            EnergyReadings::ThreePeriod { .. } => *month,
            EnergyReadings::TwoPeriod {
                peak_kwh,
                off_peak_kwh,
            } => EnergyReadings::ThreePeriod {
                peak_kwh,
                plain_kwh: off_peak_kwh,
                valley_kwh: 0.0,
            },
            EnergyReadings::Total { kwh } => EnergyReadings::ThreePeriod {
                peak_kwh: 0.0,
                plain_kwh: kwh,
                valley_kwh: 0.0,
            },
        },
    }
}

/// Full readings for one month of one tariff.  The reactive surcharge
/// is always computed.
pub fn readings_for(tariff: &TariffDefinition, month: &MonthlyRecord, params: &AnnualParams) -> PeriodReadings {
    PeriodReadings {
        energy: energy_for(tariff, month),
        power: params.power,
        reactive_kvarh: params.reactive_kvarh,
        compute_reactive: true,
        season: params.season,
    }
}

/// Evaluate the year for every tariff and rank them by annual total.
pub fn evaluate_annual(
    tariffs: &[TariffDefinition],
    months: &[MonthlyRecord; MONTHS],
    params: &AnnualParams,
    baseline_id: &str,
) -> Vec<RankedAnnualResult> {
    let mut results: Vec<RankedAnnualResult> = tariffs
        .par_iter()
        .map(|tariff| {
            let mut monthly_totals = [0.0; MONTHS];
            for (total, month) in monthly_totals.iter_mut().zip(months) {
                *total = engine::evaluate(tariff, &readings_for(tariff, month, params)).total;
            }
            let annual_total: f64 = monthly_totals.iter().sum();
            debug!(tariff = %tariff.id, annual_total, "annual total computed");
            RankedAnnualResult {
                id: tariff.id.clone(),
                name: tariff.name.clone(),
                annual_total,
                monthly_totals,
                savings_vs_baseline: None,
            }
        })
        .collect();

    let baseline = results
        .iter()
        .find(|r| r.id == baseline_id)
        .map(|r| r.annual_total);
    if baseline.is_none() {
        warn!(baseline = baseline_id, "baseline tariff not among the compared tariffs");
    }
    for result in &mut results {
        result.savings_vs_baseline = baseline.map(|b| b - result.annual_total);
    }

    results.sort_by(|a, b| a.annual_total.total_cmp(&b.annual_total));
    results
}

/// Compare the catalog tariffs named in `ids`.
///
/// Repeated ids are compared once.  Ids that are unknown or whose
/// definition was rejected at load time are reported in
/// [`AnnualComparison::excluded`]; the rest are ranked.
pub fn compare_catalog(
    catalog: &Catalog,
    ids: &[String],
    months: &[MonthlyRecord; MONTHS],
    params: &AnnualParams,
    baseline_id: &str,
) -> AnnualComparison {
    let mut selected = Vec::new();
    let mut excluded = Vec::new();
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match catalog.get(id) {
            Some(tariff) => selected.push(tariff.clone()),
            None => {
                let reason = match catalog.rejection(id) {
                    Some(err) => err.to_string(),
                    None => "unknown tariff".to_string(),
                };
                excluded.push(ExcludedTariff {
                    id: id.clone(),
                    reason,
                });
            }
        }
    }

    AnnualComparison {
        ranking: evaluate_annual(&selected, months, params, baseline_id),
        excluded,
    }
}
