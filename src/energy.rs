//! Active-energy evaluators.
//!
//! One function per [`EnergyModel`] variant.  Each returns the priced
//! lines together with the figures the reactive surcharge needs later:
//! total active kWh, total active-energy cost and the peak-only cost.

use crate::format;
use crate::models::{AbsoluteRange, EnergyModel, EnergyReadings, StepTier, TariffDefinition};
use crate::tax::{Charge, ChargeCategory};

/// Result of pricing the active energy of one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyCharge {
    pub items: Vec<Charge>,
    /// Active energy consumed, in kWh.
    pub active_kwh: f64,
    /// Pre-tax cost of all active-energy lines.
    pub cost: f64,
    /// Pre-tax cost of the peak period alone; zero for tiered models.
    pub peak_cost: f64,
}

/// Price the energy readings with the tariff's energy model.
pub fn evaluate(tariff: &TariffDefinition, readings: &EnergyReadings) -> EnergyCharge {
    match &tariff.energy {
        EnergyModel::StepTiered { tiers } => {
            let kwh = readings.total_kwh();
            tiered(kwh, step_tiered(kwh, tiers))
        }
        EnergyModel::AbsoluteRangeTiered { ranges } => {
            let kwh = readings.total_kwh();
            tiered(kwh, absolute_ranges(kwh, ranges))
        }
        EnergyModel::TwoPeriod { peak, off_peak } => {
            let (peak_kwh, off_peak_kwh) = readings.two_period();
            two_period(peak_kwh, peak.price_per_kwh, off_peak_kwh, off_peak.price_per_kwh)
        }
        EnergyModel::ThreePeriod {
            valley,
            plain,
            peak,
        } => {
            let (peak_kwh, plain_kwh, valley_kwh) = readings.three_period();
            let mut charge = three_period(
                valley_kwh,
                valley.price_per_kwh,
                plain_kwh,
                plain.price_per_kwh,
                peak_kwh,
                peak.price_per_kwh,
            );
            if tariff.peak_first() {
                charge.items.reverse();
            }
            charge
        }
    }
}

fn tiered(kwh: f64, items: Vec<Charge>) -> EnergyCharge {
    let cost = items.iter().map(|c| c.amount).sum();
    EnergyCharge {
        items,
        active_kwh: kwh,
        cost,
        peak_cost: 0.0,
    }
}

fn tier_line(index: usize, kwh: f64, price: f64) -> Charge {
    Charge::new(
        format!(
            "{} {} kWh x $ {}",
            format::tier_name(index),
            format::kwh(kwh, 3),
            format::price_per_kwh(price)
        ),
        kwh * price,
        ChargeCategory::Energy,
    )
}

/// Cumulative tiers: each tier holds `up_to - previous up_to` kWh and
/// consumption fills them from the first upward.
///
/// Tiers that receive no kWh are not listed.
pub fn step_tiered(kwh: f64, tiers: &[StepTier]) -> Vec<Charge> {
    let mut remaining = kwh.max(0.0);
    let mut previous_bound = 0.0;
    let mut items = Vec::new();

    for (i, tier) in tiers.iter().enumerate() {
        if remaining <= 0.0 {
            break;
        }
        let capacity = match tier.up_to {
            Some(bound) => (bound - previous_bound).max(0.0),
            None => f64::INFINITY,
        };
        let billed = remaining.min(capacity);
        if billed > 0.0 {
            items.push(tier_line(i + 1, billed, tier.price_per_kwh));
        }
        remaining -= billed;
        if let Some(bound) = tier.up_to {
            previous_bound = bound;
        }
    }
    items
}

/// Absolute inclusive ranges: the kWh billed in `[from, to]` are
/// `min(total, to) - from + 1`, counting both endpoints.
pub fn absolute_ranges(kwh: f64, ranges: &[AbsoluteRange]) -> Vec<Charge> {
    let total = kwh.max(0.0);
    ranges
        .iter()
        .enumerate()
        .filter_map(|(i, range)| {
            let to = range.to.unwrap_or(f64::INFINITY);
            let billed = (total.min(to) - range.from + 1.0).max(0.0);
            (billed > 0.0).then(|| tier_line(i + 1, billed, range.price_per_kwh))
        })
        .collect()
}

fn period_line(label: &str, kwh: f64, price: f64) -> Charge {
    Charge::new(
        format!(
            "{label} {} kWh x $ {}",
            format::kwh(kwh, 2),
            format::price_per_kwh(price)
        ),
        kwh * price,
        ChargeCategory::Energy,
    )
}

/// Peak and off-peak lines, always both.
pub fn two_period(peak_kwh: f64, peak_price: f64, off_peak_kwh: f64, off_peak_price: f64) -> EnergyCharge {
    let peak_kwh = peak_kwh.max(0.0);
    let off_peak_kwh = off_peak_kwh.max(0.0);
    let peak = period_line("Punta", peak_kwh, peak_price);
    let off_peak = period_line("Fuera de Punta", off_peak_kwh, off_peak_price);

    EnergyCharge {
        active_kwh: peak_kwh + off_peak_kwh,
        cost: peak.amount + off_peak.amount,
        peak_cost: peak.amount,
        items: vec![peak, off_peak],
    }
}

/// Valley, plain and peak lines, always all three, in that order.
pub fn three_period(
    valley_kwh: f64,
    valley_price: f64,
    plain_kwh: f64,
    plain_price: f64,
    peak_kwh: f64,
    peak_price: f64,
) -> EnergyCharge {
    let valley_kwh = valley_kwh.max(0.0);
    let plain_kwh = plain_kwh.max(0.0);
    let peak_kwh = peak_kwh.max(0.0);
    let valley = period_line("Valle", valley_kwh, valley_price);
    let plain = period_line("Llano", plain_kwh, plain_price);
    let peak = period_line("Punta", peak_kwh, peak_price);

    EnergyCharge {
        active_kwh: valley_kwh + plain_kwh + peak_kwh,
        cost: valley.amount + plain.amount + peak.amount,
        peak_cost: peak.amount,
        items: vec![valley, plain, peak],
    }
}
