//! Reactive-energy surcharges.
//!
//! The surcharge coefficient grows linearly with the ratio of reactive
//! to active energy above two breakpoints:
//!
//! ```text
//! coefficient = k1 * max(0, ratio - 0.426) + k1_add * max(0, ratio - 0.7)
//! ```
//!
//! The charge is the coefficient times a base amount that depends on
//! the tariff's reactive model.

use crate::energy::EnergyCharge;
use crate::format;
use crate::models::{EnergyModel, ReactiveModel, TariffDefinition, SEASONAL_POWER_SURCHARGE_TARIFFS};
use crate::power::PowerCharge;
use crate::tax::{Charge, ChargeCategory};

pub const LOWER_BREAKPOINT: f64 = 0.426;
pub const UPPER_BREAKPOINT: f64 = 0.7;

/// Slopes of the two linear segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slopes {
    pub k1: f64,
    pub k1_add: f64,
}

impl Slopes {
    pub const GROUP1: Slopes = Slopes { k1: 0.40, k1_add: 0.60 };
    pub const GROUP2: Slopes = Slopes { k1: 0.36, k1_add: 0.64 };
    pub const GROUP3_POWER: Slopes = Slopes { k1: 0.62, k1_add: 0.38 };

    /// Group 3 energy slopes for the tariff's `A` percentage.
    pub fn group3_energy(a: f64) -> Slopes {
        Slopes {
            k1: a / 100.0,
            k1_add: (100.0 - a) / 100.0,
        }
    }
}

/// Surcharge coefficient for the given energies.  Zero when there is
/// no active energy.
pub fn coefficient(active_kwh: f64, reactive_kvarh: f64, slopes: Slopes) -> f64 {
    let active = active_kwh.max(0.0);
    let reactive = reactive_kvarh.max(0.0);
    if active <= 0.0 {
        return 0.0;
    }
    let ratio = reactive / active;
    slopes.k1 * (ratio - LOWER_BREAKPOINT).max(0.0) + slopes.k1_add * (ratio - UPPER_BREAKPOINT).max(0.0)
}

/// Coefficient, base and resulting charge of one surcharge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surcharge {
    pub coefficient: f64,
    pub base: f64,
    pub amount: f64,
}

pub fn surcharge(active_kwh: f64, reactive_kvarh: f64, base: f64, slopes: Slopes) -> Surcharge {
    let coefficient = coefficient(active_kwh, reactive_kvarh, slopes);
    let base = base.max(0.0);
    Surcharge {
        coefficient,
        base,
        amount: coefficient * base,
    }
}

/// Reactive lines, split by the bill group they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactiveCharges {
    pub energy: Vec<Charge>,
    pub power: Vec<Charge>,
}

/// Apply the tariff's reactive model to an evaluated period.
///
/// Group 2 only bills two-period energy tariffs; on any other energy
/// model it produces no line.
pub fn evaluate(
    tariff: &TariffDefinition,
    model: &ReactiveModel,
    reactive_kvarh: f64,
    energy: &EnergyCharge,
    power: &PowerCharge,
) -> ReactiveCharges {
    let mut charges = ReactiveCharges::default();
    let active = energy.active_kwh;

    match model {
        ReactiveModel::Group1 => {
            let s = surcharge(active, reactive_kvarh, energy.cost, Slopes::GROUP1);
            charges.energy.push(line("Energía Reactiva", s));
        }
        ReactiveModel::Group2TwoPeriod => {
            if !matches!(tariff.energy, EnergyModel::TwoPeriod { .. }) {
                return charges;
            }
            let s = surcharge(active, reactive_kvarh, energy.peak_cost, Slopes::GROUP2);
            charges.energy.push(line("Energía Reactiva", s));
        }
        ReactiveModel::Group3 {
            a,
            includes_power_surcharge,
        } => {
            let s = surcharge(active, reactive_kvarh, energy.peak_cost, Slopes::group3_energy(*a));
            charges.energy.push(line("Energía Reactiva", s));

            if *includes_power_surcharge && SEASONAL_POWER_SURCHARGE_TARIFFS.contains(&tariff.id.as_str()) {
                let s = surcharge(
                    active,
                    reactive_kvarh,
                    power.peak_plain_metered_charge,
                    Slopes::GROUP3_POWER,
                );
                charges.power.push(line("Potencia Reactiva P-LL", s));
            }
        }
    }
    charges
}

fn line(label: &str, s: Surcharge) -> Charge {
    Charge::new(
        format!(
            "{label} {} x {}",
            format::percent(s.coefficient * 100.0),
            format::money(s.base)
        ),
        s.amount,
        ChargeCategory::Reactive,
    )
}
