//! Demand (power) evaluators.
//!
//! Threshold tariffs bill each block at `max(metered, minimum_factor *
//! contracted)` and add an excess-demand surcharge when the metered
//! demand exceeds the contracted one.  Base lines fall under the
//! `power` VAT category, surcharge lines under `excess`.

use crate::format;
use crate::models::{DemandReading, ExcessBands, PowerModel, PowerReadings, Season};
use crate::tax::{Charge, ChargeCategory};

/// Result of pricing the demand of one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerCharge {
    pub items: Vec<Charge>,
    /// Metered peak-plain demand times its price, for seasonal
    /// tariffs.  Base of the Group 3 power surcharge.
    pub peak_plain_metered_charge: f64,
}

/// One demand block with its contracted level, metered level and price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandBlock {
    pub contracted: f64,
    pub metered: f64,
    pub price: f64,
}

/// Demand above the contracted level, split in two bands.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Excess {
    pub band1_kw: f64,
    pub band2_kw: f64,
}

impl DemandBlock {
    pub fn new(reading: DemandReading, price: f64) -> Self {
        Self {
            contracted: reading.contracted_kw.max(0.0),
            metered: reading.metered_kw.max(0.0),
            price,
        }
    }

    /// Demand billed: the metered value, floored at a share of the
    /// contracted value.
    pub fn billable_kw(&self, minimum_factor: f64) -> f64 {
        self.metered.max(minimum_factor * self.contracted)
    }

    pub fn base_charge(&self, minimum_factor: f64) -> f64 {
        self.billable_kw(minimum_factor) * self.price
    }

    pub fn excess(&self, threshold_factor: f64) -> Excess {
        if self.metered <= self.contracted {
            return Excess::default();
        }
        let threshold = self.contracted * threshold_factor;
        Excess {
            band1_kw: (self.metered.min(threshold) - self.contracted).max(0.0),
            band2_kw: (self.metered - threshold).max(0.0),
        }
    }
}

/// Price the demand readings with the tariff's power model.
pub fn evaluate(model: &PowerModel, readings: &PowerReadings, season: Season) -> PowerCharge {
    match model {
        PowerModel::SimpleRate { price_per_kw } => PowerCharge {
            items: simple_rate(readings.simple_kw, *price_per_kw),
            peak_plain_metered_charge: 0.0,
        },
        PowerModel::TwoBlockThreshold {
            peak_plain,
            valley,
            minimum_factor,
            excess,
        } => PowerCharge {
            items: threshold_blocks(
                &[
                    ("(Punta-Llano)", DemandBlock::new(readings.peak_plain, peak_plain.price_per_kw)),
                    ("Valle", DemandBlock::new(readings.valley, valley.price_per_kw)),
                ],
                *minimum_factor,
                excess,
            ),
            peak_plain_metered_charge: 0.0,
        },
        PowerModel::ThreeBlockThreshold {
            peak,
            plain,
            valley,
            minimum_factor,
            excess,
        } => PowerCharge {
            items: threshold_blocks(
                &[
                    ("Punta", DemandBlock::new(readings.peak, peak.price_per_kw)),
                    ("Llano", DemandBlock::new(readings.plain, plain.price_per_kw)),
                    ("Valle", DemandBlock::new(readings.valley, valley.price_per_kw)),
                ],
                *minimum_factor,
                excess,
            ),
            peak_plain_metered_charge: 0.0,
        },
        PowerModel::SeasonalThreshold {
            peak_plain,
            season_minimum_factor,
            excess_threshold_factor,
            excess_factor,
        } => {
            let block = DemandBlock::new(readings.peak_plain, peak_plain.price_per_kw);
            PowerCharge {
                items: seasonal(
                    block,
                    season,
                    *season_minimum_factor,
                    *excess_threshold_factor,
                    *excess_factor,
                ),
                peak_plain_metered_charge: block.metered * block.price.max(0.0),
            }
        }
    }
}

/// Flat `metered * price`; nothing is billed without a positive price.
pub fn simple_rate(metered_kw: f64, price_per_kw: f64) -> Vec<Charge> {
    if price_per_kw.is_nan() || price_per_kw <= 0.0 {
        return Vec::new();
    }
    let kw = metered_kw.max(0.0);
    vec![Charge::new(
        format!("{} kW x $ {}", format::kw(kw), format::price_per_kw(price_per_kw)),
        kw * price_per_kw,
        ChargeCategory::Power,
    )]
}

/// Base line for every block, then the nonzero surcharge bands of each
/// block in the same order.
pub fn threshold_blocks(
    blocks: &[(&str, DemandBlock)],
    minimum_factor: f64,
    bands: &ExcessBands,
) -> Vec<Charge> {
    let mut items: Vec<Charge> = blocks
        .iter()
        .map(|(label, block)| {
            let billable = block.billable_kw(minimum_factor);
            Charge::new(
                format!(
                    "Cargo por Potencia {label} {} kW x $ {}",
                    format::kw(billable),
                    format::price_per_kw(block.price)
                ),
                billable * block.price,
                ChargeCategory::Power,
            )
        })
        .collect();

    for (label, block) in blocks {
        let excess = block.excess(bands.threshold_factor);
        for (kw, factor) in [
            (excess.band1_kw, bands.band1_factor),
            (excess.band2_kw, bands.band2_factor),
        ] {
            let amount = kw * block.price * factor;
            if kw > 0.0 && amount != 0.0 {
                items.push(excess_line(label, kw, block.price, factor, amount));
            }
        }
    }
    items
}

/// Seasonal peak-plain block.  In season the floor and the surcharge
/// above `contracted * threshold_factor` apply; out of season the
/// metered demand is billed as is.
pub fn seasonal(
    block: DemandBlock,
    season: Season,
    minimum_factor: f64,
    threshold_factor: f64,
    excess_factor: f64,
) -> Vec<Charge> {
    let in_season = season == Season::InSeason;
    let billable = if in_season {
        block.billable_kw(minimum_factor)
    } else {
        block.metered
    };

    let mut items = vec![Charge::new(
        format!(
            "Cargo por Potencia (Punta-Llano) {} kW x $ {}",
            format::kw(billable),
            format::price_per_kw(block.price)
        ),
        billable * block.price,
        ChargeCategory::Power,
    )];

    if in_season {
        let threshold = block.contracted * threshold_factor;
        if block.metered > threshold {
            let kw = block.metered - threshold;
            let amount = kw * block.price * excess_factor;
            if amount > 0.0 {
                items.push(excess_line("(Punta-Llano)", kw, block.price, excess_factor, amount));
            }
        }
    }
    items
}

fn excess_line(label: &str, kw: f64, price: f64, factor: f64, amount: f64) -> Charge {
    let label = if label.starts_with('(') {
        label.to_string()
    } else {
        format!("({label})")
    };
    Charge::new(
        format!(
            "Recargo Potencia Excedentaria {label} {} kW x $ {} x {}",
            format::kw(kw),
            format::price_per_kw(price),
            format::factor_percent(factor)
        ),
        amount,
        ChargeCategory::Excess,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DemandPrice;

    fn reading(contracted_kw: f64, metered_kw: f64) -> DemandReading {
        DemandReading {
            contracted_kw,
            metered_kw,
        }
    }

    fn two_block() -> PowerModel {
        PowerModel::TwoBlockThreshold {
            peak_plain: DemandPrice { price_per_kw: 100.0 },
            valley: DemandPrice { price_per_kw: 20.0 },
            minimum_factor: 0.5,
            excess: ExcessBands::default(),
        }
    }

    #[test]
    fn floor_not_triggered_below_contract() {
        let block = DemandBlock::new(reading(10.0, 8.0), 100.0);
        assert_eq!(block.billable_kw(0.5), 8.0);
        assert_eq!(block.excess(1.3), Excess::default());
    }

    #[test]
    fn floor_applies_to_low_demand() {
        let block = DemandBlock::new(reading(10.0, 3.0), 100.0);
        assert_eq!(block.billable_kw(0.5), 5.0);
        assert_eq!(block.base_charge(0.5), 500.0);
    }

    #[test]
    fn excess_splits_at_threshold() {
        let block = DemandBlock::new(reading(10.0, 14.0), 100.0);
        assert_eq!(block.billable_kw(0.5), 14.0);
        let excess = block.excess(1.3);
        assert!((excess.band1_kw - 3.0).abs() < 1e-9);
        assert!((excess.band2_kw - 1.0).abs() < 1e-9);
    }

    #[test]
    fn two_block_emits_surcharge_lines() {
        let readings = PowerReadings {
            peak_plain: reading(10.0, 14.0),
            valley: reading(10.0, 8.0),
            ..PowerReadings::default()
        };
        let charge = evaluate(&two_block(), &readings, Season::InSeason);
        assert_eq!(charge.items.len(), 4);
        assert_eq!(charge.items[0].amount, 1400.0);
        assert_eq!(charge.items[1].amount, 160.0);
        assert_eq!(charge.items[2].category, ChargeCategory::Excess);
        assert!((charge.items[2].amount - 300.0).abs() < 1e-9);
        assert!((charge.items[3].amount - 300.0).abs() < 1e-9);
        assert!(charge.items[3].description.ends_with("x 300%"));
    }

    #[test]
    fn three_block_labels_bands() {
        let model = PowerModel::ThreeBlockThreshold {
            peak: DemandPrice { price_per_kw: 300.0 },
            plain: DemandPrice { price_per_kw: 120.0 },
            valley: DemandPrice { price_per_kw: 40.0 },
            minimum_factor: 1.0,
            excess: ExcessBands::default(),
        };
        let readings = PowerReadings {
            peak: reading(10.0, 20.0),
            plain: reading(10.0, 6.0),
            valley: reading(10.0, 11.0),
            ..PowerReadings::default()
        };
        let charge = evaluate(&model, &readings, Season::InSeason);
        let descriptions: Vec<&str> = charge.items.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(descriptions[0], "Cargo por Potencia Punta 20 kW x $ 300,0");
        // minimum factor 1.0 floors the plain block at its contracted value
        assert_eq!(descriptions[1], "Cargo por Potencia Llano 10 kW x $ 120,0");
        assert_eq!(descriptions[3], "Recargo Potencia Excedentaria (Punta) 3 kW x $ 300,0 x 100%");
        assert_eq!(descriptions[4], "Recargo Potencia Excedentaria (Punta) 7 kW x $ 300,0 x 300%");
        assert_eq!(descriptions[5], "Recargo Potencia Excedentaria (Valle) 1 kW x $ 40,0 x 100%");
        assert_eq!(charge.items.len(), 6);
    }

    #[test]
    fn simple_rate_is_flat() {
        let items = simple_rate(12.5, 80.0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 1000.0);
        assert!(simple_rate(12.5, 0.0).is_empty());
    }

    #[test]
    fn seasonal_rules_depend_on_the_season() {
        let model = PowerModel::SeasonalThreshold {
            peak_plain: DemandPrice { price_per_kw: 200.0 },
            season_minimum_factor: 0.6,
            excess_threshold_factor: 1.3,
            excess_factor: 1.0,
        };
        let readings = PowerReadings {
            peak_plain: reading(10.0, 20.0),
            ..PowerReadings::default()
        };

        let in_season = evaluate(&model, &readings, Season::InSeason);
        assert_eq!(in_season.items.len(), 2);
        assert!((in_season.items[1].amount - 7.0 * 200.0).abs() < 1e-9);

        let out_of_season = evaluate(&model, &readings, Season::OutOfSeason);
        assert_eq!(out_of_season.items.len(), 1);
        assert_eq!(out_of_season.items[0].amount, 4000.0);
        assert!(out_of_season
            .items
            .iter()
            .all(|c| c.category != ChargeCategory::Excess));
        assert_eq!(in_season.peak_plain_metered_charge, 4000.0);
    }

    #[test]
    fn seasonal_floor_only_in_season() {
        let model = PowerModel::SeasonalThreshold {
            peak_plain: DemandPrice { price_per_kw: 200.0 },
            season_minimum_factor: 0.6,
            excess_threshold_factor: 1.3,
            excess_factor: 1.0,
        };
        let readings = PowerReadings {
            peak_plain: reading(10.0, 2.0),
            ..PowerReadings::default()
        };
        assert_eq!(evaluate(&model, &readings, Season::InSeason).items[0].amount, 1200.0);
        assert_eq!(evaluate(&model, &readings, Season::OutOfSeason).items[0].amount, 400.0);
    }
}
