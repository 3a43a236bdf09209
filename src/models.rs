//! Catalog, readings and bill types.
//!
//! A tariff is stored in the catalog as JSON, the readings of one
//! billing period come in with each request, and the itemised bill goes
//! back out.  Pricing rules are sum types tagged by `kind` (`model`
//! for the reactive surcharge).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tariff ids whose three-period energy lines are shown peak first.
pub const PEAK_FIRST_TARIFFS: &[&str] = &[
    "MC1", "MC2", "MC3", "GC1", "GC2", "GC3", "GC5", "TZ1", "TZ2", "TZ3",
];

/// Tariff ids for which the Group 3 power surcharge is computed.
pub const SEASONAL_POWER_SURCHARGE_TARIFFS: &[&str] = &["TZ1", "TZ2", "TZ3"];

/// A named electricity pricing plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffDefinition {
    /// Short identifier such as `"TRS"` or `"MC1"`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free text shown next to the tariff.
    #[serde(default)]
    pub notes: Option<String>,
    /// Monthly fixed charge, billed once per period when nonzero.
    #[serde(default)]
    pub fixed_charge: f64,
    #[serde(default)]
    pub vat: VatConfig,
    pub energy: EnergyModel,
    #[serde(default)]
    pub power: Option<PowerModel>,
    #[serde(default)]
    pub reactive: Option<ReactiveModel>,
    /// Overrides the id-based ordering of three-period energy lines.
    #[serde(default)]
    pub display_order: Option<DisplayOrder>,
    #[serde(default)]
    pub ui: UiLabels,
}

/// VAT rate and the charge categories it applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VatConfig {
    #[serde(default = "default_vat_rate")]
    pub rate: f64,
    #[serde(default)]
    pub applies_to: VatApplicability,
}

impl Default for VatConfig {
    fn default() -> Self {
        Self {
            rate: default_vat_rate(),
            applies_to: VatApplicability::default(),
        }
    }
}

fn default_vat_rate() -> f64 {
    0.22
}

/// Per-category flags; a category not listed is exempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VatApplicability {
    pub fixed_charge: bool,
    pub power: bool,
    pub energy: bool,
    pub reactive: bool,
    pub excess: bool,
}

/// Active-energy pricing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnergyModel {
    /// Cumulative blocks, each bounded by an upper limit.
    StepTiered { tiers: Vec<StepTier> },
    /// Disjoint inclusive ranges of absolute consumption.
    AbsoluteRangeTiered { ranges: Vec<AbsoluteRange> },
    /// Peak / off-peak.
    TwoPeriod {
        peak: EnergyPrice,
        off_peak: EnergyPrice,
    },
    /// Valley / plain / peak.
    ThreePeriod {
        valley: EnergyPrice,
        plain: EnergyPrice,
        peak: EnergyPrice,
    },
}

impl EnergyModel {
    pub const KINDS: &'static [&'static str] = &[
        "step_tiered",
        "absolute_range_tiered",
        "two_period",
        "three_period",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            EnergyModel::StepTiered { .. } => "step_tiered",
            EnergyModel::AbsoluteRangeTiered { .. } => "absolute_range_tiered",
            EnergyModel::TwoPeriod { .. } => "two_period",
            EnergyModel::ThreePeriod { .. } => "three_period",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTier {
    /// Inclusive upper bound in kWh; `None` means unbounded.
    #[serde(default)]
    pub up_to: Option<f64>,
    pub price_per_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsoluteRange {
    pub from: f64,
    /// Inclusive upper bound in kWh; `None` means unbounded.
    #[serde(default)]
    pub to: Option<f64>,
    pub price_per_kwh: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergyPrice {
    pub price_per_kwh: f64,
}

/// Demand pricing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PowerModel {
    SimpleRate {
        price_per_kw: f64,
    },
    TwoBlockThreshold {
        peak_plain: DemandPrice,
        valley: DemandPrice,
        #[serde(default = "default_two_block_minimum")]
        minimum_factor: f64,
        #[serde(default)]
        excess: ExcessBands,
    },
    ThreeBlockThreshold {
        peak: DemandPrice,
        plain: DemandPrice,
        valley: DemandPrice,
        #[serde(default = "default_three_block_minimum")]
        minimum_factor: f64,
        #[serde(default)]
        excess: ExcessBands,
    },
    SeasonalThreshold {
        peak_plain: DemandPrice,
        /// Floor applied in season.  Required: there is no sensible
        /// default for it.
        season_minimum_factor: f64,
        #[serde(default = "default_threshold_factor")]
        excess_threshold_factor: f64,
        #[serde(default = "default_band1_factor")]
        excess_factor: f64,
    },
}

impl PowerModel {
    pub const KINDS: &'static [&'static str] = &[
        "simple_rate",
        "two_block_threshold",
        "three_block_threshold",
        "seasonal_threshold",
    ];
}

fn default_two_block_minimum() -> f64 {
    0.5
}

fn default_three_block_minimum() -> f64 {
    1.0
}

fn default_threshold_factor() -> f64 {
    1.3
}

fn default_band1_factor() -> f64 {
    1.0
}

fn default_band2_factor() -> f64 {
    3.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemandPrice {
    pub price_per_kw: f64,
}

/// Surcharge applied to metered demand above the contracted level.
///
/// Demand between the contracted value and `contracted *
/// threshold_factor` is billed at `band1_factor` times the block price,
/// demand above the threshold at `band2_factor` times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExcessBands {
    #[serde(default = "default_threshold_factor")]
    pub threshold_factor: f64,
    #[serde(default = "default_band1_factor")]
    pub band1_factor: f64,
    #[serde(default = "default_band2_factor")]
    pub band2_factor: f64,
}

impl Default for ExcessBands {
    fn default() -> Self {
        Self {
            threshold_factor: default_threshold_factor(),
            band1_factor: default_band1_factor(),
            band2_factor: default_band2_factor(),
        }
    }
}

/// Reactive-energy surcharge rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ReactiveModel {
    Group1,
    Group2TwoPeriod,
    Group3 {
        #[serde(default = "default_group3_a")]
        a: f64,
        #[serde(default)]
        includes_power_surcharge: bool,
    },
}

impl ReactiveModel {
    pub const MODELS: &'static [&'static str] = &["group1", "group2_two_period", "group3"];
}

fn default_group3_a() -> f64 {
    23.0
}

/// Order in which three-period energy lines are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOrder {
    /// Valley, plain, peak.
    Computed,
    /// Peak, plain, valley.
    PeakFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiLabels {
    pub fixed_charge_title: Option<String>,
    pub fixed_charge_label: Option<String>,
}

impl UiLabels {
    pub fn fixed_charge_title(&self) -> &str {
        self.fixed_charge_title.as_deref().unwrap_or("CARGO FIJO")
    }

    pub fn fixed_charge_label(&self) -> &str {
        self.fixed_charge_label
            .as_deref()
            .unwrap_or("Cargo fijo mensual")
    }
}

impl TariffDefinition {
    /// Decode one catalog entry.
    ///
    /// The model tags are checked before the typed decode so that an
    /// unknown variant is reported as such rather than as a generic
    /// serde error.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let tariff = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();

        let energy = value.get("energy").ok_or_else(|| ConfigError::MissingField {
            tariff: tariff.clone(),
            field: "energy",
        })?;
        let kind = tag_of(energy, "kind");
        if !EnergyModel::KINDS.contains(&kind.as_str()) {
            return Err(ConfigError::UnknownEnergyModel { tariff, kind });
        }

        if let Some(power) = value.get("power").filter(|p| !p.is_null()) {
            let kind = tag_of(power, "kind");
            if !PowerModel::KINDS.contains(&kind.as_str()) {
                return Err(ConfigError::UnknownPowerModel { tariff, kind });
            }
            if kind == "seasonal_threshold" && power.get("season_minimum_factor").is_none() {
                return Err(ConfigError::MissingField {
                    tariff,
                    field: "power.season_minimum_factor",
                });
            }
        }

        if let Some(reactive) = value.get("reactive").filter(|r| !r.is_null()) {
            let model = tag_of(reactive, "model");
            if !ReactiveModel::MODELS.contains(&model.as_str()) {
                return Err(ConfigError::UnknownReactiveModel { tariff, model });
            }
        }

        let definition: TariffDefinition =
            serde_json::from_value(value).map_err(|source| ConfigError::Malformed {
                tariff: tariff.clone(),
                source,
            })?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reject numeric parameters that would make every bill meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            tariff: self.id.clone(),
            reason,
        };
        if !self.vat.rate.is_finite() || self.vat.rate < 0.0 {
            return Err(invalid(format!("VAT rate {} is not a valid rate", self.vat.rate)));
        }
        if !self.fixed_charge.is_finite() {
            return Err(invalid("fixed charge is not a finite number".into()));
        }
        if let Some(ReactiveModel::Group3 { a, .. }) = &self.reactive {
            if !(0.0..=100.0).contains(a) {
                return Err(invalid(format!("group 3 coefficient A={a} is outside 0..=100")));
            }
        }
        if let EnergyModel::StepTiered { tiers } = &self.energy {
            let mut previous = 0.0;
            for tier in tiers {
                if let Some(bound) = tier.up_to {
                    if bound < previous {
                        return Err(invalid(format!(
                            "tier bound {bound} is below the previous bound {previous}"
                        )));
                    }
                    previous = bound;
                }
            }
        }
        Ok(())
    }

    /// Whether three-period energy lines are listed peak first.
    pub fn peak_first(&self) -> bool {
        match self.display_order {
            Some(order) => order == DisplayOrder::PeakFirst,
            None => PEAK_FIRST_TARIFFS.contains(&self.id.as_str()),
        }
    }
}

fn tag_of(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(tag)) => tag.clone(),
        Some(other) => other.to_string(),
        None => "<missing>".to_string(),
    }
}

/// Season flag for seasonal demand tariffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    InSeason,
    OutOfSeason,
}

/// Readings for one billing period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodReadings {
    #[serde(default)]
    pub energy: EnergyReadings,
    #[serde(default)]
    pub power: PowerReadings,
    /// Reactive energy in kVArh.
    #[serde(default, deserialize_with = "lenient::non_negative")]
    pub reactive_kvarh: f64,
    #[serde(default)]
    pub compute_reactive: bool,
    #[serde(default)]
    pub season: Season,
}

/// Active-energy consumption in one of three shapes.
///
/// Tiered tariffs read the sum of whichever shape is supplied.
/// Period-split tariffs read only the matching shape; any other shape
/// counts as zero consumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EnergyReadings {
    Total {
        #[serde(default, deserialize_with = "lenient::non_negative")]
        kwh: f64,
    },
    TwoPeriod {
        #[serde(default, deserialize_with = "lenient::non_negative")]
        peak_kwh: f64,
        #[serde(default, deserialize_with = "lenient::non_negative")]
        off_peak_kwh: f64,
    },
    ThreePeriod {
        #[serde(default, deserialize_with = "lenient::non_negative")]
        peak_kwh: f64,
        #[serde(default, deserialize_with = "lenient::non_negative")]
        plain_kwh: f64,
        #[serde(default, deserialize_with = "lenient::non_negative")]
        valley_kwh: f64,
    },
}

impl Default for EnergyReadings {
    fn default() -> Self {
        EnergyReadings::Total { kwh: 0.0 }
    }
}

impl EnergyReadings {
    pub fn total_kwh(&self) -> f64 {
        match *self {
            EnergyReadings::Total { kwh } => lenient::clamp(kwh),
            EnergyReadings::TwoPeriod {
                peak_kwh,
                off_peak_kwh,
            } => lenient::clamp(peak_kwh) + lenient::clamp(off_peak_kwh),
            EnergyReadings::ThreePeriod {
                peak_kwh,
                plain_kwh,
                valley_kwh,
            } => lenient::clamp(peak_kwh) + lenient::clamp(plain_kwh) + lenient::clamp(valley_kwh),
        }
    }

    /// `(peak, off_peak)` when the readings are split in two periods.
    pub fn two_period(&self) -> (f64, f64) {
        match *self {
            EnergyReadings::TwoPeriod {
                peak_kwh,
                off_peak_kwh,
            } => (lenient::clamp(peak_kwh), lenient::clamp(off_peak_kwh)),
            _ => (0.0, 0.0),
        }
    }

    /// `(peak, plain, valley)` when the readings are split in three periods.
    pub fn three_period(&self) -> (f64, f64, f64) {
        match *self {
            EnergyReadings::ThreePeriod {
                peak_kwh,
                plain_kwh,
                valley_kwh,
            } => (
                lenient::clamp(peak_kwh),
                lenient::clamp(plain_kwh),
                lenient::clamp(valley_kwh),
            ),
            _ => (0.0, 0.0, 0.0),
        }
    }
}

/// Contracted and metered demand for every block a power model may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReadings {
    /// Metered demand for simple-rate tariffs.
    #[serde(default, deserialize_with = "lenient::non_negative")]
    pub simple_kw: f64,
    #[serde(default)]
    pub peak_plain: DemandReading,
    #[serde(default)]
    pub peak: DemandReading,
    #[serde(default)]
    pub plain: DemandReading,
    #[serde(default)]
    pub valley: DemandReading,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandReading {
    #[serde(default, deserialize_with = "lenient::non_negative")]
    pub contracted_kw: f64,
    #[serde(default, deserialize_with = "lenient::non_negative")]
    pub metered_kw: f64,
}

/// One row of the bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLineItem {
    pub description: String,
    pub amount: f64,
    pub taxable: bool,
}

/// Itemised bill for one period.  All totals are derived from the
/// line items and left unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillResult {
    /// Heading shown above the fixed-charge group.
    pub fixed_title: String,
    pub fixed: Vec<BillLineItem>,
    pub power: Vec<BillLineItem>,
    pub energy: Vec<BillLineItem>,
    pub taxable_subtotal: f64,
    pub non_taxable_subtotal: f64,
    pub vat_amount: f64,
    pub total: f64,
}

impl BillResult {
    /// All line items in bill order: fixed, power, energy.
    pub fn line_items(&self) -> impl Iterator<Item = &BillLineItem> {
        self.fixed.iter().chain(&self.power).chain(&self.energy)
    }
}

/// Lenient decoding of numeric readings.
///
/// Missing, `null`, non-numeric, negative and non-finite values all
/// become zero.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn non_negative<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let number = match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        Ok(clamp(number))
    }

    pub fn clamp(value: f64) -> f64 {
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}
