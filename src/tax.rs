//! VAT classification and bill totals.
//!
//! Every charge produced by an evaluator carries a [`ChargeCategory`].
//! The tariff's [`VatConfig`] decides per category whether the charge
//! is taxable; [`assemble`] turns the categorised charges into the
//! final [`BillResult`].

use crate::models::{BillLineItem, BillResult, VatConfig};

/// VAT category of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeCategory {
    FixedCharge,
    Power,
    Energy,
    Reactive,
    Excess,
}

/// A priced line before VAT classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    pub description: String,
    pub amount: f64,
    pub category: ChargeCategory,
}

impl Charge {
    pub fn new(description: impl Into<String>, amount: f64, category: ChargeCategory) -> Self {
        Self {
            description: description.into(),
            amount,
            category,
        }
    }
}

impl VatConfig {
    pub fn applies(&self, category: ChargeCategory) -> bool {
        let flags = &self.applies_to;
        match category {
            ChargeCategory::FixedCharge => flags.fixed_charge,
            ChargeCategory::Power => flags.power,
            ChargeCategory::Energy => flags.energy,
            ChargeCategory::Reactive => flags.reactive,
            ChargeCategory::Excess => flags.excess,
        }
    }

    /// VAT owed on a taxable subtotal.
    pub fn tax(&self, taxable: f64) -> f64 {
        taxable * self.rate
    }

    fn line_item(&self, charge: Charge) -> BillLineItem {
        BillLineItem {
            taxable: self.applies(charge.category),
            description: charge.description,
            amount: charge.amount,
        }
    }
}

/// Classify the charges of each group and compute the totals.
///
/// Groups keep their order: fixed, power, energy.  Nothing is rounded.
pub fn assemble(
    vat: &VatConfig,
    fixed_title: &str,
    fixed: Vec<Charge>,
    power: Vec<Charge>,
    energy: Vec<Charge>,
) -> BillResult {
    let classify = |charges: Vec<Charge>| -> Vec<BillLineItem> {
        charges.into_iter().map(|c| vat.line_item(c)).collect()
    };
    let fixed = classify(fixed);
    let power = classify(power);
    let energy = classify(energy);

    let (mut taxable_subtotal, mut non_taxable_subtotal) = (0.0, 0.0);
    for item in fixed.iter().chain(&power).chain(&energy) {
        if item.taxable {
            taxable_subtotal += item.amount;
        } else {
            non_taxable_subtotal += item.amount;
        }
    }
    let vat_amount = vat.tax(taxable_subtotal);
    let total = taxable_subtotal + non_taxable_subtotal + vat_amount;

    BillResult {
        fixed_title: fixed_title.to_string(),
        fixed,
        power,
        energy,
        taxable_subtotal,
        non_taxable_subtotal,
        vat_amount,
        total,
    }
}
