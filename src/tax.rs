//! Personal income tax.
//!
//! The progressive schedule is evaluated with the closed-form shortcut
//! `income × rate − cumulative deduction` of the bracket the income
//! falls into, which equals the sum of the marginal tax of every tier
//! below it.  Bonuses that are not paid as salary are taxed by flat
//! withholding rules kept in their own functions so a change in law
//! only touches one place.

use crate::models::{round_vnd, DeductionBreakdown, TaxBreakdown};
use crate::regime::TaxRegime;
use serde::{Deserialize, Serialize};

/// Withholding rate on KPI bonuses.
pub const KPI_BONUS_TAX_RATE: f64 = 0.10;

/// Withholding rate on performance and other bonuses.
///
/// This is a simplification: such bonuses may legally belong in the
/// progressive schedule.
pub const SIMPLIFIED_BONUS_TAX_RATE: f64 = 0.10;

const MONTHS_PER_YEAR: i64 = 12;

/// Progressive tax on one month of taxable income.
pub fn calculate_tax(regime: &TaxRegime, taxable_income: i64) -> TaxBreakdown {
    progressive_tax(regime, taxable_income, 1)
}

/// Progressive tax on a full year of taxable income.
///
/// The annual schedule is the monthly one with every ceiling and
/// cumulative deduction multiplied by twelve, as used for year-end
/// settlement.
pub fn calculate_annual_tax(regime: &TaxRegime, annual_taxable_income: i64) -> TaxBreakdown {
    progressive_tax(regime, annual_taxable_income, MONTHS_PER_YEAR)
}

fn progressive_tax(regime: &TaxRegime, taxable_income: i64, scale: i64) -> TaxBreakdown {
    if taxable_income <= 0 {
        return TaxBreakdown::zero();
    }
    // Comparing against `income / scale` keeps the ceilings in monthly
    // terms; the ceilings are whole multiples so the lookup is exact.
    let monthly_equivalent = taxable_income.div_euclid(scale)
        + i64::from(taxable_income.rem_euclid(scale) != 0);
    let Some((bracket, row)) = regime.bracket_for(monthly_equivalent) else {
        return TaxBreakdown::zero();
    };
    let raw = taxable_income as f64 * row.rate - (row.deduction * scale) as f64;
    let tax = round_vnd(raw).max(0);
    TaxBreakdown {
        taxable_income,
        tax,
        bracket,
        effective_rate: tax as f64 / taxable_income as f64,
        marginal_rate: row.rate,
    }
}

/// Personal plus per-dependent deductions.  There is no cap on the
/// number of dependents.
pub fn calculate_deductions(regime: &TaxRegime, dependents: u32) -> DeductionBreakdown {
    let personal = regime.personal_deduction;
    let dependents = regime.dependent_deduction * i64::from(dependents);
    DeductionBreakdown {
        personal,
        dependents,
        total: personal + dependents,
    }
}

/// Gross, tax and net of a bonus withheld at a flat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBonusTax {
    pub gross: i64,
    pub tax: i64,
    pub net: i64,
}

fn flat_bonus_tax(amount: i64, rate: f64) -> FlatBonusTax {
    let tax = round_vnd(amount as f64 * rate);
    FlatBonusTax {
        gross: amount,
        tax,
        net: amount - tax,
    }
}

/// KPI bonuses: flat withholding, no insurance, no deductions.
pub fn kpi_bonus_tax(amount: i64) -> FlatBonusTax {
    flat_bonus_tax(amount, KPI_BONUS_TAX_RATE)
}

/// Performance and other bonuses.  See [`SIMPLIFIED_BONUS_TAX_RATE`].
pub fn simplified_bonus_tax(amount: i64) -> FlatBonusTax {
    flat_bonus_tax(amount, SIMPLIFIED_BONUS_TAX_RATE)
}
