//! Mandatory insurance contributions.
//!
//! BHXH and BHYT share one contribution base: the gross salary capped
//! at the regime's BHXH/BHYT ceiling.  BHTN uses its own ceiling, a
//! multiple of the regional minimum wage.  Both bases are floored at
//! the regional minimum wage, so a salary below it is insured as if it
//! were the minimum wage.

use crate::models::{round_vnd, InsuranceBreakdown, Region};
use crate::regime::{ContributionRates, TaxRegime};
use serde::{Deserialize, Serialize};

/// Employee contributions deducted from gross pay.
pub fn calculate_insurance(regime: &TaxRegime, gross_salary: i64, region: Region) -> InsuranceBreakdown {
    contributions(regime, gross_salary, region, &regime.employee_rates)
}

/// Contributions the employer pays on top of gross pay, including the
/// workplace-accident fund.  Never part of net pay.
pub fn calculate_employer_insurance(
    regime: &TaxRegime,
    gross_salary: i64,
    region: Region,
) -> InsuranceBreakdown {
    contributions(regime, gross_salary, region, &regime.employer_rates)
}

/// What one employee costs the employer per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerCost {
    pub gross: i64,
    /// Employer-side contributions.
    pub insurance: InsuranceBreakdown,
    /// Gross salary plus employer contributions.
    pub total_cost: i64,
}

/// Gross salary plus the employer's insurance bill.
pub fn calculate_employer_cost(regime: &TaxRegime, gross_salary: i64, region: Region) -> EmployerCost {
    let insurance = calculate_employer_insurance(regime, gross_salary, region);
    EmployerCost {
        gross: gross_salary,
        insurance,
        total_cost: gross_salary + insurance.total,
    }
}

fn contributions(
    regime: &TaxRegime,
    gross_salary: i64,
    region: Region,
    rates: &ContributionRates,
) -> InsuranceBreakdown {
    let floor = regime.minimum_wage(region);
    let capped_salary = gross_salary.min(regime.bhxh_bhyt_cap).max(floor);
    let bhtn_salary = gross_salary.min(regime.bhtn_cap(region)).max(floor);

    let bhxh = round_vnd(capped_salary as f64 * rates.bhxh);
    let bhyt = round_vnd(capped_salary as f64 * rates.bhyt);
    let bhtn = round_vnd(bhtn_salary as f64 * rates.bhtn);
    let accident_fund = round_vnd(capped_salary as f64 * rates.accident_fund);

    InsuranceBreakdown {
        bhxh,
        bhyt,
        bhtn,
        accident_fund,
        total: bhxh + bhyt + bhtn + accident_fund,
        capped_salary,
        bhtn_salary,
        original_salary: gross_salary,
    }
}
