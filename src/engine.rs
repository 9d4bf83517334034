//! Gross/net conversion engine.
//!
//! The forward transform composes the insurance and tax calculators in
//! a fixed order: insurance on gross, then deductions and exemptions,
//! then progressive tax on what remains.  The inverse has no closed
//! form because insurance caps and tax brackets are piecewise, so it
//! bisects over the forward transform, which is monotonic in gross.
//! Batches of inputs are converted in parallel with [`rayon`].

use crate::insurance::calculate_insurance;
use crate::models::{round_vnd, GrossFromNetResult, SalaryInput, SalaryResult, YearlyTotals};
use crate::regime::{TaxRegime, TaxRegimes, DEFAULT_TAX_YEAR};
use crate::tax::{calculate_deductions, calculate_tax};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Upper bound on bisection steps when inverting net to gross.
pub const MAX_INVERSION_ITERATIONS: u32 = 50;

/// A gross salary is accepted once its net is within this many dong of
/// the target.
pub const NET_TOLERANCE_VND: i64 = 1_000;

/// Converts a gross monthly salary (`input.salary`) into net pay.
pub fn calculate_net_from_gross(regimes: &TaxRegimes, input: &SalaryInput) -> SalaryResult {
    gross_to_net(regimes.for_year(input.year), input)
}

/// Forward transform against an already resolved regime.
pub fn gross_to_net(regime: &TaxRegime, input: &SalaryInput) -> SalaryResult {
    let gross = input.salary;
    let insurance = calculate_insurance(regime, gross, input.region);
    let deductions = calculate_deductions(regime, input.dependents);
    let taxable_income = (gross - insurance.total - deductions.total - input.exemptions).max(0);
    let tax = calculate_tax(regime, taxable_income);
    let net = gross - insurance.total - tax.tax;
    SalaryResult {
        gross,
        net,
        insurance,
        deductions,
        exemptions: input.exemptions,
        tax,
        dependents: input.dependents,
        region: input.region,
        tax_year: input.year.unwrap_or(DEFAULT_TAX_YEAR),
        yearly: YearlyTotals {
            gross: gross.saturating_mul(12),
            insurance: insurance.total.saturating_mul(12),
            tax: tax.tax.saturating_mul(12),
            net: net.saturating_mul(12),
        },
    }
}

/// Finds the gross salary whose net pay is `input.salary`.
///
/// Bisects between the target net and twice the target for at most
/// [`MAX_INVERSION_ITERATIONS`] steps.  Any midpoint whose net lies
/// within [`NET_TOLERANCE_VND`] counts as a hit, but the search keeps
/// narrowing until the bracket is a single dong wide and returns the
/// hit whose net is closest to the target.  That keeps the recovered
/// gross within the tolerance of any gross that produces the target.
///
/// Without a hit the forward result for the upper bound is returned
/// and `converged` is false.
pub fn calculate_gross_from_net(regimes: &TaxRegimes, input: &SalaryInput) -> GrossFromNetResult {
    let regime = regimes.for_year(input.year);
    let target_net = input.salary;
    let mut lower = target_net;
    let mut upper = target_net.saturating_mul(2);
    let mut best: Option<SalaryResult> = None;
    let mut iterations = 0;

    while iterations < MAX_INVERSION_ITERATIONS {
        iterations += 1;
        let mid = round_vnd((lower as f64 + upper as f64) / 2.0);
        let result = gross_to_net(regime, &input.with_salary(mid));
        let miss = (result.net - target_net).abs();
        if miss <= NET_TOLERANCE_VND && best.map_or(true, |b| miss < (b.net - target_net).abs()) {
            best = Some(result);
        }
        if miss == 0 {
            break;
        }
        if result.net > target_net {
            upper = mid;
        } else {
            lower = mid;
        }
        if upper - lower <= 1 {
            break;
        }
    }

    match best {
        Some(result) => {
            debug!(target_net, gross = result.gross, iterations, "net to gross converged");
            GrossFromNetResult {
                target_net,
                converged: true,
                iterations,
                result,
            }
        }
        None => {
            warn!(target_net, upper, "net to gross did not converge, using upper bound");
            GrossFromNetResult {
                target_net,
                converged: false,
                iterations,
                result: gross_to_net(regime, &input.with_salary(upper)),
            }
        }
    }
}

/// Converts many gross salaries at once, spreading the work across
/// threads.  Results keep the order of `inputs`.
pub fn calculate_net_batch(regimes: &TaxRegimes, inputs: &[SalaryInput]) -> Vec<SalaryResult> {
    inputs
        .par_iter()
        .map(|input| calculate_net_from_gross(regimes, input))
        .collect()
}
