//! Annual compensation roll-up.
//!
//! Twelve months of regular salary plus the yearly bonuses, each bonus
//! taxed under its own rule:
//!
//! * the 13th-month salary is treated as an extra month of gross pay,
//!   with insurance and the full deduction stack;
//! * KPI bonuses are withheld at a flat rate without insurance or
//!   deductions;
//! * performance and other bonuses use the simplified flat rule.

use crate::engine::calculate_net_from_gross;
use crate::models::{ratio, round_vnd, BonusInput, BonusKind, SalaryInput};
use crate::regime::TaxRegimes;
use crate::tax::{kpi_bonus_tax, simplified_bonus_tax};
use serde::{Deserialize, Serialize};

const REGULAR_SALARY_LABEL: &str = "Regular salary";

/// Gross, insurance, tax and net of one compensation component.
///
/// Arithmetic saturates at `i64::MAX` instead of overflowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationLine {
    pub gross: i64,
    pub insurance: i64,
    pub tax: i64,
    pub net: i64,
}

impl CompensationLine {
    pub fn times(self, factor: i64) -> Self {
        Self {
            gross: self.gross.saturating_mul(factor),
            insurance: self.insurance.saturating_mul(factor),
            tax: self.tax.saturating_mul(factor),
            net: self.net.saturating_mul(factor),
        }
    }
}

impl std::ops::Add for CompensationLine {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            gross: self.gross.saturating_add(other.gross),
            insurance: self.insurance.saturating_add(other.insurance),
            tax: self.tax.saturating_add(other.tax),
            net: self.net.saturating_add(other.net),
        }
    }
}

impl std::iter::Sum for CompensationLine {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, line| acc + line)
    }
}

/// One row of the percentage breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub gross: i64,
    pub net: i64,
    /// Share of total gross, in percent.
    pub percentage: f64,
}

/// 50/30/20 budgeting split of net income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsSuggestion {
    pub needs: i64,
    pub wants: i64,
    pub savings: i64,
    pub monthly_needs: i64,
    pub monthly_wants: i64,
    pub monthly_savings: i64,
}

impl SavingsSuggestion {
    pub fn from_yearly_net(net: i64) -> Self {
        let split = |share: f64| round_vnd(net as f64 * share);
        let monthly = |share: f64| round_vnd(net as f64 * share / 12.0);
        Self {
            needs: split(0.5),
            wants: split(0.3),
            savings: split(0.2),
            monthly_needs: monthly(0.5),
            monthly_wants: monthly(0.3),
            monthly_savings: monthly(0.2),
        }
    }
}

/// Regular pay for one month and for the whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularSalary {
    pub monthly: CompensationLine,
    pub yearly: CompensationLine,
}

/// A bonus and what was withheld from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusLine {
    pub kind: BonusKind,
    #[serde(flatten)]
    pub line: CompensationLine,
}

/// Yearly totals and breakdown for regular salary plus bonuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualCompensation {
    pub regular: RegularSalary,
    /// One line per bonus kind, in input order, including zero amounts.
    pub bonuses: Vec<BonusLine>,
    pub totals: CompensationLine,
    /// Non-zero components with their share of total gross.
    pub breakdown: Vec<BreakdownEntry>,
    pub savings: SavingsSuggestion,
}

impl AnnualCompensation {
    pub fn bonus(&self, kind: BonusKind) -> Option<&CompensationLine> {
        self.bonuses.iter().find(|b| b.kind == kind).map(|b| &b.line)
    }
}

/// Rolls up twelve months of `monthly_input` (gross) and `bonuses`.
pub fn calculate_annual_compensation(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    bonuses: &BonusInput,
) -> AnnualCompensation {
    let month = calculate_net_from_gross(regimes, monthly_input);
    let monthly = CompensationLine {
        gross: month.gross,
        insurance: month.insurance.total,
        tax: month.tax.tax,
        net: month.net,
    };
    let regular = RegularSalary {
        monthly,
        yearly: monthly.times(12),
    };

    let bonuses: Vec<BonusLine> = bonuses
        .amounts()
        .into_iter()
        .map(|(kind, amount)| BonusLine {
            kind,
            line: tax_bonus(regimes, monthly_input, kind, amount),
        })
        .collect();

    let totals = regular.yearly + bonuses.iter().map(|b| b.line).sum::<CompensationLine>();
    let components = std::iter::once((REGULAR_SALARY_LABEL, regular.yearly))
        .chain(bonuses.iter().map(|b| (b.kind.label(), b.line)));
    let breakdown = build_breakdown(components, totals.gross);

    AnnualCompensation {
        regular,
        bonuses,
        totals,
        breakdown,
        savings: SavingsSuggestion::from_yearly_net(totals.net),
    }
}

/// Applies the tax rule for `kind` to a yearly bonus amount.
///
/// The 13th-month salary goes through the full gross to net transform
/// with the employee's dependents and exemptions; every other kind is
/// withheld at a flat rate.  A zero amount yields a zero line.
pub fn tax_bonus(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    kind: BonusKind,
    amount: i64,
) -> CompensationLine {
    if amount == 0 {
        return CompensationLine::default();
    }
    let flat = match kind {
        BonusKind::ThirteenthMonth => {
            let result = calculate_net_from_gross(regimes, &monthly_input.with_salary(amount));
            return CompensationLine {
                gross: result.gross,
                insurance: result.insurance.total,
                tax: result.tax.tax,
                net: result.net,
            };
        }
        BonusKind::Kpi => kpi_bonus_tax(amount),
        _ => simplified_bonus_tax(amount),
    };
    CompensationLine {
        gross: flat.gross,
        insurance: 0,
        tax: flat.tax,
        net: flat.net,
    }
}

/// Builds percentage rows for the non-zero components.
pub(crate) fn build_breakdown<'a>(
    components: impl IntoIterator<Item = (&'a str, CompensationLine)>,
    total_gross: i64,
) -> Vec<BreakdownEntry> {
    components
        .into_iter()
        .filter(|(_, line)| line.gross != 0)
        .map(|(label, line)| BreakdownEntry {
            label: label.to_string(),
            gross: line.gross,
            net: line.net,
            percentage: ratio(line.gross, total_gross) * 100.0,
        })
        .collect()
}
