//! Data models for the Salary Engine.
//!
//! The `models` module defines the serialisable records exchanged with
//! the calculators: wage regions, salary inputs, the insurance, deduction
//! and tax breakdowns, and the composed gross/net result.  Every record
//! is built fresh per call and never mutated afterwards.
//!
//! All monetary amounts are whole Vietnamese dong held in `i64`; all
//! rates are fractions (`0.08` means 8%).

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// One of the four statutory minimum-wage zones.
///
/// The region selects the minimum wage used as the insurance floor and
/// the cap applied to unemployment insurance (BHTN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    I,
    II,
    III,
    IV,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::I, Region::II, Region::III, Region::IV];
}

/// Input to the gross/net converters.
///
/// `salary` is the gross salary for the forward transform and the
/// target net salary for the inverse one.  Callers must not pass a
/// negative salary or negative exemptions; see [`SalaryInput::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryInput {
    /// Monthly salary in dong, gross or net depending on the consumer.
    pub salary: i64,
    /// Number of registered dependents.
    #[serde(default)]
    pub dependents: u32,
    /// Minimum-wage zone of the workplace.
    pub region: Region,
    /// Flat tax-exempt allowances (lunch, phone, ...) subtracted from
    /// taxable income on top of the statutory deductions.
    #[serde(default)]
    pub exemptions: i64,
    /// Tax year selecting the regime.  `None` uses
    /// [`DEFAULT_TAX_YEAR`](crate::regime::DEFAULT_TAX_YEAR).
    #[serde(default)]
    pub year: Option<u16>,
}

impl SalaryInput {
    pub fn new(salary: i64, dependents: u32, region: Region) -> Self {
        Self {
            salary,
            dependents,
            region,
            exemptions: 0,
            year: None,
        }
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_exemptions(mut self, exemptions: i64) -> Self {
        self.exemptions = exemptions;
        self
    }

    /// Returns the same input with a different salary.
    pub fn with_salary(self, salary: i64) -> Self {
        Self { salary, ..self }
    }

    /// Checks the caller contract.  Dependents cannot be negative by
    /// construction.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.salary < 0 {
            return Err(InputError::NegativeSalary(self.salary));
        }
        if self.exemptions < 0 {
            return Err(InputError::NegativeExemptions(self.exemptions));
        }
        Ok(())
    }
}

/// Mandatory insurance contributions for one month.
///
/// Each component is rounded on its own, so `total` is the sum of three
/// (employer: four) already-rounded amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceBreakdown {
    /// Social insurance.
    pub bhxh: i64,
    /// Health insurance.
    pub bhyt: i64,
    /// Unemployment insurance.
    pub bhtn: i64,
    /// Workplace-accident fund.  Only employers pay it, so this is zero
    /// in employee breakdowns.
    pub accident_fund: i64,
    pub total: i64,
    /// Base used for BHXH/BHYT after the minimum-wage floor and cap.
    pub capped_salary: i64,
    /// Base used for BHTN after the regional floor and cap.
    pub bhtn_salary: i64,
    /// The gross salary the caller supplied.
    pub original_salary: i64,
}

/// Statutory family-circumstance deductions for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    /// Personal deduction for the taxpayer.
    pub personal: i64,
    /// Combined deduction for all dependents.
    pub dependents: i64,
    pub total: i64,
}

/// Progressive tax on a taxable income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub taxable_income: i64,
    pub tax: i64,
    /// 1-indexed bracket the income falls into; 0 when nothing is taxable.
    pub bracket: u8,
    pub effective_rate: f64,
    pub marginal_rate: f64,
}

impl TaxBreakdown {
    pub fn zero() -> Self {
        Self {
            taxable_income: 0,
            tax: 0,
            bracket: 0,
            effective_rate: 0.0,
            marginal_rate: 0.0,
        }
    }
}

/// Twelve-month projection of a single monthly result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyTotals {
    pub gross: i64,
    pub insurance: i64,
    pub tax: i64,
    pub net: i64,
}

/// A composed gross/net pair with every intermediate figure.
///
/// Invariant: `net == gross - insurance.total - tax.tax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryResult {
    pub gross: i64,
    pub net: i64,
    pub insurance: InsuranceBreakdown,
    pub deductions: DeductionBreakdown,
    pub exemptions: i64,
    pub tax: TaxBreakdown,
    pub dependents: u32,
    pub region: Region,
    /// Tax year the result was computed for.
    pub tax_year: u16,
    pub yearly: YearlyTotals,
}

/// Outcome of the net to gross inversion.
///
/// `converged` is false when no step came within the net tolerance;
/// `result` then holds the best-effort fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrossFromNetResult {
    pub target_net: i64,
    pub converged: bool,
    /// Bisection steps taken.
    pub iterations: u32,
    pub result: SalaryResult,
}

/// The kinds of bonus the annual engines know how to tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    ThirteenthMonth,
    Tet,
    Kpi,
    Performance,
    Quarterly,
    Project,
    Commission,
    Other,
}

impl BonusKind {
    pub fn label(self) -> &'static str {
        match self {
            BonusKind::ThirteenthMonth => "13th-month salary",
            BonusKind::Tet => "Tet bonus",
            BonusKind::Kpi => "KPI bonus",
            BonusKind::Performance => "Performance bonus",
            BonusKind::Quarterly => "Quarterly bonus",
            BonusKind::Project => "Project bonus",
            BonusKind::Commission => "Commission",
            BonusKind::Other => "Other bonuses",
        }
    }
}

/// Yearly bonuses for the basic annual engine.  Absent amounts are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusInput {
    pub thirteenth_month: i64,
    pub kpi: i64,
    pub performance: i64,
    pub other: i64,
}

impl BonusInput {
    /// The bonuses in presentation order.
    pub fn amounts(&self) -> [(BonusKind, i64); 4] {
        [
            (BonusKind::ThirteenthMonth, self.thirteenth_month),
            (BonusKind::Kpi, self.kpi),
            (BonusKind::Performance, self.performance),
            (BonusKind::Other, self.other),
        ]
    }

    pub fn validate(&self) -> Result<(), InputError> {
        validate_bonuses(&self.amounts())
    }
}

/// When in the year bonuses are paid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStrategy {
    /// Every bonus spread evenly over the twelve months.
    #[default]
    Even,
    /// Tet bonus in January, everything else in December.
    Concentrated,
    /// Periodic bonuses at quarter ends, the rest on their natural dates.
    Quarterly,
}

impl DistributionStrategy {
    pub const ALL: [DistributionStrategy; 3] = [
        DistributionStrategy::Even,
        DistributionStrategy::Concentrated,
        DistributionStrategy::Quarterly,
    ];
}

/// Yearly bonuses plus their payout timing for the enhanced engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancedBonusInput {
    pub thirteenth_month: i64,
    pub tet: i64,
    pub kpi: i64,
    pub performance: i64,
    pub quarterly: i64,
    pub project: i64,
    /// Yearly commission total.
    pub commission: i64,
    pub distribution_strategy: DistributionStrategy,
}

impl EnhancedBonusInput {
    pub fn amounts(&self) -> [(BonusKind, i64); 7] {
        [
            (BonusKind::ThirteenthMonth, self.thirteenth_month),
            (BonusKind::Tet, self.tet),
            (BonusKind::Kpi, self.kpi),
            (BonusKind::Performance, self.performance),
            (BonusKind::Quarterly, self.quarterly),
            (BonusKind::Project, self.project),
            (BonusKind::Commission, self.commission),
        ]
    }

    pub fn total(&self) -> i64 {
        self.amounts().iter().map(|(_, amount)| amount).sum()
    }

    pub fn validate(&self) -> Result<(), InputError> {
        validate_bonuses(&self.amounts())
    }
}

fn validate_bonuses(amounts: &[(BonusKind, i64)]) -> Result<(), InputError> {
    match amounts.iter().find(|(_, amount)| *amount < 0) {
        Some((kind, amount)) => Err(InputError::NegativeBonus {
            kind: kind.label(),
            amount: *amount,
        }),
        None => Ok(()),
    }
}

/// Rounds a fractional dong amount to whole dong, halves away from zero.
pub fn round_vnd(amount: f64) -> i64 {
    amount.round() as i64
}

/// `part / whole`, or 0 when `whole` is zero.
pub fn ratio(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
