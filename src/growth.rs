//! Multi-year salary projection.
//!
//! Compounds the current gross salary forward at a constant raise, or
//! at a per-year schedule of raises, recomputing insurance and tax each
//! year because the salary moves through the brackets.  A handful of
//! fixed thresholds turn the trajectory into plain-language insights.

use crate::engine::calculate_net_from_gross;
use crate::error::InputError;
use crate::models::{round_vnd, Region, SalaryInput};
use crate::regime::TaxRegimes;
use serde::{Deserialize, Serialize};

/// Longest projection the engine accepts.
pub const MAX_PROJECTION_YEARS: u32 = 50;

/// Age assumed at the start of a career when the caller gives none.
pub const CAREER_START_AGE: u32 = 22;

pub const RETIREMENT_AGE: u32 = 60;

/// Raises below this percentage do not keep up with inflation.
pub const INFLATION_BENCHMARK_PERCENT: f64 = 4.0;

/// Parameters of a salary projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryGrowthInput {
    /// Current monthly gross salary.
    pub current_salary: i64,
    pub years_of_experience: u32,
    /// Yearly raise in percent (`8.0` means 8%).
    pub annual_raise: f64,
    /// Number of years to project.
    pub target_years: u32,
    /// Optional raise per projected year, in percent.  Years past the
    /// end of the schedule use `annual_raise`.
    #[serde(default)]
    pub raise_schedule: Vec<f64>,
    #[serde(default)]
    pub dependents: u32,
    pub region: Region,
    #[serde(default)]
    pub year: Option<u16>,
    /// Current age.  Derived from experience when absent.
    #[serde(default)]
    pub current_age: Option<u32>,
}

impl SalaryGrowthInput {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.current_salary < 0 {
            return Err(InputError::NegativeSalary(self.current_salary));
        }
        if let Some(&raise) = std::iter::once(&self.annual_raise)
            .chain(&self.raise_schedule)
            .find(|r| !r.is_finite() || **r <= -100.0)
        {
            return Err(InputError::InvalidRaise(raise));
        }
        if self.target_years == 0 || self.target_years > MAX_PROJECTION_YEARS {
            return Err(InputError::InvalidHorizon {
                years: self.target_years,
                max: MAX_PROJECTION_YEARS,
            });
        }
        Ok(())
    }

    fn starting_age(&self) -> u32 {
        self.current_age
            .unwrap_or(CAREER_START_AGE + self.years_of_experience)
    }

    fn raise_for_year(&self, year: u32) -> f64 {
        self.raise_schedule
            .get(year as usize - 1)
            .copied()
            .unwrap_or(self.annual_raise)
    }
}

/// One projected year.  Year 0 is the current salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthYear {
    pub year: u32,
    pub age: u32,
    pub gross: i64,
    pub insurance: i64,
    pub tax: i64,
    pub net: i64,
    pub tax_bracket: u8,
    /// Raise applied this year, in percent.
    pub raise_percent: f64,
    /// Growth since year 0, in percent.
    pub cumulative_raise_percent: f64,
}

/// What an insight comments on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    GrowthRate,
    MarketBenchmark,
    TaxBracket,
    Retirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightTone {
    Positive,
    Neutral,
    Warning,
}

/// A rule-based remark on the projected trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthInsight {
    pub kind: InsightKind,
    pub tone: InsightTone,
    pub message: String,
}

/// Year-by-year projection with its summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryGrowthProjection {
    pub years: Vec<GrowthYear>,
    pub final_gross: i64,
    pub final_net: i64,
    pub total_growth_percent: f64,
    /// Compound average raise over the horizon, in percent.
    pub average_raise_percent: f64,
    pub insights: Vec<GrowthInsight>,
}

/// Projects the salary `target_years` ahead under the regime of
/// `input.year`.
pub fn calculate_salary_growth(regimes: &TaxRegimes, input: &SalaryGrowthInput) -> SalaryGrowthProjection {
    let base = SalaryInput {
        salary: input.current_salary,
        dependents: input.dependents,
        region: input.region,
        exemptions: 0,
        year: input.year,
    };
    let start_age = input.starting_age();
    let mut factor = 1.0_f64;
    let mut years = Vec::with_capacity(input.target_years as usize + 1);

    for year in 0..=input.target_years {
        let raise_percent = if year == 0 { 0.0 } else { input.raise_for_year(year) };
        factor *= 1.0 + raise_percent / 100.0;
        let gross = round_vnd(input.current_salary as f64 * factor);
        let result = calculate_net_from_gross(regimes, &base.with_salary(gross));
        years.push(GrowthYear {
            year,
            age: start_age + year,
            gross,
            insurance: result.insurance.total,
            tax: result.tax.tax,
            net: result.net,
            tax_bracket: result.tax.bracket,
            raise_percent,
            cumulative_raise_percent: (factor - 1.0) * 100.0,
        });
    }

    let total_growth_percent = (factor - 1.0) * 100.0;
    let average_raise_percent =
        (factor.powf(1.0 / f64::from(input.target_years.max(1))) - 1.0) * 100.0;
    let insights = derive_insights(input, &years, average_raise_percent);
    let (final_gross, final_net) = years
        .last()
        .map_or((input.current_salary, 0), |y| (y.gross, y.net));

    SalaryGrowthProjection {
        final_gross,
        final_net,
        total_growth_percent,
        average_raise_percent,
        insights,
        years,
    }
}

/// Typical monthly gross for a given amount of experience.
fn market_benchmark(years_of_experience: u32) -> i64 {
    match years_of_experience {
        0..=1 => 8_000_000,
        2..=4 => 15_000_000,
        5..=9 => 25_000_000,
        10..=14 => 40_000_000,
        _ => 55_000_000,
    }
}

fn insight(kind: InsightKind, tone: InsightTone, message: String) -> GrowthInsight {
    GrowthInsight {
        kind,
        tone,
        message,
    }
}

fn derive_insights(
    input: &SalaryGrowthInput,
    years: &[GrowthYear],
    average_raise: f64,
) -> Vec<GrowthInsight> {
    let mut insights = Vec::new();

    let (tone, verdict) = if average_raise >= 15.0 {
        (InsightTone::Positive, "is exceptional")
    } else if average_raise >= 10.0 {
        (InsightTone::Positive, "is strong growth")
    } else if average_raise >= INFLATION_BENCHMARK_PERCENT {
        (InsightTone::Neutral, "keeps ahead of inflation")
    } else {
        (InsightTone::Warning, "trails inflation, so real income will shrink")
    };
    insights.push(insight(
        InsightKind::GrowthRate,
        tone,
        format!("An average raise of {average_raise:.1}% a year {verdict}."),
    ));

    let benchmark = market_benchmark(input.years_of_experience);
    let position = input.current_salary as f64 / benchmark as f64;
    let (tone, verdict) = if position >= 1.2 {
        (InsightTone::Positive, "above")
    } else if position <= 0.8 {
        (InsightTone::Warning, "below")
    } else {
        (InsightTone::Neutral, "in line with")
    };
    insights.push(insight(
        InsightKind::MarketBenchmark,
        tone,
        format!(
            "Your salary is {verdict} the typical {benchmark} for {} years of experience.",
            input.years_of_experience
        ),
    ));

    if let (Some(first), Some(last)) = (years.first(), years.last()) {
        if last.tax_bracket > first.tax_bracket {
            let crossing = years
                .iter()
                .find(|y| y.tax_bracket == last.tax_bracket)
                .map_or(last.year, |y| y.year);
            insights.push(insight(
                InsightKind::TaxBracket,
                InsightTone::Warning,
                format!(
                    "Your income moves from tax bracket {} to bracket {} by year {}; plan deductions accordingly.",
                    first.tax_bracket, last.tax_bracket, crossing
                ),
            ));
        }

        let message = if first.age >= RETIREMENT_AGE {
            format!("You are already at the statutory retirement age of {RETIREMENT_AGE}.")
        } else if last.age >= RETIREMENT_AGE {
            format!(
                "The projection reaches retirement age {RETIREMENT_AGE} in year {}.",
                RETIREMENT_AGE - first.age
            )
        } else {
            format!(
                "{} working years remain after the projection before retirement at {RETIREMENT_AGE}.",
                RETIREMENT_AGE - last.age
            )
        };
        insights.push(insight(InsightKind::Retirement, InsightTone::Neutral, message));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(current_salary: i64, annual_raise: f64, target_years: u32) -> SalaryGrowthInput {
        SalaryGrowthInput {
            current_salary,
            years_of_experience: 3,
            annual_raise,
            target_years,
            raise_schedule: Vec::new(),
            dependents: 0,
            region: Region::I,
            year: None,
            current_age: None,
        }
    }

    fn kinds(projection: &SalaryGrowthProjection) -> Vec<InsightKind> {
        projection.insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn compounds_constant_raise() {
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &input(20_000_000, 10.0, 3));
        let grosses: Vec<i64> = projection.years.iter().map(|y| y.gross).collect();
        assert_eq!(grosses, vec![20_000_000, 22_000_000, 24_200_000, 26_620_000]);
        assert_eq!(projection.years[0].net, 17_460_000);
        assert_eq!(projection.years[0].age, 25);
        assert_eq!(projection.years[3].age, 28);
        assert!((projection.years[2].cumulative_raise_percent - 21.0).abs() < 1e-9);
        assert!((projection.total_growth_percent - 33.1).abs() < 1e-9);
        assert!((projection.average_raise_percent - 10.0).abs() < 1e-9);
        assert_eq!(projection.final_gross, 26_620_000);
    }

    #[test]
    fn schedule_overrides_early_years() {
        let mut growth = input(10_000_000, 5.0, 3);
        growth.raise_schedule = vec![20.0];
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &growth);
        let raises: Vec<f64> = projection.years.iter().map(|y| y.raise_percent).collect();
        assert_eq!(raises, vec![0.0, 20.0, 5.0, 5.0]);
        assert_eq!(projection.years[1].gross, 12_000_000);
        assert_eq!(projection.years[2].gross, 12_600_000);
    }

    #[test]
    fn net_is_recomputed_every_year() {
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &input(20_000_000, 50.0, 4));
        for year in &projection.years {
            assert_eq!(year.net, year.gross - year.insurance - year.tax);
        }
        assert!(projection.years[4].tax_bracket > projection.years[0].tax_bracket);
    }

    #[test]
    fn insights_cover_growth_benchmark_brackets_and_retirement() {
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &input(20_000_000, 15.0, 10));
        assert_eq!(
            kinds(&projection),
            vec![
                InsightKind::GrowthRate,
                InsightKind::MarketBenchmark,
                InsightKind::TaxBracket,
                InsightKind::Retirement,
            ]
        );
        assert_eq!(projection.insights[0].tone, InsightTone::Positive);
        // 20M against a 15M benchmark is a third above the market.
        assert_eq!(projection.insights[1].tone, InsightTone::Positive);
        assert!(projection.insights[1].message.contains("above"));
    }

    #[test]
    fn slow_raise_triggers_inflation_warning() {
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &input(10_000_000, 2.0, 5));
        assert_eq!(projection.insights[0].tone, InsightTone::Warning);
        assert_eq!(projection.insights[1].tone, InsightTone::Warning);
        assert!(!kinds(&projection).contains(&InsightKind::TaxBracket));
    }

    #[test]
    fn retirement_milestone_from_explicit_age() {
        let mut growth = input(30_000_000, 5.0, 10);
        growth.current_age = Some(55);
        let projection = calculate_salary_growth(&TaxRegimes::builtin(), &growth);
        let retirement = projection.insights.last().unwrap();
        assert_eq!(retirement.kind, InsightKind::Retirement);
        assert!(retirement.message.contains("in year 5"));
    }

    #[test]
    fn validation_guards_the_contract() {
        assert!(input(10_000_000, 5.0, 5).validate().is_ok());
        assert_eq!(
            input(-1, 5.0, 5).validate(),
            Err(InputError::NegativeSalary(-1))
        );
        assert_eq!(
            input(1, 5.0, 0).validate(),
            Err(InputError::InvalidHorizon { years: 0, max: MAX_PROJECTION_YEARS })
        );
        let mut bad_schedule = input(1, 5.0, 5);
        bad_schedule.raise_schedule = vec![3.0, -150.0];
        assert_eq!(bad_schedule.validate(), Err(InputError::InvalidRaise(-150.0)));
        assert!(input(1, f64::NAN, 5).validate().is_err());
    }
}
