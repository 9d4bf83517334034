//! Month-by-month annual compensation with bonus timing.
//!
//! Tax is withheld per month on that month's gross, so the month a
//! bonus lands in changes the yearly tax.  This engine places the
//! bonuses according to a [`DistributionStrategy`], computes every
//! month, compares all strategies to find the cheapest one, and
//! reconciles the monthly withholding against tax on the true annual
//! basis.
//!
//! Per-month withholding is a simplification of real payroll practice.
//! The year-end reconciliation shows how far it drifts from annual
//! liability.

use crate::annual::{build_breakdown, BreakdownEntry, CompensationLine, SavingsSuggestion};
use crate::engine::calculate_net_from_gross;
use crate::models::{ratio, BonusKind, DistributionStrategy, EnhancedBonusInput, SalaryInput};
use crate::regime::TaxRegimes;
use crate::tax::{calculate_annual_tax, calculate_deductions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MONTHS: usize = 12;
const ALL_MONTHS: [u8; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
const QUARTER_ENDS: [u8; 4] = [3, 6, 9, 12];
const TET_MONTH: u8 = 1;
const YEAR_END_MONTH: u8 = 12;
const PROJECT_MONTH: u8 = 6;

/// A bonus paid in a given month, with the tax it would attract on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBonus {
    pub kind: BonusKind,
    pub amount: i64,
    /// Tax on `amount` as a standalone gross salary with no dependents
    /// but the employee's exemptions.  For attribution only; the
    /// month's withholding is in [`MonthlyBreakdown::tax`].
    pub tax: i64,
}

/// One calendar month of pay under a distribution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBreakdown {
    /// Calendar month, 1 to 12.
    pub month: u8,
    pub base_gross: i64,
    pub bonuses: Vec<MonthlyBonus>,
    /// Base salary plus every bonus paid this month.
    pub gross: i64,
    pub insurance: i64,
    pub tax: i64,
    pub net: i64,
    pub tax_bracket: u8,
}

/// Yearly result of one distribution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: DistributionStrategy,
    pub total_tax: i64,
    pub total_net: i64,
    /// Tax saved compared with the most expensive strategy.
    pub savings_vs_worst: i64,
}

/// The requested strategy measured against the alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxOptimization {
    pub current_strategy: StrategyOutcome,
    /// The other strategies, in declaration order.
    pub alternative_strategies: Vec<StrategyOutcome>,
    /// Strategy with the lowest yearly tax; ties go to the earlier one.
    pub optimal_strategy: DistributionStrategy,
    /// Extra tax the current strategy pays over the optimal one.
    pub potential_savings: i64,
}

/// Monthly withholding compared with tax due on the annual basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearEndReconciliation {
    pub annual_gross: i64,
    pub annual_insurance: i64,
    pub annual_deductions: i64,
    pub annual_exemptions: i64,
    pub annual_taxable_income: i64,
    pub annual_tax: i64,
    pub annual_tax_bracket: u8,
    pub withheld_tax: i64,
    /// `withheld_tax - annual_tax`: positive is refunded, negative is owed.
    pub difference: i64,
    pub annual_effective_rate: f64,
    pub withheld_effective_rate: f64,
}

/// A year computed month by month under one distribution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedAnnualCompensation {
    pub strategy: DistributionStrategy,
    /// January to December.
    pub months: Vec<MonthlyBreakdown>,
    pub totals: CompensationLine,
    pub breakdown: Vec<BreakdownEntry>,
    pub savings: SavingsSuggestion,
    pub tax_optimization: TaxOptimization,
    pub reconciliation: YearEndReconciliation,
}

/// Computes the year month by month under the requested strategy and
/// compares it with the other strategies.
///
/// `monthly_input.salary` is the base gross paid every month.
pub fn calculate_enhanced_annual_compensation(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    bonuses: &EnhancedBonusInput,
) -> EnhancedAnnualCompensation {
    let strategy = bonuses.distribution_strategy;
    let mut simulations: Vec<(DistributionStrategy, Vec<MonthlyBreakdown>)> = DistributionStrategy::ALL
        .par_iter()
        .map(|&s| (s, simulate_year(regimes, monthly_input, bonuses, s)))
        .collect();

    let tax_optimization = compare_strategies(strategy, &simulations);
    debug!(
        ?strategy,
        optimal = ?tax_optimization.optimal_strategy,
        potential_savings = tax_optimization.potential_savings,
        "compared bonus distribution strategies"
    );

    let position = simulations
        .iter()
        .position(|(s, _)| *s == strategy)
        .unwrap_or(0);
    let (_, months) = simulations.swap_remove(position);

    let totals: CompensationLine = months
        .iter()
        .map(|m| CompensationLine {
            gross: m.gross,
            insurance: m.insurance,
            tax: m.tax,
            net: m.net,
        })
        .sum();
    let breakdown = category_breakdown(regimes, monthly_input, &months, totals.gross);
    let reconciliation = reconcile(regimes, monthly_input, &months);

    EnhancedAnnualCompensation {
        strategy,
        totals,
        breakdown,
        savings: SavingsSuggestion::from_yearly_net(totals.net),
        tax_optimization,
        reconciliation,
        months,
    }
}

/// Places every bonus into calendar months.  The returned array is
/// indexed by `month - 1`.  Amounts that do not split evenly leave
/// their remainder in the last month they are paid in, so the bonus
/// total is the same under every strategy.
pub fn distribute_bonuses(
    bonuses: &EnhancedBonusInput,
    strategy: DistributionStrategy,
) -> [Vec<(BonusKind, i64)>; MONTHS] {
    let mut months: [Vec<(BonusKind, i64)>; MONTHS] = Default::default();
    for (kind, amount) in bonuses.amounts() {
        let schedule: &[u8] = match (strategy, kind) {
            (DistributionStrategy::Even, _) => &ALL_MONTHS,
            (DistributionStrategy::Concentrated, BonusKind::Tet) => &[TET_MONTH],
            (DistributionStrategy::Concentrated, _) => &[YEAR_END_MONTH],
            (DistributionStrategy::Quarterly, BonusKind::Kpi)
            | (DistributionStrategy::Quarterly, BonusKind::Performance)
            | (DistributionStrategy::Quarterly, BonusKind::Quarterly) => &QUARTER_ENDS,
            (DistributionStrategy::Quarterly, BonusKind::Project) => &[PROJECT_MONTH],
            (DistributionStrategy::Quarterly, BonusKind::Tet) => &[TET_MONTH],
            (DistributionStrategy::Quarterly, BonusKind::Commission) => &ALL_MONTHS,
            (DistributionStrategy::Quarterly, _) => &[YEAR_END_MONTH],
        };
        spread(&mut months, kind, amount, schedule);
    }
    months
}

fn spread(months: &mut [Vec<(BonusKind, i64)>; MONTHS], kind: BonusKind, amount: i64, schedule: &[u8]) {
    if amount == 0 || schedule.is_empty() {
        return;
    }
    let count = schedule.len() as i64;
    let share = amount / count;
    let remainder = amount - share * count;
    let last = schedule.len() - 1;
    for (i, &month) in schedule.iter().enumerate() {
        let portion = if i == last { share + remainder } else { share };
        if portion != 0 {
            months[usize::from(month) - 1].push((kind, portion));
        }
    }
}

/// Runs the gross to net transform for each month under `strategy`.
pub fn simulate_year(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    bonuses: &EnhancedBonusInput,
    strategy: DistributionStrategy,
) -> Vec<MonthlyBreakdown> {
    let base_gross = monthly_input.salary;
    let standalone = SalaryInput {
        dependents: 0,
        ..*monthly_input
    };
    distribute_bonuses(bonuses, strategy)
        .into_iter()
        .zip(ALL_MONTHS)
        .map(|(paid, month)| {
            let bonuses: Vec<MonthlyBonus> = paid
                .into_iter()
                .map(|(kind, amount)| MonthlyBonus {
                    kind,
                    amount,
                    tax: calculate_net_from_gross(regimes, &standalone.with_salary(amount))
                        .tax
                        .tax,
                })
                .collect();
            let gross = bonuses
                .iter()
                .map(|b| b.amount)
                .fold(base_gross, i64::saturating_add);
            let result = calculate_net_from_gross(regimes, &monthly_input.with_salary(gross));
            MonthlyBreakdown {
                month,
                base_gross,
                bonuses,
                gross,
                insurance: result.insurance.total,
                tax: result.tax.tax,
                net: result.net,
                tax_bracket: result.tax.bracket,
            }
        })
        .collect()
}

fn sum_months(months: &[MonthlyBreakdown], field: impl Fn(&MonthlyBreakdown) -> i64) -> i64 {
    months.iter().map(field).fold(0, i64::saturating_add)
}

fn compare_strategies(
    current: DistributionStrategy,
    simulations: &[(DistributionStrategy, Vec<MonthlyBreakdown>)],
) -> TaxOptimization {
    let totals: Vec<(DistributionStrategy, i64, i64)> = simulations
        .iter()
        .map(|(strategy, months)| {
            (*strategy, sum_months(months, |m| m.tax), sum_months(months, |m| m.net))
        })
        .collect();
    let worst_tax = totals.iter().map(|&(_, tax, _)| tax).max().unwrap_or(0);
    let outcomes: Vec<StrategyOutcome> = totals
        .into_iter()
        .map(|(strategy, total_tax, total_net)| StrategyOutcome {
            strategy,
            total_tax,
            total_net,
            savings_vs_worst: worst_tax - total_tax,
        })
        .collect();

    // `min_by_key` keeps the first minimum, which breaks ties in
    // declaration order.
    let optimal = outcomes.iter().min_by_key(|o| o.total_tax).copied();
    let (currents, alternative_strategies): (Vec<StrategyOutcome>, Vec<StrategyOutcome>) =
        outcomes.into_iter().partition(|o| o.strategy == current);
    let current_strategy = currents.into_iter().next().or(optimal).unwrap_or(StrategyOutcome {
        strategy: current,
        total_tax: 0,
        total_net: 0,
        savings_vs_worst: 0,
    });
    let optimal = optimal.unwrap_or(current_strategy);

    TaxOptimization {
        potential_savings: current_strategy.total_tax - optimal.total_tax,
        current_strategy,
        alternative_strategies,
        optimal_strategy: optimal.strategy,
    }
}

fn category_breakdown(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    months: &[MonthlyBreakdown],
    total_gross: i64,
) -> Vec<BreakdownEntry> {
    let base = calculate_net_from_gross(regimes, monthly_input);
    let regular = CompensationLine {
        gross: base.gross,
        insurance: base.insurance.total,
        tax: base.tax.tax,
        net: base.net,
    }
    .times(MONTHS as i64);

    let mut lines: Vec<(&str, CompensationLine)> = vec![("Regular salary", regular)];
    for (kind, _) in EnhancedBonusInput::default().amounts() {
        let line: CompensationLine = months
            .iter()
            .flat_map(|m| m.bonuses.iter())
            .filter(|b| b.kind == kind)
            .map(|b| CompensationLine {
                gross: b.amount,
                insurance: 0,
                tax: b.tax,
                net: b.amount - b.tax,
            })
            .sum();
        lines.push((kind.label(), line));
    }
    build_breakdown(lines, total_gross)
}

fn reconcile(
    regimes: &TaxRegimes,
    monthly_input: &SalaryInput,
    months: &[MonthlyBreakdown],
) -> YearEndReconciliation {
    let regime = regimes.for_year(monthly_input.year);
    let months_in_year = months.len() as i64;
    let annual_gross = sum_months(months, |m| m.gross);
    let annual_insurance = sum_months(months, |m| m.insurance);
    let annual_deductions = calculate_deductions(regime, monthly_input.dependents)
        .total
        .saturating_mul(months_in_year);
    let annual_exemptions = monthly_input.exemptions.saturating_mul(months_in_year);
    let annual_taxable_income = annual_gross
        .saturating_sub(annual_insurance)
        .saturating_sub(annual_deductions)
        .saturating_sub(annual_exemptions)
        .max(0);
    let annual = calculate_annual_tax(regime, annual_taxable_income);
    let withheld_tax = sum_months(months, |m| m.tax);
    let difference = withheld_tax - annual.tax;

    YearEndReconciliation {
        annual_gross,
        annual_insurance,
        annual_deductions,
        annual_exemptions,
        annual_taxable_income,
        annual_tax: annual.tax,
        annual_tax_bracket: annual.bracket,
        withheld_tax,
        difference,
        annual_effective_rate: ratio(annual.tax, annual_gross),
        withheld_effective_rate: ratio(withheld_tax, annual_gross),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use proptest::prelude::*;

    fn monthly() -> SalaryInput {
        SalaryInput::new(20_000_000, 0, Region::I)
    }

    fn year_end_bonuses(strategy: DistributionStrategy) -> EnhancedBonusInput {
        EnhancedBonusInput {
            thirteenth_month: 20_000_000,
            kpi: 30_000_000,
            distribution_strategy: strategy,
            ..Default::default()
        }
    }

    #[test]
    fn no_bonuses_means_twelve_identical_months() {
        let result = calculate_enhanced_annual_compensation(
            &TaxRegimes::builtin(),
            &monthly(),
            &EnhancedBonusInput::default(),
        );
        assert_eq!(result.months.len(), 12);
        assert!(result.months.iter().all(|m| m.net == 17_460_000 && m.bonuses.is_empty()));
        assert_eq!(result.totals.tax, 440_000 * 12);
        assert_eq!(result.reconciliation.difference, 0);
        assert_eq!(result.tax_optimization.potential_savings, 0);
        assert_eq!(result.tax_optimization.optimal_strategy, DistributionStrategy::Even);
    }

    #[test]
    fn quarterly_schedule_places_each_bonus() {
        let bonuses = EnhancedBonusInput {
            thirteenth_month: 12,
            tet: 5,
            kpi: 8,
            project: 7,
            commission: 24,
            distribution_strategy: DistributionStrategy::Quarterly,
            ..Default::default()
        };
        let months = distribute_bonuses(&bonuses, DistributionStrategy::Quarterly);
        assert_eq!(months[0], vec![(BonusKind::Tet, 5), (BonusKind::Commission, 2)]);
        assert_eq!(months[2], vec![(BonusKind::Kpi, 2), (BonusKind::Commission, 2)]);
        assert_eq!(
            months[5],
            vec![(BonusKind::Kpi, 2), (BonusKind::Project, 7), (BonusKind::Commission, 2)]
        );
        assert_eq!(
            months[11],
            vec![
                (BonusKind::ThirteenthMonth, 12),
                (BonusKind::Kpi, 2),
                (BonusKind::Commission, 2)
            ]
        );
        assert_eq!(months[1], vec![(BonusKind::Commission, 2)]);
    }

    #[test]
    fn concentrated_pays_all_but_tet_in_december() {
        let bonuses = EnhancedBonusInput {
            tet: 3_000_000,
            quarterly: 4_000_000,
            commission: 6_000_000,
            ..Default::default()
        };
        let months = distribute_bonuses(&bonuses, DistributionStrategy::Concentrated);
        assert_eq!(months[0], vec![(BonusKind::Tet, 3_000_000)]);
        assert_eq!(
            months[11],
            vec![(BonusKind::Quarterly, 4_000_000), (BonusKind::Commission, 6_000_000)]
        );
        assert!(months[1..11].iter().all(Vec::is_empty));
    }

    #[test]
    fn even_split_leaves_remainder_in_december() {
        let bonuses = EnhancedBonusInput {
            kpi: 1_000_007,
            ..Default::default()
        };
        let months = distribute_bonuses(&bonuses, DistributionStrategy::Even);
        assert_eq!(months[0], vec![(BonusKind::Kpi, 83_333)]);
        assert_eq!(months[11], vec![(BonusKind::Kpi, 83_333 + 11)]);
    }

    #[test]
    fn spreading_bonuses_beats_concentrating_them() {
        let regimes = TaxRegimes::builtin();
        let result = calculate_enhanced_annual_compensation(
            &regimes,
            &monthly(),
            &year_end_bonuses(DistributionStrategy::Concentrated),
        );
        let december = &result.months[11];
        assert_eq!(december.gross, 70_000_000);
        assert_eq!(december.insurance, 5_146_000);
        assert_eq!(december.tax, 10_306_200);
        assert_eq!(december.tax_bracket, 6);
        assert_eq!(result.totals.tax, 440_000 * 11 + 10_306_200);

        let optimization = &result.tax_optimization;
        assert_eq!(optimization.current_strategy.strategy, DistributionStrategy::Concentrated);
        assert_eq!(optimization.current_strategy.savings_vs_worst, 0);
        assert_eq!(optimization.optimal_strategy, DistributionStrategy::Even);
        assert!(optimization.potential_savings > 0);
        let strategies: Vec<DistributionStrategy> = optimization
            .alternative_strategies
            .iter()
            .map(|o| o.strategy)
            .collect();
        assert_eq!(strategies, vec![DistributionStrategy::Even, DistributionStrategy::Quarterly]);
        let even = optimization.alternative_strategies[0];
        assert_eq!(even.savings_vs_worst, optimization.potential_savings);
    }

    #[test]
    fn concentrated_withholding_is_refunded_at_year_end() {
        let result = calculate_enhanced_annual_compensation(
            &TaxRegimes::builtin(),
            &monthly(),
            &year_end_bonuses(DistributionStrategy::Concentrated),
        );
        let rec = result.reconciliation;
        assert_eq!(rec.annual_gross, 290_000_000);
        assert_eq!(rec.annual_insurance, 2_100_000 * 11 + 5_146_000);
        assert_eq!(rec.annual_deductions, 132_000_000);
        assert_eq!(rec.annual_taxable_income, 129_754_000);
        assert_eq!(rec.annual_tax, 10_463_100);
        assert_eq!(rec.withheld_tax, 15_146_200);
        assert_eq!(rec.difference, 4_683_100);
    }

    #[test]
    fn standalone_bonus_tax_drops_dependents_but_keeps_exemptions() {
        let regimes = TaxRegimes::builtin();
        let input = SalaryInput::new(20_000_000, 1, Region::I).with_exemptions(2_000_000);
        let bonuses = EnhancedBonusInput {
            project: 30_000_000,
            ..Default::default()
        };
        let months = simulate_year(&regimes, &input, &bonuses, DistributionStrategy::Quarterly);
        let standalone = calculate_net_from_gross(
            &regimes,
            &SalaryInput::new(30_000_000, 0, Region::I).with_exemptions(2_000_000),
        );
        // 30M - 3.15M insurance - 11M - 2M exemptions = 13.85M taxable.
        assert_eq!(standalone.tax.taxable_income, 13_850_000);
        assert_eq!(months[5].bonuses[0].tax, standalone.tax.tax);
    }

    #[test]
    fn huge_salary_saturates_yearly_sums() {
        let result = calculate_enhanced_annual_compensation(
            &TaxRegimes::builtin(),
            &SalaryInput::new(i64::MAX / 10, 0, Region::I),
            &EnhancedBonusInput::default(),
        );
        assert_eq!(result.totals.gross, i64::MAX);
        assert_eq!(result.reconciliation.annual_gross, i64::MAX);
        assert!(result.reconciliation.annual_tax > 0);
    }

    #[test]
    fn zero_salary_and_bonuses_default_rates_to_zero() {
        let result = calculate_enhanced_annual_compensation(
            &TaxRegimes::builtin(),
            &SalaryInput::new(0, 0, Region::IV),
            &EnhancedBonusInput::default(),
        );
        assert_eq!(result.reconciliation.annual_gross, 0);
        assert_eq!(result.reconciliation.annual_effective_rate, 0.0);
        assert_eq!(result.reconciliation.withheld_effective_rate, 0.0);
        assert!(result.breakdown.is_empty());
    }

    fn any_bonuses() -> impl Strategy<Value = EnhancedBonusInput> {
        (
            0i64..60_000_000,
            0i64..60_000_000,
            0i64..60_000_000,
            0i64..60_000_000,
            0i64..60_000_000,
            0i64..60_000_000,
            0i64..60_000_000,
        )
            .prop_map(
                |(thirteenth_month, tet, kpi, performance, quarterly, project, commission)| {
                    EnhancedBonusInput {
                        thirteenth_month,
                        tet,
                        kpi,
                        performance,
                        quarterly,
                        project,
                        commission,
                        distribution_strategy: DistributionStrategy::Even,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn bonus_mass_is_strategy_invariant(bonuses in any_bonuses()) {
            for strategy in DistributionStrategy::ALL {
                let placed: i64 = distribute_bonuses(&bonuses, strategy)
                    .iter()
                    .flatten()
                    .map(|(_, amount)| amount)
                    .sum();
                prop_assert_eq!(placed, bonuses.total());
            }
        }

        #[test]
        fn breakdown_percentages_sum_to_one_hundred(
            bonuses in any_bonuses(),
            salary in 1i64..80_000_000,
            strategy in prop::sample::select(DistributionStrategy::ALL.to_vec()),
            year in prop::sample::select(vec![2025u16, 2026]),
        ) {
            let bonuses = EnhancedBonusInput { distribution_strategy: strategy, ..bonuses };
            let result = calculate_enhanced_annual_compensation(
                &TaxRegimes::builtin(),
                &SalaryInput::new(salary, 2, Region::III).with_year(year),
                &bonuses,
            );
            let gross: i64 = result.breakdown.iter().map(|e| e.gross).sum();
            prop_assert_eq!(gross, result.totals.gross);
            let sum: f64 = result.breakdown.iter().map(|e| e.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 1e-6);
        }

        #[test]
        fn yearly_gross_is_strategy_invariant(
            bonuses in any_bonuses(),
            salary in 0i64..80_000_000,
        ) {
            let regimes = TaxRegimes::builtin();
            let input = SalaryInput::new(salary, 1, Region::II);
            for strategy in DistributionStrategy::ALL {
                let months = simulate_year(&regimes, &input, &bonuses, strategy);
                let gross: i64 = months.iter().map(|m| m.gross).sum();
                prop_assert_eq!(gross, salary * 12 + bonuses.total());
            }
        }
    }
}
