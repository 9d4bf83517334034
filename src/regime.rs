//! Tax regimes: bracket tables and statutory constants.
//!
//! A [`TaxRegime`] bundles everything that changes when the law
//! changes: the progressive bracket table, the family deductions,
//! insurance rates, caps and regional minimum wages.  Regimes are keyed
//! by the first tax year they apply to and collected in [`TaxRegimes`],
//! which callers pass into every calculator.  Nothing here is global,
//! so several regimes can coexist in one process.
//!
//! Two regimes are built in.  Host applications may override or extend
//! them with JSON files loaded through [`load_regimes_from_dir`].

use crate::error::RegimeError;
use crate::models::Region;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Tax year used when an input does not name one.
pub const DEFAULT_TAX_YEAR: u16 = 2025;

/// First year of the seven-tier schedule with the 11,000,000 personal
/// deduction.
pub const LEGACY_EFFECTIVE_YEAR: u16 = 2020;

/// First year of the five-tier schedule.
pub const REFORM_EFFECTIVE_YEAR: u16 = 2026;

const BASE_SALARY: i64 = 2_340_000;
const BHXH_BHYT_CAP_MULTIPLIER: i64 = 20;
const BHTN_CAP_MULTIPLIER: i64 = 20;

/// One row of a progressive schedule.
///
/// `deduction` is the cumulative amount that makes
/// `income × rate − deduction` equal the sum of the marginal tax of all
/// lower tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Inclusive ceiling of monthly taxable income; `None` for the top
    /// bracket.
    pub max: Option<i64>,
    pub rate: f64,
    pub deduction: i64,
}

impl TaxBracket {
    const fn new(max: i64, rate: f64, deduction: i64) -> Self {
        Self {
            max: Some(max),
            rate,
            deduction,
        }
    }

    const fn top(rate: f64, deduction: i64) -> Self {
        Self {
            max: None,
            rate,
            deduction,
        }
    }
}

/// Contribution rates for one payer (employee or employer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionRates {
    pub bhxh: f64,
    pub bhyt: f64,
    pub bhtn: f64,
    #[serde(default)]
    pub accident_fund: f64,
}

impl ContributionRates {
    fn rates(&self) -> [f64; 4] {
        [self.bhxh, self.bhyt, self.bhtn, self.accident_fund]
    }

    pub fn total(&self) -> f64 {
        self.rates().iter().sum()
    }
}

/// Monthly minimum wage for each region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalWages {
    pub i: i64,
    pub ii: i64,
    pub iii: i64,
    pub iv: i64,
}

impl RegionalWages {
    pub fn get(&self, region: Region) -> i64 {
        match region {
            Region::I => self.i,
            Region::II => self.ii,
            Region::III => self.iii,
            Region::IV => self.iv,
        }
    }
}

/// Statutory constants for a range of tax years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRegime {
    /// First tax year this regime applies to.
    pub effective_from: u16,
    pub personal_deduction: i64,
    /// Deduction per registered dependent.
    pub dependent_deduction: i64,
    /// Ascending brackets; the last one is unbounded.
    pub brackets: Vec<TaxBracket>,
    /// Statutory base salary the BHXH/BHYT cap derives from.
    pub base_salary: i64,
    /// Ceiling of the BHXH/BHYT contribution base.
    pub bhxh_bhyt_cap: i64,
    /// The BHTN base is capped at this multiple of the regional minimum wage.
    pub bhtn_cap_multiplier: i64,
    pub minimum_wages: RegionalWages,
    pub employee_rates: ContributionRates,
    pub employer_rates: ContributionRates,
}

impl TaxRegime {
    /// Seven-tier schedule in force until the end of 2025.
    pub fn legacy() -> Self {
        Self {
            effective_from: LEGACY_EFFECTIVE_YEAR,
            personal_deduction: 11_000_000,
            dependent_deduction: 4_400_000,
            brackets: vec![
                TaxBracket::new(5_000_000, 0.05, 0),
                TaxBracket::new(10_000_000, 0.10, 250_000),
                TaxBracket::new(18_000_000, 0.15, 750_000),
                TaxBracket::new(32_000_000, 0.20, 1_650_000),
                TaxBracket::new(52_000_000, 0.25, 3_250_000),
                TaxBracket::new(80_000_000, 0.30, 5_850_000),
                TaxBracket::top(0.35, 9_850_000),
            ],
            base_salary: BASE_SALARY,
            bhxh_bhyt_cap: BASE_SALARY * BHXH_BHYT_CAP_MULTIPLIER,
            bhtn_cap_multiplier: BHTN_CAP_MULTIPLIER,
            minimum_wages: RegionalWages {
                i: 4_960_000,
                ii: 4_410_000,
                iii: 3_860_000,
                iv: 3_450_000,
            },
            employee_rates: employee_rates(),
            employer_rates: employer_rates(),
        }
    }

    /// Five-tier schedule from 2026 with the raised family deductions.
    pub fn reform_2026() -> Self {
        Self {
            effective_from: REFORM_EFFECTIVE_YEAR,
            personal_deduction: 15_500_000,
            dependent_deduction: 6_200_000,
            brackets: vec![
                TaxBracket::new(10_000_000, 0.05, 0),
                TaxBracket::new(30_000_000, 0.10, 500_000),
                TaxBracket::new(60_000_000, 0.20, 3_500_000),
                TaxBracket::new(100_000_000, 0.30, 9_500_000),
                TaxBracket::top(0.35, 14_500_000),
            ],
            base_salary: BASE_SALARY,
            bhxh_bhyt_cap: BASE_SALARY * BHXH_BHYT_CAP_MULTIPLIER,
            bhtn_cap_multiplier: BHTN_CAP_MULTIPLIER,
            minimum_wages: RegionalWages {
                i: 5_310_000,
                ii: 4_730_000,
                iii: 4_140_000,
                iv: 3_700_000,
            },
            employee_rates: employee_rates(),
            employer_rates: employer_rates(),
        }
    }

    pub fn minimum_wage(&self, region: Region) -> i64 {
        self.minimum_wages.get(region)
    }

    pub fn bhtn_cap(&self, region: Region) -> i64 {
        self.minimum_wage(region) * self.bhtn_cap_multiplier
    }

    /// Returns the 1-indexed bracket number and row for a monthly
    /// taxable income.  Incomes above every ceiling fall into the last
    /// row.  `None` only for a table with no rows, which
    /// [`validate`](Self::validate) rejects.
    pub fn bracket_for(&self, taxable_income: i64) -> Option<(u8, &TaxBracket)> {
        let index = self
            .brackets
            .iter()
            .position(|b| b.max.map_or(true, |max| taxable_income <= max))
            .or_else(|| self.brackets.len().checked_sub(1))?;
        Some((index as u8 + 1, &self.brackets[index]))
    }

    pub fn validate(&self) -> Result<(), RegimeError> {
        let year = self.effective_from;
        if self.brackets.is_empty() {
            return Err(RegimeError::NoBrackets { year });
        }
        let last = self.brackets.len() - 1;
        let mut previous: Option<i64> = None;
        for (index, bracket) in self.brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                return Err(RegimeError::InvalidRate {
                    year,
                    rate: bracket.rate,
                });
            }
            match bracket.max {
                None if index != last => {
                    return Err(RegimeError::UnboundedBracket { year, index })
                }
                Some(_) if index == last => return Err(RegimeError::BoundedTopBracket { year }),
                Some(max) => {
                    if previous.is_some_and(|p| max <= p) {
                        return Err(RegimeError::UnorderedBrackets { year, index });
                    }
                    previous = Some(max);
                }
                None => {}
            }
        }
        for rate in self.employee_rates.rates().into_iter().chain(self.employer_rates.rates()) {
            if !(0.0..=1.0).contains(&rate) {
                return Err(RegimeError::InvalidRate { year, rate });
            }
        }
        let top_rate = self.brackets[last].rate;
        let burden = top_rate + self.employee_rates.total();
        if burden >= 0.5 {
            return Err(RegimeError::ExcessiveBurden { year, burden });
        }
        for (field, amount) in [
            ("base_salary", self.base_salary),
            ("bhxh_bhyt_cap", self.bhxh_bhyt_cap),
            ("bhtn_cap_multiplier", self.bhtn_cap_multiplier),
        ] {
            if amount <= 0 {
                return Err(RegimeError::NonPositiveAmount { year, field });
            }
        }
        Ok(())
    }
}

fn employee_rates() -> ContributionRates {
    ContributionRates {
        bhxh: 0.08,
        bhyt: 0.015,
        bhtn: 0.01,
        accident_fund: 0.0,
    }
}

fn employer_rates() -> ContributionRates {
    ContributionRates {
        bhxh: 0.17,
        bhyt: 0.03,
        bhtn: 0.01,
        accident_fund: 0.005,
    }
}

/// Validated, immutable set of regimes ordered by `effective_from`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxRegimes {
    regimes: Vec<TaxRegime>,
}

impl TaxRegimes {
    /// The built-in legacy and 2026 regimes.
    pub fn builtin() -> Self {
        Self {
            regimes: vec![TaxRegime::legacy(), TaxRegime::reform_2026()],
        }
    }

    /// Validates and adds a regime, returning the one it replaced.
    pub fn insert(&mut self, regime: TaxRegime) -> Result<Option<TaxRegime>, RegimeError> {
        regime.validate()?;
        match self
            .regimes
            .binary_search_by_key(&regime.effective_from, |r| r.effective_from)
        {
            Ok(index) => Ok(Some(std::mem::replace(&mut self.regimes[index], regime))),
            Err(index) => {
                self.regimes.insert(index, regime);
                Ok(None)
            }
        }
    }

    /// Regime in force for `year`: the newest one that started on or
    /// before it, or the oldest one for years before every regime.
    pub fn for_year(&self, year: Option<u16>) -> &TaxRegime {
        let year = year.unwrap_or(DEFAULT_TAX_YEAR);
        self.regimes
            .iter()
            .rev()
            .find(|r| r.effective_from <= year)
            .unwrap_or(&self.regimes[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxRegime> {
        self.regimes.iter()
    }
}

impl Default for TaxRegimes {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Load all regime definitions from a directory.
///
/// Every `.json` file is parsed as a [`TaxRegime`].  Files that fail to
/// parse are skipped with a warning; validation is left to
/// [`TaxRegimes::insert`].  A missing directory yields no regimes.
pub fn load_regimes_from_dir(path: &Path) -> Result<Vec<TaxRegime>> {
    let mut regimes = Vec::new();
    if !path.is_dir() {
        debug!(path = %path.display(), "regime directory not found");
        return Ok(regimes);
    }
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("reading regime directory {}", path.display()))?;
    for entry in entries {
        let entry = entry?;
        let file = entry.path();
        if !entry.file_type()?.is_file() || file.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let data = std::fs::read_to_string(&file)
            .with_context(|| format!("reading regime file {}", file.display()))?;
        match serde_json::from_str::<TaxRegime>(&data) {
            Ok(regime) => regimes.push(regime),
            Err(err) => warn!(file = %file.display(), error = %err, "skipping unparsable regime"),
        }
    }
    regimes.sort_by_key(|r| r.effective_from);
    Ok(regimes)
}
