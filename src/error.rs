//! Error types for the Salary Engine.
//!
//! The calculators themselves never fail: they clamp and default
//! instead.  Errors only arise at the edges, when a tax regime is
//! loaded from configuration or when a caller hands the engine an
//! input record that violates its contract.

use thiserror::Error;

/// Problems found while validating a [`TaxRegime`](crate::regime::TaxRegime).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimeError {
    /// The bracket table is empty.
    #[error("regime {year} has no tax brackets")]
    NoBrackets { year: u16 },

    /// Ceilings must strictly increase from one bracket to the next.
    #[error("regime {year}: bracket {index} ceiling does not exceed the previous ceiling")]
    UnorderedBrackets { year: u16, index: usize },

    /// Only the top bracket may omit its ceiling.
    #[error("regime {year}: bracket {index} is unbounded but is not the last bracket")]
    UnboundedBracket { year: u16, index: usize },

    /// The top bracket has a ceiling, leaving higher incomes unclassified.
    #[error("regime {year}: the last bracket must be unbounded")]
    BoundedTopBracket { year: u16 },

    /// A tax or contribution rate is not a fraction between 0 and 1.
    #[error("regime {year}: rate {rate} is outside the range 0..=1")]
    InvalidRate { year: u16, rate: f64 },

    /// The top marginal rate plus the employee insurance rate must stay
    /// below one half, otherwise `2 × net` no longer brackets the gross
    /// salary during net to gross inversion.
    #[error("regime {year}: top tax rate plus employee insurance is {burden}, must stay below 0.5")]
    ExcessiveBurden { year: u16, burden: f64 },

    /// An insurance base or cap is zero or negative.
    #[error("regime {year}: {field} must be positive")]
    NonPositiveAmount { year: u16, field: &'static str },
}

/// Contract violations in caller-supplied input records.
///
/// The pure calculators do not check for these; behaviour on such
/// input is unspecified.  Boundary layers (the HTTP API) call the
/// `validate` method on each input before invoking the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("salary must not be negative, got {0}")]
    NegativeSalary(i64),

    #[error("exemptions must not be negative, got {0}")]
    NegativeExemptions(i64),

    #[error("{kind} must not be negative, got {amount}")]
    NegativeBonus { kind: &'static str, amount: i64 },

    #[error("raise must be a finite percentage above -100, got {0}")]
    InvalidRaise(f64),

    #[error("projection horizon must be between 1 and {max} years, got {years}")]
    InvalidHorizon { years: u32, max: u32 },
}
