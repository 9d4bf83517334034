//! Salary Engine library crate.
//!
//! This crate computes Vietnamese personal-income figures: gross to
//! net salary and back, statutory insurance, progressive income tax,
//! annual compensation with bonuses, bonus-timing comparisons and
//! multi-year salary growth.  Every calculator is a pure function of its
//! inputs and an injected [`regime::TaxRegimes`]; the `api` module
//! serves them over HTTP.

pub mod models;
pub mod error;
pub mod regime;
pub mod insurance;
pub mod tax;
pub mod engine;
pub mod annual;
pub mod enhanced;
pub mod growth;
pub mod config;
pub mod api;
