//! Criteria evaluation.
//!
//! Turns a definition's criteria tree plus the scan's test results into a
//! definition-level verdict. Evaluation is pure and runs only after every
//! check has completed.

pub mod evaluator;

pub use evaluator::{evaluate, CriteriaOutcome, ResultIndex};
