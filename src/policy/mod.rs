//! Decision authority for approval steps.
//!
//! The evaluator answers "may this actor approve or reject this step?"
//! using identity matching and the actor's optional capability facets.

pub mod evaluator;

pub use evaluator::PolicyEvaluator;
