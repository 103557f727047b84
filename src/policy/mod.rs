//! Lending policy evaluation: score to decision under a partner policy.

pub mod evaluator;
