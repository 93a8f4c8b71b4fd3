//! Admission policies applied before any provider is contacted: rate
//! limiting, budget resolution, cost estimation, and redaction.

pub mod budget;
pub mod cost;
pub mod limiter;
pub mod redaction;

pub use budget::{resolve_budget, BudgetDecision};
pub use cost::CostEstimator;
pub use limiter::RateLimiter;
pub use redaction::Redactor;
