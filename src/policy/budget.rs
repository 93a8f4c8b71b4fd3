//! Three-level budget resolution.
//!
//! Specificity order: route override, then tenant override, then the default
//! budget. An override replaces the budget wholesale (both `max_tokens` and
//! `max_cost_usd`), never field by field.

use crate::config::{Budget, BudgetsConfig};

/// The budget chosen for one request.
///
/// The `effective_*` fields start equal to the chosen budget and are the
/// values the orchestrator enforces; keeping them separate from the shared
/// config-derived `budget` lets per-request adjustments happen without
/// mutating configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetDecision {
    pub budget: Budget,
    pub source: BudgetSource,
    pub effective_max_tokens: u32,
    pub effective_max_cost_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetSource {
    Route,
    Tenant,
    Default,
}

/// Resolve the effective budget for a (tenant, route) pair.
pub fn resolve_budget(budgets: &BudgetsConfig, tenant_id: &str, route: &str) -> BudgetDecision {
    let (budget, source) = if let Some(budget) = budgets.routes.get(route) {
        (*budget, BudgetSource::Route)
    } else if let Some(budget) = budgets.tenants.get(tenant_id) {
        (*budget, BudgetSource::Tenant)
    } else {
        (budgets.default, BudgetSource::Default)
    };

    BudgetDecision {
        budget,
        source,
        effective_max_tokens: budget.max_tokens,
        effective_max_cost_usd: budget.max_cost_usd,
    }
}
