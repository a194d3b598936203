// One file per handler, grouped by surface: rule administration under
// /api/gift-rules, the evaluator invocations under /api/rewards.
pub mod rewards;
pub mod rules;
