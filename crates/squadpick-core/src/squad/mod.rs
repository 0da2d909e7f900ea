// Squad optimizer: game rules, pre-solve checks, candidate pruning, the
// integer program and plan assembly.

pub mod feasibility;
pub mod optimizer;
pub mod plan;
pub mod prune;
pub mod rules;
