mod budget;
mod builder;
mod extract;
mod network;
mod repair;
mod report;
mod solver;
mod types;
mod util;
mod validate;
mod verify;

pub use budget::{Budget, CancelToken, Interruption};
pub use builder::{build_model, check_eligibility, ConstraintModel, Ineligibility};
pub use extract::extract_assignments;
pub use network::{Edge, EdgeId, Eligibility, FlowNetwork, GroupEdge, NodeId, NodeKind};
pub use report::{bottlenecks, feasibility_gaps, workload};
pub use solver::{residual_reachable, solve, SolveOutcome, Termination};
pub use types::{
    Assignment, Bottleneck, BottleneckKind, FeasibilityGap, GapReason, ResolveError,
    ResolveResponse, ResolveStatus, ResolverOptions, StaffLoad, WorkloadSummary,
};
pub use verify::{detect_conflicts, verify, Conflict, ConflictKind};

use crate::model::ResolveRequest;
use rayon::prelude::*;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Résolveur : construction → flot → extraction/diagnostic, sans état partagé
/// entre deux requêtes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Résout avec le budget de `ResolverOptions::time_budget_ms`.
    pub fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse, ResolveError> {
        self.resolve_with_budget(request, &Budget::from_millis(self.options.time_budget_ms))
    }

    pub fn resolve_with_budget(
        &self,
        request: &ResolveRequest,
        budget: &Budget,
    ) -> Result<ResolveResponse, ResolveError> {
        let run = Uuid::new_v4();
        let span = info_span!("resolve", %run);
        let _guard = span.enter();

        let mut model = build_model(request, &self.options)?;
        info!(
            staff = model.staff().len(),
            shifts = model.shifts().len(),
            eligible = model.eligible_pairs(),
            "model ready"
        );

        let outcome = repair::solve_repaired(&mut model, budget)?;
        let assignments = extract_assignments(&model, &outcome);
        if self.options.verify {
            verify(&model, &outcome, &assignments)?;
        }

        let gaps = feasibility_gaps(&model, &outcome);
        let status = if outcome.is_interrupted() {
            ResolveStatus::TimedOut
        } else if gaps.is_empty() {
            ResolveStatus::Feasible
        } else {
            ResolveStatus::Partial
        };
        let bottlenecks = if status == ResolveStatus::Feasible {
            Vec::new()
        } else {
            bottlenecks(&model, &outcome)
        };
        let workload = workload(&model, &assignments);

        if let Termination::Interrupted(reason) = outcome.termination {
            warn!(%reason, covered = outcome.value, "resolution interrupted, result is partial");
        }
        info!(%status, covered = outcome.value, gaps = gaps.len(), cost = outcome.cost, "resolved");

        Ok(ResolveResponse {
            status,
            assignments,
            gaps,
            covered_headcount: u64::try_from(outcome.value).unwrap_or(0),
            required_headcount: u64::try_from(model.network().total_demand()).unwrap_or(0),
            total_cost: outcome.cost,
            bottlenecks,
            workload,
        })
    }

    /// Requêtes indépendantes résolues en parallèle ; l'ordre des résultats
    /// suit celui des requêtes.
    pub fn resolve_batch(
        &self,
        requests: &[ResolveRequest],
    ) -> Vec<Result<ResolveResponse, ResolveError>> {
        requests.par_iter().map(|r| self.resolve(r)).collect()
    }
}

/// Raccourci avec les options par défaut.
pub fn resolve(request: &ResolveRequest) -> Result<ResolveResponse, ResolveError> {
    Resolver::default().resolve(request)
}
