use super::builder::ConstraintModel;
use super::solver::SolveOutcome;
use super::Assignment;

/// Projection des arcs d'éligibilité saturés, dans l'ordre du réseau.
pub fn extract_assignments(model: &ConstraintModel<'_>, outcome: &SolveOutcome) -> Vec<Assignment> {
    model
        .network
        .eligibility()
        .iter()
        .filter(|elig| outcome.flow_on(elig.edge) > 0)
        .map(|elig| Assignment {
            staff_id: model.staff[elig.staff].id.clone(),
            shift_id: model.shifts[elig.shift].id.clone(),
        })
        .collect()
}
