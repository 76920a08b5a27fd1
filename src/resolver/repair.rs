//! Réparation après résolution. Deux règles échappent au réseau : le repos
//! entre gardes de cliques voisines et le plafond d'heures exact. Une
//! violation exclut un couple (membre, garde), choisi en relançant la
//! recherche pour chaque candidat, puis la boucle recommence.

use super::budget::Budget;
use super::builder::ConstraintModel;
use super::network::{EdgeId, FlowNetwork};
use super::solver::{solve, SolveOutcome};
use super::{util, ResolveError};
use std::cmp::Reverse;
use tracing::debug;

pub(crate) fn solve_repaired(
    model: &mut ConstraintModel<'_>,
    budget: &Budget,
) -> Result<SolveOutcome, ResolveError> {
    let mut outcome = solve(&model.network, budget)?;
    let mut exclusions = 0usize;

    loop {
        if outcome.is_interrupted() {
            release_violations(model, &mut outcome);
            return Ok(outcome);
        }
        let Some(candidates) = find_violation(model, &outcome) else {
            if exclusions > 0 {
                debug!(exclusions, value = outcome.value, "repair finished");
            }
            return Ok(outcome);
        };

        let mut best: Option<(usize, SolveOutcome)> = None;
        for idx in candidates {
            let mut trial = model.network.clone();
            exclude(&mut trial, idx);
            let attempt = solve(&trial, budget)?;
            if attempt.is_interrupted() {
                release_violations(model, &mut outcome);
                outcome.termination = attempt.termination;
                return Ok(outcome);
            }
            let better = match &best {
                None => true,
                Some((_, current)) => improves(&attempt, current),
            };
            if better {
                best = Some((idx, attempt));
            }
        }

        let Some((idx, next)) = best else {
            return Ok(outcome);
        };
        exclude(&mut model.network, idx);
        exclusions += 1;
        debug!(
            staff = %model.staff[model.network.eligibility[idx].staff].id,
            shift = %model.shifts[model.network.eligibility[idx].shift].id,
            value = next.value,
            "pair excluded"
        );
        outcome = next;
    }
}

/// Couverture d'abord, coût ensuite ; à égalité le premier candidat reste.
fn improves(candidate: &SolveOutcome, current: &SolveOutcome) -> bool {
    candidate.value > current.value
        || (candidate.value == current.value && candidate.cost < current.cost)
}

fn exclude(net: &mut FlowNetwork, eligibility: usize) {
    let edge = net.eligibility[eligibility].edge;
    net.edges[edge].capacity = 0;
}

/// Première violation trouvée (membres dans l'ordre du réseau), sous forme
/// d'indices d'éligibilité candidats à l'exclusion, par ordre de préférence :
/// la garde la plus tardive d'un conflit de repos, les plus longues gardes
/// d'un dépassement d'heures.
fn find_violation(model: &ConstraintModel<'_>, outcome: &SolveOutcome) -> Option<Vec<usize>> {
    let net = &model.network;
    let mut used: Vec<Vec<usize>> = vec![Vec::new(); model.staff.len()];
    for (idx, elig) in net.eligibility.iter().enumerate() {
        if outcome.flow_on(elig.edge) > 0 {
            used[elig.staff].push(idx);
        }
    }

    for (si, member) in model.staff.iter().enumerate() {
        let mine = &mut used[si];
        if mine.is_empty() {
            continue;
        }
        let shift_of = |idx: usize| model.shifts[net.eligibility[idx].shift];
        mine.sort_by_key(|&idx| (shift_of(idx).start, shift_of(idx).end, idx));

        for (k, &a) in mine.iter().enumerate() {
            for &b in &mine[k + 1..] {
                if util::rest_conflict(
                    &shift_of(a).window(),
                    &shift_of(b).window(),
                    member.min_rest_minutes,
                ) {
                    return Some(vec![b, a]);
                }
            }
        }

        if let Some(left) = member.remaining_minutes() {
            let total: i64 = mine.iter().map(|&idx| shift_of(idx).duration_minutes()).sum();
            if total > left {
                let mut candidates = mine.clone();
                candidates.sort_by_key(|&idx| (Reverse(shift_of(idx).duration_minutes()), idx));
                return Some(candidates);
            }
        }
    }
    None
}

/// Sans budget pour relancer : retire des unités de flot jusqu'à ce qu'il
/// ne reste aucune violation.
fn release_violations(model: &ConstraintModel<'_>, outcome: &mut SolveOutcome) {
    let net = &model.network;
    let mut released = false;
    while let Some(candidates) = find_violation(model, outcome) {
        let Some(&idx) = candidates.first() else {
            break;
        };
        let elig = net.eligibility[idx];
        let mut chain: Vec<EdgeId> = vec![elig.edge, elig.group_edge, net.demand_edge(elig.shift)];
        chain.extend(elig.block_edge);
        if let Some(&tier) = net
            .quota_edges(elig.staff)
            .iter()
            .rev()
            .find(|&&e| outcome.flow_on(e) > 0)
        {
            chain.push(tier);
        }
        for e in chain {
            outcome.flow[e] -= 1;
        }
        released = true;
    }

    if released {
        outcome.value = net
            .outgoing(net.source())
            .iter()
            .map(|&e| outcome.flow_on(e))
            .sum();
        outcome.cost = net
            .edges()
            .iter()
            .enumerate()
            .map(|(e, edge)| outcome.flow_on(e) * edge.cost)
            .sum();
        debug!(value = outcome.value, "violating assignments released");
    }
}
