//! Diagnostic de faisabilité, dérivé uniquement de l'état du réseau résolu.

use super::builder::ConstraintModel;
use super::network::NodeKind;
use super::solver::{residual_reachable, SolveOutcome};
use super::{
    Assignment, Bottleneck, BottleneckKind, FeasibilityGap, GapReason, StaffLoad, WorkloadSummary,
};
use std::collections::BTreeSet;

/// Un écart par garde dont la couverture est inférieure à l'effectif requis,
/// dans l'ordre des gardes du réseau.
pub fn feasibility_gaps(model: &ConstraintModel<'_>, outcome: &SolveOutcome) -> Vec<FeasibilityGap> {
    let net = &model.network;
    let mut gaps = Vec::new();

    for (ti, shift) in model.shifts.iter().enumerate() {
        let required = net.edge(net.demand_edge(ti)).capacity;
        let covered = outcome.flow_on(net.demand_edge(ti));
        if covered >= required {
            continue;
        }

        let mut reasons = BTreeSet::new();
        let mut any_eligible = false;
        let mut unused_eligible = false;
        for elig in net.eligibility_for_shift(ti) {
            any_eligible = true;
            if outcome.flow_on(elig.edge) > 0 {
                continue;
            }
            unused_eligible = true;
            let saturated = |e: usize| outcome.flow_on(e) >= net.edge(e).capacity;
            // Quota, plafond de groupe, clique de repos ou couple exclu :
            // la chaîne qui alimente la garde est pleine.
            let exhausted = saturated(elig.edge)
                || elig.block_edge.is_some_and(saturated)
                || saturated(elig.group_edge)
                || net.quota_edges(elig.staff).iter().all(|&e| saturated(e));
            if exhausted {
                reasons.insert(GapReason::CapacityExhausted);
            } else {
                reasons.insert(GapReason::Contended);
            }
        }
        if !any_eligible {
            reasons.insert(GapReason::NoEligibleStaff);
        } else if !unused_eligible {
            reasons.insert(GapReason::InsufficientEligibleStaff);
        }

        let reason = reasons
            .iter()
            .next()
            .copied()
            .unwrap_or(GapReason::NoEligibleStaff);
        gaps.push(FeasibilityGap {
            shift_id: shift.id.clone(),
            required: clamp_u32(required),
            covered: clamp_u32(covered),
            unmet: clamp_u32(required - covered),
            reason,
            reasons: reasons.into_iter().collect(),
        });
    }
    gaps
}

/// Analyse de coupe : côté source du graphe résiduel.
pub fn bottlenecks(model: &ConstraintModel<'_>, outcome: &SolveOutcome) -> Vec<Bottleneck> {
    let net = &model.network;
    let reach = residual_reachable(net, &outcome.flow);
    let mut out = Vec::new();

    for (ti, shift) in model.shifts.iter().enumerate() {
        let demand = net.demand_edge(ti);
        let unmet = outcome.flow_on(demand) < net.edge(demand).capacity;
        if unmet && !reach[net.shift_node(ti)] {
            out.push(Bottleneck {
                kind: BottleneckKind::UncoveredShift,
                staff_id: None,
                shift_id: Some(shift.id.clone()),
                group: None,
            });
        }
    }

    for (si, member) in model.staff.iter().enumerate() {
        if net.quota_edges(si).is_empty() {
            continue;
        }
        if !reach[net.staff_node(si)] {
            out.push(Bottleneck {
                kind: BottleneckKind::StaffQuotaSaturated,
                staff_id: Some(member.id.clone()),
                shift_id: None,
                group: None,
            });
        }
    }

    for group in net.group_edges() {
        let edge = net.edge(group.edge);
        if reach[edge.from] && !reach[edge.to] {
            debug_assert!(matches!(net.node(edge.to), NodeKind::StaffGroup { .. }));
            out.push(Bottleneck {
                kind: BottleneckKind::StaffGroupSaturated,
                staff_id: Some(model.staff[group.staff].id.clone()),
                shift_id: None,
                group: group.label.clone(),
            });
        }
    }
    out
}

/// Rapport d'équité : gardes et minutes par membre, moyenne, écart type.
pub fn workload(model: &ConstraintModel<'_>, assignments: &[Assignment]) -> WorkloadSummary {
    let per_staff: Vec<StaffLoad> = model
        .staff
        .iter()
        .map(|member| {
            let mine = assignments.iter().filter(|a| a.staff_id == member.id);
            let mut assigned = 0u32;
            let mut minutes = 0i64;
            for a in mine {
                assigned += 1;
                if let Some(shift) = model.request.find_shift(&a.shift_id) {
                    minutes += shift.duration_minutes();
                }
            }
            StaffLoad {
                staff_id: member.id.clone(),
                assigned,
                assigned_minutes: minutes,
                quota: member.quota,
            }
        })
        .collect();

    let total: u32 = per_staff.iter().map(|l| l.assigned).sum();
    let count = per_staff.len();
    let (mean, std_dev) = if count == 0 {
        (0.0, 0.0)
    } else {
        let mean = f64::from(total) / count as f64;
        let variance = per_staff
            .iter()
            .map(|l| (f64::from(l.assigned) - mean).powi(2))
            .sum::<f64>()
            / count as f64;
        (mean, variance.sqrt())
    };

    WorkloadSummary {
        total_assignments: total,
        staff_count: u32::try_from(count).unwrap_or(u32::MAX),
        mean_per_staff: round2(mean),
        std_dev: round2(std_dev),
        per_staff,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn clamp_u32(x: i64) -> u32 {
    u32::try_from(x.max(0)).unwrap_or(u32::MAX)
}
