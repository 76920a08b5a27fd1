//! Revérification des invariants après résolution. Toute violation est un
//! défaut du solveur, jamais un résultat à renvoyer.

use super::builder::ConstraintModel;
use super::solver::SolveOutcome;
use super::{util, Assignment, ResolveError};
use crate::model::{Shift, ShiftId, StaffId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Overlap,
    RestViolation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub staff: StaffId,
    pub shift_a: ShiftId,
    pub shift_b: ShiftId,
    pub kind: ConflictKind,
}

/// Conflits de chevauchement et de repos entre gardes d'un même membre,
/// gardes déjà tenues comprises.
pub fn detect_conflicts(model: &ConstraintModel<'_>, assignments: &[Assignment]) -> Vec<Conflict> {
    let shifts: HashMap<&ShiftId, &Shift> = model.shifts.iter().map(|s| (&s.id, *s)).collect();
    let mut out = Vec::new();

    for member in model.staff.iter() {
        let mut mine: Vec<&Shift> = assignments
            .iter()
            .filter(|a| a.staff_id == member.id)
            .filter_map(|a| shifts.get(&a.shift_id).copied())
            .collect();
        mine.sort_by_key(|s| s.start);

        for (idx, a) in mine.iter().enumerate() {
            for b in mine.iter().skip(idx + 1) {
                if a.window().overlaps(&b.window()) {
                    out.push(conflict(member.id.clone(), a, b, ConflictKind::Overlap));
                } else if util::rest_conflict(&a.window(), &b.window(), member.min_rest_minutes) {
                    out.push(conflict(member.id.clone(), a, b, ConflictKind::RestViolation));
                }
            }
            if member
                .committed
                .iter()
                .any(|c| util::rest_conflict(c, &a.window(), member.min_rest_minutes))
            {
                out.push(conflict(member.id.clone(), a, a, ConflictKind::RestViolation));
            }
        }
    }
    out
}

fn conflict(staff: StaffId, a: &Shift, b: &Shift, kind: ConflictKind) -> Conflict {
    Conflict {
        staff,
        shift_a: a.id.clone(),
        shift_b: b.id.clone(),
        kind,
    }
}

/// Capacités, conservation, quotas, effectifs et repos.
pub fn verify(
    model: &ConstraintModel<'_>,
    outcome: &SolveOutcome,
    assignments: &[Assignment],
) -> Result<(), ResolveError> {
    let net = &model.network;

    for (e, edge) in net.edges().iter().enumerate() {
        let f = outcome.flow_on(e);
        if f < 0 || f > edge.capacity {
            return Err(fault(format!(
                "edge {e} carries {f} outside capacity {}",
                edge.capacity
            )));
        }
    }

    for node in 0..net.node_count() {
        if node == net.source() || node == net.sink() {
            continue;
        }
        let inflow: i64 = net.incoming(node).iter().map(|&e| outcome.flow_on(e)).sum();
        let outflow: i64 = net.outgoing(node).iter().map(|&e| outcome.flow_on(e)).sum();
        if inflow != outflow {
            return Err(fault(format!(
                "flow not conserved at node {node}: in {inflow}, out {outflow}"
            )));
        }
    }

    let supplied: i64 = net.outgoing(net.source()).iter().map(|&e| outcome.flow_on(e)).sum();
    if supplied != outcome.value {
        return Err(fault(format!(
            "flow value {} differs from source outflow {supplied}",
            outcome.value
        )));
    }

    let mut per_staff: HashMap<&StaffId, u32> = HashMap::new();
    let mut per_shift: HashMap<&ShiftId, i64> = HashMap::new();
    for a in assignments {
        *per_staff.entry(&a.staff_id).or_insert(0) += 1;
        *per_shift.entry(&a.shift_id).or_insert(0) += 1;
    }
    for member in &model.staff {
        let count = per_staff.get(&member.id).copied().unwrap_or(0);
        if count > member.remaining_quota() {
            return Err(fault(format!(
                "staff {} assigned {count} shifts over remaining quota {}",
                member.id,
                member.remaining_quota()
            )));
        }
        if let Some(left) = member.remaining_minutes() {
            let used: i64 = assignments
                .iter()
                .filter(|a| a.staff_id == member.id)
                .filter_map(|a| model.shifts.iter().find(|s| s.id == a.shift_id))
                .map(|s| s.duration_minutes())
                .sum();
            if used > left {
                return Err(fault(format!(
                    "staff {} assigned {used} minutes over remaining {left}",
                    member.id
                )));
            }
        }
    }
    for shift in &model.shifts {
        let count = per_shift.get(&shift.id).copied().unwrap_or(0);
        if count > i64::from(shift.headcount) {
            return Err(fault(format!(
                "shift {} staffed {count} over headcount {}",
                shift.id, shift.headcount
            )));
        }
    }

    if let Some(c) = detect_conflicts(model, assignments).first() {
        return Err(fault(format!(
            "staff {} has {:?} between {} and {}",
            c.staff, c.kind, c.shift_a, c.shift_b
        )));
    }
    Ok(())
}

fn fault(msg: String) -> ResolveError {
    ResolveError::InternalFault(msg)
}
