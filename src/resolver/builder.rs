//! Construction du modèle de contraintes : règles métier → structure du réseau.

use super::network::{Eligibility, FlowNetwork, GroupEdge, NodeId, NodeKind};
use super::{util, validate, ResolveError, ResolverOptions};
use crate::model::{ResolveRequest, Shift, StaffMember, TimeWindow};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Première règle d'éligibilité non satisfaite pour un couple (membre, garde).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    Role,
    Specialty,
    Availability,
    Quota,
    Hours,
    Rest,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ineligibility::Role => "role",
            Ineligibility::Specialty => "specialty",
            Ineligibility::Availability => "availability",
            Ineligibility::Quota => "quota",
            Ineligibility::Hours => "hours",
            Ineligibility::Rest => "rest",
        };
        f.write_str(s)
    }
}

/// Réseau construit + index vers les enregistrements d'origine.
#[derive(Debug, Clone)]
pub struct ConstraintModel<'a> {
    pub(crate) request: &'a ResolveRequest,
    pub(crate) staff: Vec<&'a StaffMember>,
    pub(crate) shifts: Vec<&'a Shift>,
    pub(crate) network: FlowNetwork,
    pub(crate) rejections: BTreeMap<Ineligibility, usize>,
}

impl<'a> ConstraintModel<'a> {
    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    /// Membres dans l'ordre du réseau (identifiant croissant).
    pub fn staff(&self) -> &[&'a StaffMember] {
        &self.staff
    }

    /// Gardes dans l'ordre du réseau (identifiant croissant).
    pub fn shifts(&self) -> &[&'a Shift] {
        &self.shifts
    }

    pub fn request(&self) -> &'a ResolveRequest {
        self.request
    }

    /// Nombre de couples rejetés, par première règle violée.
    pub fn rejections(&self) -> &BTreeMap<Ineligibility, usize> {
        &self.rejections
    }

    pub fn eligible_pairs(&self) -> usize {
        self.network.eligibility.len()
    }
}

/// Vérifie l'éligibilité d'un couple dans l'ordre fixe : rôle, spécialité,
/// disponibilité, quota restant, heures restantes, repos.
pub fn check_eligibility(
    member: &StaffMember,
    shift: &Shift,
    merged_availability: &[TimeWindow],
) -> Result<(), Ineligibility> {
    if member.role != shift.role {
        return Err(Ineligibility::Role);
    }
    if let Some(required) = &shift.specialty {
        if !member.specialties.contains(required) {
            return Err(Ineligibility::Specialty);
        }
    }
    let window = shift.window();
    if !util::covered_by(merged_availability, &window) {
        return Err(Ineligibility::Availability);
    }
    if member.remaining_quota() == 0 {
        return Err(Ineligibility::Quota);
    }
    if let Some(left) = member.remaining_minutes() {
        if left < shift.duration_minutes() {
            return Err(Ineligibility::Hours);
        }
    }
    if member
        .committed
        .iter()
        .any(|c| util::rest_conflict(c, &window, member.min_rest_minutes))
    {
        return Err(Ineligibility::Rest);
    }
    Ok(())
}

pub fn build_model<'a>(
    request: &'a ResolveRequest,
    opts: &ResolverOptions,
) -> Result<ConstraintModel<'a>, ResolveError> {
    validate::validate_request(request)?;

    let mut staff: Vec<&StaffMember> = request.staff.iter().collect();
    staff.sort_by(|a, b| a.id.cmp(&b.id));
    let mut shifts: Vec<&Shift> = request.shifts.iter().collect();
    shifts.sort_by(|a, b| a.id.cmp(&b.id));

    let mut net = FlowNetwork::with_terminals();
    let staff_nodes: Vec<NodeId> = (0..staff.len())
        .map(|i| net.add_node(NodeKind::Staff(i)))
        .collect();
    let shift_nodes: Vec<NodeId> = (0..shifts.len())
        .map(|i| net.add_node(NodeKind::Shift(i)))
        .collect();
    net.staff_nodes = staff_nodes;
    net.shift_nodes = shift_nodes;
    net.quota_edges = vec![Vec::new(); staff.len()];
    net.eligibility_by_shift = vec![Vec::new(); shifts.len()];

    for (ti, shift) in shifts.iter().enumerate() {
        let cost = shift.priority.saturating_mul(opts.priority_weight).saturating_neg();
        let edge = net.add_edge(
            net.shift_nodes[ti],
            net.sink,
            i64::from(shift.headcount),
            cost,
        );
        net.demand_edges.push(edge);
    }

    let mut rejections = BTreeMap::new();
    for (si, member) in staff.iter().enumerate() {
        let merged = util::merge_windows(&member.availability);
        let eligible: Vec<usize> = (0..shifts.len())
            .filter(|&ti| match check_eligibility(member, shifts[ti], &merged) {
                Ok(()) => true,
                Err(reason) => {
                    *rejections.entry(reason).or_insert(0) += 1;
                    false
                }
            })
            .collect();
        if eligible.is_empty() {
            continue;
        }
        add_staff_subnetwork(&mut net, request, opts, si, member, &shifts, &eligible);
    }

    debug!(
        nodes = net.node_count(),
        edges = net.edges().len(),
        eligible = net.eligibility.len(),
        "constraint model built"
    );

    Ok(ConstraintModel {
        request,
        staff,
        shifts,
        network: net,
        rejections,
    })
}

/// Paliers de quota, nœuds de groupe, blocs de conflit et arcs d'éligibilité
/// d'un membre.
fn add_staff_subnetwork(
    net: &mut FlowNetwork,
    request: &ResolveRequest,
    opts: &ResolverOptions,
    si: usize,
    member: &StaffMember,
    shifts: &[&Shift],
    eligible: &[usize],
) {
    let staff_node = net.staff_nodes[si];
    let cap = staff_capacity(member, eligible, shifts);

    let committed = i64::try_from(member.committed.len()).unwrap_or(i64::MAX);
    let quota = i64::from(member.quota.max(1));
    for k in 0..cap {
        let cost = opts
            .fairness_weight
            .saturating_mul(100)
            .saturating_mul(committed + k)
            / quota;
        let edge = net.add_edge(net.source, staff_node, 1, cost);
        net.quota_edges[si].push(edge);
    }

    let windows: Vec<TimeWindow> = eligible.iter().map(|&ti| shifts[ti].window()).collect();
    let components = util::conflict_cliques(&windows, member.min_rest_minutes);

    // Étiquettes de groupe, fusionnées quand un bloc de conflit les relie.
    let mut labels: Vec<Option<&str>> = Vec::new();
    let label_of: Vec<usize> = eligible
        .iter()
        .map(|&ti| {
            let label = shifts[ti].group.as_deref();
            match labels.iter().position(|l| *l == label) {
                Some(pos) => pos,
                None => {
                    labels.push(label);
                    labels.len() - 1
                }
            }
        })
        .collect();
    let mut parent: Vec<usize> = (0..labels.len()).collect();
    for component in &components {
        for &idx in &component[1..] {
            let a = find_root(&mut parent, label_of[component[0]]);
            let b = find_root(&mut parent, label_of[idx]);
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    let group_cap_for = |label: Option<&str>| -> i64 {
        match label {
            None => cap,
            Some(_) => member
                .group_quota
                .or(request.max_shifts_per_group)
                .map_or(cap, i64::from),
        }
    };

    let mut group_nodes: BTreeMap<usize, (NodeId, usize)> = BTreeMap::new();
    for label_idx in 0..labels.len() {
        let root = find_root(&mut parent, label_idx);
        if group_nodes.contains_key(&root) {
            continue;
        }
        let members: Vec<Option<&str>> = (0..labels.len())
            .filter(|&l| find_root(&mut parent, l) == root)
            .map(|l| labels[l])
            .collect();
        let group_cap = members
            .iter()
            .map(|l| group_cap_for(*l))
            .min()
            .unwrap_or(cap)
            .min(cap);
        let named: Vec<&str> = members.iter().flatten().copied().collect();
        let merged_label = if named.is_empty() {
            None
        } else {
            Some(named.join("+"))
        };

        let node = net.add_node(NodeKind::StaffGroup {
            staff: si,
            group: group_nodes.len(),
        });
        let edge = net.add_edge(staff_node, node, group_cap, 0);
        net.group_edges.push(GroupEdge {
            edge,
            staff: si,
            label: merged_label,
        });
        group_nodes.insert(root, (node, edge));
    }

    // Parent de chaque garde éligible : le nœud de groupe, ou un bloc de
    // capacité 1 si la garde partage sa clique avec une autre.
    let mut feeder: Vec<(NodeId, Option<usize>)> = vec![(0, None); eligible.len()];
    let mut blocks = 0usize;
    for component in &components {
        let root = find_root(&mut parent, label_of[component[0]]);
        let (group_node, _) = group_nodes[&root];
        if component.len() == 1 {
            feeder[component[0]] = (group_node, None);
            continue;
        }
        let block = net.add_node(NodeKind::ConflictBlock {
            staff: si,
            block: blocks,
        });
        blocks += 1;
        let block_edge = net.add_edge(group_node, block, 1, 0);
        for &idx in component {
            feeder[idx] = (block, Some(block_edge));
        }
    }

    for (idx, &ti) in eligible.iter().enumerate() {
        let shift = shifts[ti];
        let root = find_root(&mut parent, label_of[idx]);
        let (_, group_edge) = group_nodes[&root];
        let (from, block_edge) = feeder[idx];

        let mut cost = 0;
        if member.avoid.contains(&shift.id) {
            cost += opts.avoid_penalty;
        }
        if !member.specialties.is_empty() && shift.specialty.is_none() {
            cost += opts.specialist_penalty;
        }
        let edge = net.add_edge(from, net.shift_nodes[ti], 1, cost);
        net.eligibility_by_shift[ti].push(net.eligibility.len());
        net.eligibility.push(Eligibility {
            edge,
            staff: si,
            shift: ti,
            group_edge,
            block_edge,
        });
    }
}

/// Capacité source → membre : quota restant, nombre de gardes éligibles et
/// borne d'heures (plus grand k tel que les k gardes les plus courtes
/// tiennent dans les minutes restantes). La borne est optimiste, un
/// dépassement réel est corrigé après résolution.
fn staff_capacity(member: &StaffMember, eligible: &[usize], shifts: &[&Shift]) -> i64 {
    let mut cap = i64::from(member.remaining_quota()).min(eligible.len() as i64);
    if let Some(mut left) = member.remaining_minutes() {
        let mut durations: Vec<i64> = eligible
            .iter()
            .map(|&ti| shifts[ti].duration_minutes())
            .collect();
        durations.sort_unstable();
        let mut fits = 0i64;
        for d in durations {
            if d > left {
                break;
            }
            left -= d;
            fits += 1;
        }
        cap = cap.min(fits);
    }
    cap
}

fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
