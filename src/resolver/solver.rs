//! Flot max à coût min par plus courts chemins successifs (SPFA).
//!
//! Le réseau n'est jamais modifié : le solveur ne tient que son propre
//! vecteur de flot par arc. Chaque arc `e` donne deux arcs résiduels,
//! `2e` (avant, résidu `capacity - flow`, coût `cost`) et `2e + 1`
//! (arrière, résidu `flow`, coût `-cost`).

use super::budget::{Budget, Interruption};
use super::network::{FlowNetwork, NodeId};
use super::ResolveError;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace};

const UNREACHED: i64 = i64::MAX;
const NO_ARC: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Plus aucun chemin augmentant : flot maximal de coût minimal.
    Completed,
    /// Aucun arc d'éligibilité, flot nul sans recherche.
    EmptyNetwork,
    /// Budget épuisé : meilleur flot trouvé jusque-là.
    Interrupted(Interruption),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::EmptyNetwork => write!(f, "empty network"),
            Termination::Interrupted(reason) => write!(f, "interrupted: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    /// Flot par arc, indexé comme `FlowNetwork::edges`.
    pub flow: Vec<i64>,
    pub value: i64,
    pub cost: i64,
    pub augmentations: u64,
    pub termination: Termination,
}

impl SolveOutcome {
    pub fn is_interrupted(&self) -> bool {
        matches!(self.termination, Termination::Interrupted(_))
    }

    pub fn flow_on(&self, edge: usize) -> i64 {
        self.flow[edge]
    }
}

enum PathSearch {
    Found,
    Exhausted,
    Interrupted(Interruption),
}

struct Residual<'n> {
    net: &'n FlowNetwork,
    flow: Vec<i64>,
    arcs: Vec<Vec<usize>>,
    dist: Vec<i64>,
    prev: Vec<usize>,
    in_queue: Vec<bool>,
    enqueued: Vec<usize>,
    steps: u64,
}

impl<'n> Residual<'n> {
    fn new(net: &'n FlowNetwork) -> Self {
        let n = net.node_count();
        let arcs = (0..n)
            .map(|node| {
                let forward = net.outgoing(node).iter().map(|&e| 2 * e);
                let backward = net.incoming(node).iter().map(|&e| 2 * e + 1);
                forward.chain(backward).collect()
            })
            .collect();
        Self {
            net,
            flow: vec![0; net.edges().len()],
            arcs,
            dist: vec![UNREACHED; n],
            prev: vec![NO_ARC; n],
            in_queue: vec![false; n],
            enqueued: vec![0; n],
            steps: 0,
        }
    }

    /// (tête, résidu, coût) d'un arc résiduel.
    #[inline]
    fn arc(&self, arc: usize) -> (NodeId, i64, i64) {
        let e = self.net.edge(arc / 2);
        if arc % 2 == 0 {
            (e.to, e.capacity - self.flow[arc / 2], e.cost)
        } else {
            (e.from, self.flow[arc / 2], -e.cost)
        }
    }

    #[inline]
    fn tail(&self, arc: usize) -> NodeId {
        let e = self.net.edge(arc / 2);
        if arc % 2 == 0 {
            e.from
        } else {
            e.to
        }
    }

    fn shortest_path(&mut self, budget: &Budget) -> Result<PathSearch, ResolveError> {
        let n = self.net.node_count();
        self.dist.fill(UNREACHED);
        self.prev.fill(NO_ARC);
        self.in_queue.fill(false);
        self.enqueued.fill(0);

        let source = self.net.source();
        let mut queue = VecDeque::with_capacity(n);
        self.dist[source] = 0;
        queue.push_back(source);
        self.in_queue[source] = true;

        while let Some(u) = queue.pop_front() {
            self.steps = self.steps.wrapping_add(1);
            if let Some(reason) = budget.check_step(self.steps) {
                return Ok(PathSearch::Interrupted(reason));
            }
            self.in_queue[u] = false;
            let du = self.dist[u];
            for idx in 0..self.arcs[u].len() {
                let arc = self.arcs[u][idx];
                let (v, residual, cost) = self.arc(arc);
                if residual <= 0 {
                    continue;
                }
                let candidate = du.saturating_add(cost);
                if candidate < self.dist[v] {
                    self.dist[v] = candidate;
                    self.prev[v] = arc;
                    if !self.in_queue[v] {
                        self.enqueued[v] += 1;
                        if self.enqueued[v] > n {
                            return Err(ResolveError::InternalFault(
                                "negative cycle in residual graph".to_string(),
                            ));
                        }
                        self.in_queue[v] = true;
                        queue.push_back(v);
                    }
                }
            }
        }

        if self.dist[self.net.sink()] == UNREACHED {
            Ok(PathSearch::Exhausted)
        } else {
            Ok(PathSearch::Found)
        }
    }

    /// Pousse le goulot du chemin trouvé ; renvoie (quantité, coût unitaire).
    fn augment(&mut self) -> Result<(i64, i64), ResolveError> {
        let source = self.net.source();
        let sink = self.net.sink();

        let mut bottleneck = i64::MAX;
        let mut node = sink;
        while node != source {
            let arc = self.prev[node];
            if arc == NO_ARC {
                return Err(ResolveError::InternalFault(
                    "broken predecessor chain".to_string(),
                ));
            }
            let (_, residual, _) = self.arc(arc);
            bottleneck = bottleneck.min(residual);
            node = self.tail(arc);
        }
        if bottleneck <= 0 {
            return Err(ResolveError::InternalFault(format!(
                "non-positive bottleneck {bottleneck} on augmenting path"
            )));
        }

        let mut node = sink;
        while node != source {
            let arc = self.prev[node];
            let e = arc / 2;
            if arc % 2 == 0 {
                self.flow[e] += bottleneck;
            } else {
                self.flow[e] -= bottleneck;
            }
            let cap = self.net.edge(e).capacity;
            if self.flow[e] < 0 || self.flow[e] > cap {
                return Err(ResolveError::InternalFault(format!(
                    "edge {e} flow {} outside [0, {cap}]",
                    self.flow[e]
                )));
            }
            node = self.tail(arc);
        }
        Ok((bottleneck, self.dist[sink]))
    }
}

/// Calcule un flot maximal de coût minimal sur `net`, dans la limite de
/// `budget`. L'infaisabilité n'est jamais une erreur : seule une violation
/// d'invariant interne renvoie `InternalFault`.
pub fn solve(net: &FlowNetwork, budget: &Budget) -> Result<SolveOutcome, ResolveError> {
    if net.is_trivially_empty() {
        debug!("no eligibility edge, skipping flow search");
        return Ok(SolveOutcome {
            flow: vec![0; net.edges().len()],
            value: 0,
            cost: 0,
            augmentations: 0,
            termination: Termination::EmptyNetwork,
        });
    }

    let mut residual = Residual::new(net);
    let mut value = 0i64;
    let mut cost = 0i64;
    let mut augmentations = 0u64;

    let termination = loop {
        if let Some(reason) = budget.check() {
            break Termination::Interrupted(reason);
        }
        match residual.shortest_path(budget)? {
            PathSearch::Exhausted => break Termination::Completed,
            PathSearch::Interrupted(reason) => break Termination::Interrupted(reason),
            PathSearch::Found => {
                let (amount, unit_cost) = residual.augment()?;
                value += amount;
                cost += amount * unit_cost;
                augmentations += 1;
                trace!(augmentations, amount, unit_cost, "augmented");
            }
        }
    };

    debug!(value, cost, augmentations, %termination, "flow search finished");
    Ok(SolveOutcome {
        flow: residual.flow,
        value,
        cost,
        augmentations,
        termination,
    })
}

/// Nœuds atteignables depuis la source dans le graphe résiduel de `flow`
/// (côté source de la coupe minimale quand le flot est maximal).
pub fn residual_reachable(net: &FlowNetwork, flow: &[i64]) -> Vec<bool> {
    let mut seen = vec![false; net.node_count()];
    let mut queue = VecDeque::new();
    seen[net.source()] = true;
    queue.push_back(net.source());
    while let Some(u) = queue.pop_front() {
        for &e in net.outgoing(u) {
            let edge = net.edge(e);
            if !seen[edge.to] && edge.capacity - flow[e] > 0 {
                seen[edge.to] = true;
                queue.push_back(edge.to);
            }
        }
        for &e in net.incoming(u) {
            let edge = net.edge(e);
            if !seen[edge.from] && flow[e] > 0 {
                seen[edge.from] = true;
                queue.push_back(edge.from);
            }
        }
    }
    seen
}
