//! Réseau de flot construit une fois par requête, en lecture seule ensuite.
//!
//! Couches : source → membre → (membre, groupe) → [bloc de conflit] → garde → puits.
//! Chaque arc va d'une couche à une couche strictement plus profonde, le
//! réseau est donc acyclique par construction.

pub type NodeId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Sink,
    Staff(usize),
    StaffGroup { staff: usize, group: usize },
    ConflictBlock { staff: usize, block: usize },
    Shift(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub capacity: i64,
    pub cost: i64,
}

/// Arc d'éligibilité (membre, garde) et la chaîne d'arcs qui l'alimente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub edge: EdgeId,
    pub staff: usize,
    pub shift: usize,
    pub group_edge: EdgeId,
    pub block_edge: Option<EdgeId>,
}

/// Arcs (membre → groupe) avec le libellé fusionné du groupe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEdge {
    pub edge: EdgeId,
    pub staff: usize,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    pub(crate) nodes: Vec<NodeKind>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) outgoing: Vec<Vec<EdgeId>>,
    pub(crate) incoming: Vec<Vec<EdgeId>>,
    pub(crate) source: NodeId,
    pub(crate) sink: NodeId,
    pub(crate) staff_nodes: Vec<NodeId>,
    pub(crate) shift_nodes: Vec<NodeId>,
    /// Paliers source → membre, un arc de capacité 1 par garde possible.
    pub(crate) quota_edges: Vec<Vec<EdgeId>>,
    pub(crate) demand_edges: Vec<EdgeId>,
    pub(crate) group_edges: Vec<GroupEdge>,
    pub(crate) eligibility: Vec<Eligibility>,
    pub(crate) eligibility_by_shift: Vec<Vec<usize>>,
}

impl FlowNetwork {
    pub(crate) fn with_terminals() -> Self {
        let mut net = Self::default();
        net.source = net.add_node(NodeKind::Source);
        net.sink = net.add_node(NodeKind::Sink);
        net
    }

    pub(crate) fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(kind);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.nodes.len() - 1
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, capacity: i64, cost: i64) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            from,
            to,
            capacity,
            cost,
        });
        self.outgoing[from].push(id);
        self.incoming[to].push(id);
        id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.outgoing[node]
    }

    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        &self.incoming[node]
    }

    pub fn eligibility(&self) -> &[Eligibility] {
        &self.eligibility
    }

    pub fn eligibility_for_shift(&self, shift: usize) -> impl Iterator<Item = &Eligibility> + '_ {
        self.eligibility_by_shift[shift]
            .iter()
            .map(move |&i| &self.eligibility[i])
    }

    pub fn quota_edges(&self, staff: usize) -> &[EdgeId] {
        &self.quota_edges[staff]
    }

    pub fn demand_edge(&self, shift: usize) -> EdgeId {
        self.demand_edges[shift]
    }

    pub fn staff_node(&self, staff: usize) -> NodeId {
        self.staff_nodes[staff]
    }

    pub fn shift_node(&self, shift: usize) -> NodeId {
        self.shift_nodes[shift]
    }

    pub fn group_edges(&self) -> &[GroupEdge] {
        &self.group_edges
    }

    /// Aucun arc d'éligibilité : le flot est trivialement nul.
    pub fn is_trivially_empty(&self) -> bool {
        self.eligibility.is_empty()
    }

    /// Offre totale (somme des capacités source → membres).
    pub fn total_supply(&self) -> i64 {
        self.outgoing[self.source]
            .iter()
            .map(|&e| self.edges[e].capacity)
            .sum()
    }

    /// Demande totale (somme des capacités gardes → puits).
    pub fn total_demand(&self) -> i64 {
        self.demand_edges.iter().map(|&e| self.edges[e].capacity).sum()
    }
}
