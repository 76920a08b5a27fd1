use crate::model::{ShiftId, StaffId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Options de résolution (poids des contraintes souples, budget).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverOptions {
    /// Coût d'équité : pèse la k-ième garde d'un membre par rapport à son quota.
    pub fairness_weight: i64,
    /// Multiplicateur de `Shift::priority` sur l'arc garde → puits.
    pub priority_weight: i64,
    /// Coût d'un spécialiste placé sur une garde sans spécialité requise.
    pub specialist_penalty: i64,
    /// Coût d'une garde listée dans `avoid`.
    pub avoid_penalty: i64,
    /// Budget en millisecondes, aucun si absent.
    pub time_budget_ms: Option<u64>,
    /// Revérifie les invariants après résolution.
    pub verify: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            fairness_weight: 1,
            priority_weight: 1_000,
            specialist_penalty: 5,
            avoid_penalty: 50,
            time_budget_ms: None,
            verify: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid shift {id}: {reason}")]
    InvalidShift { id: String, reason: &'static str },
    #[error("invalid staff member {id}: {reason}")]
    InvalidStaffMember { id: String, reason: &'static str },
    #[error("empty request: {0}")]
    EmptyRequest(&'static str),
    #[error("internal solver fault: {0}")]
    InternalFault(String),
}

impl ResolveError {
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ResolveError::InternalFault(_))
    }

    /// Statut HTTP qu'une couche API devrait renvoyer.
    pub fn http_status(&self) -> u16 {
        if self.is_input_error() {
            422
        } else {
            500
        }
    }

    /// Code de sortie du binaire.
    pub fn exit_code(&self) -> i32 {
        if self.is_input_error() {
            4
        } else {
            5
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveStatus {
    /// Toutes les gardes sont couvertes.
    Feasible,
    /// Des écarts de couverture existent.
    Partial,
    /// Budget dépassé : résultat partiel, non définitif.
    TimedOut,
}

impl ResolveStatus {
    pub fn http_status(self) -> u16 {
        match self {
            ResolveStatus::Feasible | ResolveStatus::Partial => 200,
            ResolveStatus::TimedOut => 504,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            ResolveStatus::Feasible => 0,
            ResolveStatus::Partial => 2,
            ResolveStatus::TimedOut => 3,
        }
    }

    /// Un résultat interrompu ne doit pas être persisté comme final.
    pub fn is_authoritative(self) -> bool {
        !matches!(self, ResolveStatus::TimedOut)
    }
}

impl fmt::Display for ResolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveStatus::Feasible => write!(f, "FEASIBLE"),
            ResolveStatus::Partial => write!(f, "PARTIAL"),
            ResolveStatus::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub staff_id: StaffId,
    pub shift_id: ShiftId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapReason {
    NoEligibleStaff,
    InsufficientEligibleStaff,
    Contended,
    CapacityExhausted,
}

impl GapReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GapReason::NoEligibleStaff => "NO_ELIGIBLE_STAFF",
            GapReason::InsufficientEligibleStaff => "INSUFFICIENT_ELIGIBLE_STAFF",
            GapReason::Contended => "CONTENDED",
            GapReason::CapacityExhausted => "CAPACITY_EXHAUSTED",
        }
    }
}

impl fmt::Display for GapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityGap {
    pub shift_id: ShiftId,
    pub required: u32,
    pub covered: u32,
    pub unmet: u32,
    /// Raison principale.
    pub reason: GapReason,
    /// Toutes les raisons observées, triées.
    pub reasons: Vec<GapReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BottleneckKind {
    /// La garde n'est plus atteignable depuis la source.
    UncoveredShift,
    /// Le quota du membre est épuisé.
    StaffQuotaSaturated,
    /// Le plafond du membre sur un groupe de gardes est atteint.
    StaffGroupSaturated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<StaffId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_id: Option<ShiftId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffLoad {
    pub staff_id: StaffId,
    pub assigned: u32,
    pub assigned_minutes: i64,
    pub quota: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSummary {
    pub total_assignments: u32,
    pub staff_count: u32,
    pub mean_per_staff: f64,
    pub std_dev: f64,
    pub per_staff: Vec<StaffLoad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub status: ResolveStatus,
    pub assignments: Vec<Assignment>,
    pub gaps: Vec<FeasibilityGap>,
    pub covered_headcount: u64,
    pub required_headcount: u64,
    pub total_cost: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bottlenecks: Vec<Bottleneck>,
    pub workload: WorkloadSummary,
}

impl ResolveResponse {
    pub fn is_feasible(&self) -> bool {
        self.status == ResolveStatus::Feasible
    }

    pub fn assignments_for<'a>(
        &'a self,
        shift: &'a ShiftId,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| &a.shift_id == shift)
    }

    pub fn gap_for(&self, shift: &ShiftId) -> Option<&FeasibilityGap> {
        self.gaps.iter().find(|g| &g.shift_id == shift)
    }
}

/// Résumé d'une ligne : `STATUS covered=x/y gaps=id:REASON,...`.
impl fmt::Display for ResolveResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} covered={}/{} gaps=",
            self.status, self.covered_headcount, self.required_headcount
        )?;
        if self.gaps.is_empty() {
            return write!(f, "-");
        }
        for (idx, gap) in self.gaps.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", gap.shift_id, gap.reason)?;
        }
        Ok(())
    }
}
