use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Identifiant fort pour StaffMember
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(String);

impl StaffId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour Shift
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftId(String);

impl ShiftId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catégorie de professionnel (NURSE, DOCTOR, ...). Comparaison exacte.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Intervalle UTC [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if end <= start {
            return Err("window end must be after start".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Membre du personnel soignant. Immuable pendant une résolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: StaffId,
    pub role: Role,
    #[serde(default)]
    pub specialties: BTreeSet<String>,
    #[serde(default)]
    pub availability: Vec<TimeWindow>,
    /// Heures maximales sur la période (aucune limite si absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hours: Option<u32>,
    #[serde(default)]
    pub min_rest_minutes: i64,
    /// Nombre maximal de gardes sur la période.
    pub quota: u32,
    /// Gardes déjà tenues hors de cette résolution (réparation de planning).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub committed: Vec<TimeWindow>,
    /// Plafond par groupe de gardes ; à défaut `maxShiftsPerGroup` de la requête.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_quota: Option<u32>,
    /// Gardes que la personne préfère éviter (coût, jamais bloquant).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<ShiftId>,
}

impl StaffMember {
    pub fn new<R: AsRef<str>>(id: StaffId, role: R, quota: u32) -> Self {
        Self {
            id,
            role: Role::new(role),
            specialties: BTreeSet::new(),
            availability: Vec::new(),
            max_hours: None,
            min_rest_minutes: 0,
            quota,
            committed: Vec::new(),
            group_quota: None,
            avoid: Vec::new(),
        }
    }

    pub fn with_availability(mut self, window: TimeWindow) -> Self {
        self.availability.push(window);
        self
    }

    pub fn with_specialty<S: Into<String>>(mut self, specialty: S) -> Self {
        self.specialties.insert(specialty.into());
        self
    }

    pub fn with_min_rest_minutes(mut self, minutes: i64) -> Self {
        self.min_rest_minutes = minutes;
        self
    }

    pub fn with_max_hours(mut self, hours: u32) -> Self {
        self.max_hours = Some(hours);
        self
    }

    pub fn with_committed(mut self, window: TimeWindow) -> Self {
        self.committed.push(window);
        self
    }

    pub fn remaining_quota(&self) -> u32 {
        let used = u32::try_from(self.committed.len()).unwrap_or(u32::MAX);
        self.quota.saturating_sub(used)
    }

    /// Minutes restantes sur `max_hours`, `None` si pas de limite.
    pub fn remaining_minutes(&self) -> Option<i64> {
        self.max_hours.map(|h| {
            let used: i64 = self.committed.iter().map(TimeWindow::duration_minutes).sum();
            (i64::from(h) * 60 - used).max(0)
        })
    }
}

/// Garde à pourvoir (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    pub headcount: i32,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn default_priority() -> i64 {
    1
}

impl Shift {
    pub fn new<R: AsRef<str>>(
        id: ShiftId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        role: R,
        headcount: i32,
    ) -> Self {
        Self {
            id,
            start,
            end,
            role: Role::new(role),
            specialty: None,
            headcount,
            priority: default_priority(),
            group: None,
        }
    }

    pub fn with_specialty<S: Into<String>>(mut self, specialty: S) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_group<S: Into<String>>(mut self, group: S) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Requête de résolution : instantané immuable des données d'entrée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub staff: Vec<StaffMember>,
    pub shifts: Vec<Shift>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shifts_per_group: Option<u32>,
}

impl ResolveRequest {
    pub fn new(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            staff: Vec::new(),
            shifts: Vec::new(),
            period_start,
            period_end,
            max_shifts_per_group: None,
        }
    }

    pub fn find_staff<'a>(&'a self, id: &StaffId) -> Option<&'a StaffMember> {
        self.staff.iter().find(|s| &s.id == id)
    }

    pub fn find_shift<'a>(&'a self, id: &ShiftId) -> Option<&'a Shift> {
        self.shifts.iter().find(|s| &s.id == id)
    }

    /// Retire des membres (simulation « et si X n'était pas là »).
    pub fn without_staff(mut self, excluded: &[StaffId]) -> Self {
        self.staff.retain(|s| !excluded.contains(&s.id));
        self
    }

    pub fn required_headcount(&self) -> u64 {
        self.shifts
            .iter()
            .map(|s| u64::try_from(s.headcount).unwrap_or(0))
            .sum()
    }
}
