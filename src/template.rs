use crate::model::{Shift, ShiftId, TimeWindow};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Gabarit de rotation : génère les gardes d'une période.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_cycle")]
    pub rotation_cycle_days: u16,
    #[serde(default)]
    pub slots: Vec<Slot>,
    /// Étiquette de groupe posée sur chaque garde générée.
    #[serde(default)]
    pub group_by: Option<GroupBy>,
}

fn default_cycle() -> u16 {
    7
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Semaine ISO, ex. `2026-W23`.
    Week,
    /// Mois civil, ex. `2026-06`.
    Month,
}

impl GroupBy {
    fn label(self, date: NaiveDate) -> String {
        match self {
            GroupBy::Week => {
                let iso = date.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            GroupBy::Month => format!("{}-{:02}", date.year(), date.month()),
        }
    }
}

impl Template {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("template id cannot be empty");
        }
        if self.rotation_cycle_days == 0 {
            bail!("rotation_cycle_days must be > 0");
        }
        if self.slots.is_empty() {
            bail!("template must contain at least one slot");
        }
        for slot in &self.slots {
            slot.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub role: String,
    #[serde(default)]
    pub specialty: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// 1..=7 : jour de semaine (lundi = 1) ; > 7 : jour du cycle (8 = jour 1).
    pub days: Vec<u8>,
    #[serde(default = "default_headcount")]
    pub headcount: i32,
    #[serde(default = "default_priority")]
    pub priority: i64,
}

fn default_headcount() -> i32 {
    1
}

fn default_priority() -> i64 {
    1
}

impl Slot {
    fn validate(&self) -> Result<()> {
        if self.role.trim().is_empty() {
            bail!("slot role cannot be empty");
        }
        if self.days.is_empty() {
            bail!("slot must define at least one day");
        }
        if self.start_time == self.end_time {
            bail!("slot start_time and end_time cannot be equal");
        }
        if self.headcount <= 0 {
            bail!("slot headcount must be positive");
        }
        Ok(())
    }
}

/// Génère les gardes de `start` à `end` inclus, triées par début puis id.
/// Identifiants déterministes : `<template>-<date>-<slot>`.
pub fn generate_shifts(template: &Template, start: NaiveDate, end: NaiveDate) -> Result<Vec<Shift>> {
    template.validate()?;
    if end < start {
        bail!("end date must be after start date");
    }

    let mut shifts = Vec::new();
    let mut current = start;
    while current <= end {
        let cycle_day = current.signed_duration_since(start).num_days()
            % i64::from(template.rotation_cycle_days);
        let weekday = current.weekday().number_from_monday() as u8;

        for (idx, slot) in template.slots.iter().enumerate() {
            if !slot_matches_day(slot, weekday, cycle_day) {
                continue;
            }
            let (start_dt, end_dt) = build_datetimes(current, slot.start_time, slot.end_time)?;
            let id = ShiftId::new(format!("{}-{}-{}", template.id, current, idx + 1));
            let mut shift = Shift::new(id, start_dt, end_dt, &slot.role, slot.headcount)
                .with_priority(slot.priority);
            shift.specialty = slot.specialty.clone();
            shift.group = template.group_by.map(|g| g.label(current));
            shifts.push(shift);
        }
        current = current.succ_opt().context("date overflow")?;
    }

    shifts.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    Ok(shifts)
}

/// Gardes des journées couvertes par `period`, sans celles qui en débordent
/// (nuit du dernier jour). Renvoie aussi le nombre de gardes écartées.
pub fn generate_shifts_within(template: &Template, period: &TimeWindow) -> Result<(Vec<Shift>, usize)> {
    let first_day = period.start.date_naive();
    let last_day = (period.end - Duration::seconds(1)).date_naive();
    let mut shifts = generate_shifts(template, first_day, last_day)?;
    let before = shifts.len();
    shifts.retain(|s| s.start >= period.start && s.end <= period.end);
    let dropped = before - shifts.len();
    Ok((shifts, dropped))
}

pub fn load_template_from_file<P: AsRef<Path>>(path: P) -> Result<Template> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading template {}", path.display()))?;
    let template: Template = serde_json::from_slice(&data)
        .with_context(|| format!("parsing template {}", path.display()))?;
    template.validate()?;
    Ok(template)
}

fn slot_matches_day(slot: &Slot, weekday: u8, cycle_day: i64) -> bool {
    slot.days.iter().any(|&d| {
        if d <= 7 {
            d == weekday
        } else {
            i64::from(d) - 7 == cycle_day + 1
        }
    })
}

/// Une fin antérieure ou égale au début passe au lendemain (garde de nuit).
fn build_datetimes(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start_dt = Utc.from_utc_datetime(&NaiveDateTime::new(date, start_time));
    let end_date = if end_time <= start_time {
        date.succ_opt().context("date overflow")?
    } else {
        date
    };
    let end_dt = Utc.from_utc_datetime(&NaiveDateTime::new(end_date, end_time));
    Ok((start_dt, end_dt))
}
