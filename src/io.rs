use crate::model::{ResolveRequest, Role, Shift, ShiftId, StaffId, StaffMember, TimeWindow};
use crate::resolver::ResolveResponse;
use crate::storage::{JsonStorage, Storage};
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::path::Path;

/// Import du personnel depuis CSV:
/// header `id,role,specialties,availability,quota[,max_hours][,min_rest_minutes]`
pub fn import_staff_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<StaffMember>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = field(&rec, 0);
        let role = rec.get(1).context("missing role")?.trim();
        if role.is_empty() {
            bail!("invalid staff row (empty role)");
        }
        let id = if id.is_empty() {
            StaffId::random()
        } else {
            StaffId::new(id)
        };
        let quota: u32 = rec
            .get(4)
            .context("missing quota")?
            .trim()
            .parse()
            .with_context(|| format!("invalid quota for staff {id}"))?;

        let mut member = StaffMember::new(id.clone(), role, quota);
        member.specialties = field(&rec, 2)
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        member.availability = parse_windows(field(&rec, 3))
            .with_context(|| format!("invalid availability for staff {id}"))?;
        let max_hours = field(&rec, 5);
        if !max_hours.is_empty() {
            member.max_hours = Some(
                max_hours
                    .parse()
                    .with_context(|| format!("invalid max_hours for staff {id}"))?,
            );
        }
        let rest = field(&rec, 6);
        if !rest.is_empty() {
            member.min_rest_minutes = rest
                .parse()
                .with_context(|| format!("invalid min_rest_minutes for staff {id}"))?;
        }
        out.push(member);
    }
    Ok(out)
}

/// Import de gardes: header `id,start,end,role[,specialty][,headcount][,priority][,group]`
/// (RFC3339 UTC ; effectif 1 et priorité 1 par défaut)
pub fn import_shifts_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Shift>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = field(&rec, 0);
        let id = if id.is_empty() {
            ShiftId::random()
        } else {
            ShiftId::new(id)
        };
        let start: DateTime<Utc> = rec
            .get(1)
            .context("missing start")?
            .trim()
            .parse()
            .context("start RFC3339")?;
        let end: DateTime<Utc> = rec
            .get(2)
            .context("missing end")?
            .trim()
            .parse()
            .context("end RFC3339")?;
        let role = rec.get(3).context("missing role")?.trim();
        if role.is_empty() {
            bail!("invalid shift row {id} (empty role)");
        }

        let mut shift = Shift::new(id.clone(), start, end, role, 1);
        let specialty = field(&rec, 4);
        if !specialty.is_empty() {
            shift.specialty = Some(specialty.to_string());
        }
        let headcount = field(&rec, 5);
        if !headcount.is_empty() {
            shift.headcount = headcount
                .parse()
                .with_context(|| format!("invalid headcount for shift {id}"))?;
        }
        let priority = field(&rec, 6);
        if !priority.is_empty() {
            shift.priority = priority
                .parse()
                .with_context(|| format!("invalid priority for shift {id}"))?;
        }
        let group = field(&rec, 7);
        if !group.is_empty() {
            shift.group = Some(group.to_string());
        }
        out.push(shift);
    }
    Ok(out)
}

fn field(rec: &StringRecord, idx: usize) -> &str {
    rec.get(idx).map(str::trim).unwrap_or("")
}

/// `start/end;start/end` ; `..` accepté comme séparateur, une date seule
/// vaut la journée entière.
pub fn parse_windows(raw: &str) -> anyhow::Result<Vec<TimeWindow>> {
    raw.split(';')
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| parse_window_chunk(chunk.trim()))
        .collect()
}

fn parse_window_chunk(chunk: &str) -> anyhow::Result<TimeWindow> {
    if let Some((start_raw, end_raw)) = chunk.split_once('/').or_else(|| chunk.split_once("..")) {
        let (start, _) = parse_point(start_raw.trim())?;
        let (mut end, end_was_date) = parse_point(end_raw.trim())?;
        if end_was_date {
            end += Duration::days(1);
        }
        TimeWindow::new(start, end).map_err(anyhow::Error::msg)
    } else {
        let (start, _) = parse_point(chunk)?;
        let end = start + Duration::days(1);
        TimeWindow::new(start, end).map_err(anyhow::Error::msg)
    }
}

/// Instant RFC3339, ou date `YYYY-MM-DD` à minuit UTC (booléen à vrai).
pub fn parse_point(raw: &str) -> anyhow::Result<(DateTime<Utc>, bool)> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok((dt, false));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date/datetime: {raw}"))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .context("invalid midnight conversion")?;
    Ok((Utc.from_utc_datetime(&datetime), true))
}

pub fn read_request<P: AsRef<Path>>(path: P) -> anyhow::Result<ResolveRequest> {
    JsonStorage::open(path)?.load()
}

/// Export JSON de la réponse (écriture atomique, jolie mise en forme)
pub fn write_response<P: AsRef<Path>>(path: P, response: &ResolveResponse) -> anyhow::Result<()> {
    JsonStorage::open(path)?.save(response)
}

/// Export CSV des affectations: header `staff_id,shift_id,start,end`
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    request: &ResolveRequest,
    response: &ResolveResponse,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["staff_id", "shift_id", "start", "end"])?;
    for a in &response.assignments {
        let shift = request
            .find_shift(&a.shift_id)
            .with_context(|| format!("unknown shift in response: {}", a.shift_id))?;
        let start = shift.start.to_rfc3339();
        let end = shift.end.to_rfc3339();
        w.write_record([
            a.staff_id.as_str(),
            a.shift_id.as_str(),
            start.as_str(),
            end.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV des écarts: header `shift_id,required,covered,unmet,reason`
pub fn export_gaps_csv<P: AsRef<Path>>(path: P, response: &ResolveResponse) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["shift_id", "required", "covered", "unmet", "reason"])?;
    let (mut required, mut covered, mut unmet) =
        (itoa::Buffer::new(), itoa::Buffer::new(), itoa::Buffer::new());
    for gap in &response.gaps {
        w.write_record([
            gap.shift_id.as_str(),
            required.format(gap.required),
            covered.format(gap.covered),
            unmet.format(gap.unmet),
            gap.reason.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Assemble une requête à partir des listes importées.
pub fn build_request(
    staff: Vec<StaffMember>,
    shifts: Vec<Shift>,
    period: TimeWindow,
    max_shifts_per_group: Option<u32>,
) -> ResolveRequest {
    ResolveRequest {
        staff,
        shifts,
        period_start: period.start,
        period_end: period.end,
        max_shifts_per_group,
    }
}

/// Rôles présents dans une liste de personnel, triés.
pub fn roles_of(staff: &[StaffMember]) -> Vec<Role> {
    let mut roles: Vec<Role> = staff.iter().map(|s| s.role.clone()).collect();
    roles.sort();
    roles.dedup();
    roles
}
