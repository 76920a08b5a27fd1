//! Validation des entrées, avant toute construction du réseau.

use super::ResolveError;
use crate::model::{ResolveRequest, Shift, StaffMember};
use std::collections::HashSet;

pub(crate) fn validate_request(request: &ResolveRequest) -> Result<(), ResolveError> {
    if request.shifts.is_empty() {
        return Err(ResolveError::EmptyRequest("no shifts to resolve"));
    }
    if request.period_end <= request.period_start {
        return Err(ResolveError::EmptyRequest(
            "scheduling period end must be after start",
        ));
    }

    let mut seen = HashSet::new();
    for shift in &request.shifts {
        if !seen.insert(shift.id.as_str()) {
            return Err(invalid_shift(shift, "duplicate identifier"));
        }
        validate_shift(shift, request)?;
    }

    let mut seen = HashSet::new();
    for member in &request.staff {
        if !seen.insert(member.id.as_str()) {
            return Err(invalid_staff(member, "duplicate identifier"));
        }
        validate_staff(member)?;
    }
    Ok(())
}

fn validate_shift(shift: &Shift, request: &ResolveRequest) -> Result<(), ResolveError> {
    if shift.headcount <= 0 {
        return Err(invalid_shift(shift, "headcount must be positive"));
    }
    if shift.end <= shift.start {
        return Err(invalid_shift(shift, "end must be strictly after start"));
    }
    if shift.start < request.period_start || shift.end > request.period_end {
        return Err(invalid_shift(shift, "outside the scheduling period"));
    }
    if shift.priority < 0 {
        return Err(invalid_shift(shift, "priority cannot be negative"));
    }
    Ok(())
}

fn validate_staff(member: &StaffMember) -> Result<(), ResolveError> {
    if member.min_rest_minutes < 0 {
        return Err(invalid_staff(member, "rest duration cannot be negative"));
    }
    if member.availability.iter().any(|w| w.is_empty()) {
        return Err(invalid_staff(member, "availability window end must be after start"));
    }
    if member.committed.iter().any(|w| w.is_empty()) {
        return Err(invalid_staff(member, "committed window end must be after start"));
    }

    let mut windows = member.availability.clone();
    windows.sort();
    if windows.windows(2).any(|pair| pair[0].overlaps(&pair[1])) {
        return Err(invalid_staff(member, "availability windows overlap"));
    }
    Ok(())
}

fn invalid_shift(shift: &Shift, reason: &'static str) -> ResolveError {
    ResolveError::InvalidShift {
        id: shift.id.as_str().to_string(),
        reason,
    }
}

fn invalid_staff(member: &StaffMember, reason: &'static str) -> ResolveError {
    ResolveError::InvalidStaffMember {
        id: member.id.as_str().to_string(),
        reason,
    }
}
