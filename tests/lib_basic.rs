#![forbid(unsafe_code)]
use chrono::{DateTime, TimeZone, Utc};
use shift_resolver::{
    resolve, GapReason, ResolveError, ResolveRequest, ResolveStatus, Shift, ShiftId, StaffId,
    StaffMember, TimeWindow,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap()
}

fn october() -> ResolveRequest {
    ResolveRequest::new(at(1, 0), at(31, 0))
}

fn nurse(id: &str, quota: u32) -> StaffMember {
    StaffMember::new(StaffId::new(id), "NURSE", quota)
        .with_availability(TimeWindow::new(at(1, 0), at(31, 0)).unwrap())
}

fn shift(id: &str, start: DateTime<Utc>, end: DateTime<Utc>, role: &str, headcount: i32) -> Shift {
    Shift::new(ShiftId::new(id), start, end, role, headcount)
}

#[test]
fn two_nurses_cover_one_shift() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3), nurse("bob", 3)];
    req.shifts = vec![shift("day", at(2, 8), at(2, 20), "NURSE", 2)];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Feasible);
    assert_eq!(resp.assignments.len(), 2);
    assert!(resp.gaps.is_empty());
    assert_eq!(resp.covered_headcount, 2);
    assert_eq!(resp.required_headcount, 2);
}

#[test]
fn single_nurse_overlapping_shifts_leaves_capacity_gap() {
    let mut req = october();
    req.staff = vec![nurse("alice", 1)];
    req.shifts = vec![
        shift("a", at(2, 8), at(2, 14), "NURSE", 1),
        shift("b", at(2, 12), at(2, 18), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Partial);
    assert_eq!(resp.assignments.len(), 1);
    assert_eq!(resp.assignments[0].shift_id.as_str(), "a");
    assert_eq!(resp.gaps.len(), 1);
    let gap = &resp.gaps[0];
    assert_eq!(gap.shift_id.as_str(), "b");
    assert_eq!(gap.reason, GapReason::CapacityExhausted);
    assert_eq!((gap.required, gap.covered, gap.unmet), (1, 0, 1));
}

#[test]
fn missing_role_reports_no_eligible_staff() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3)];
    req.shifts = vec![shift("ward", at(3, 8), at(3, 16), "DOCTOR", 1)];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Partial);
    assert!(resp.assignments.is_empty());
    assert_eq!(resp.gaps[0].reason, GapReason::NoEligibleStaff);
}

#[test]
fn zero_headcount_is_rejected_before_solving() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3)];
    req.shifts = vec![shift("broken", at(3, 8), at(3, 16), "NURSE", 0)];

    let err = resolve(&req).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidShift { ref id, .. } if id == "broken"));
    assert!(err.is_input_error());
    assert_eq!(err.http_status(), 422);
}

#[test]
fn invalid_inputs_are_typed_errors() {
    let mut req = october();
    assert_eq!(
        resolve(&req).unwrap_err(),
        ResolveError::EmptyRequest("no shifts to resolve")
    );

    req.shifts = vec![shift("late", at(30, 8), at(31, 8), "NURSE", 1)];
    req.period_end = at(30, 0);
    assert!(matches!(
        resolve(&req).unwrap_err(),
        ResolveError::InvalidShift { .. }
    ));

    let mut req = october();
    req.shifts = vec![shift("s", at(3, 8), at(3, 16), "NURSE", 1)];
    req.staff = vec![nurse("alice", 1).with_min_rest_minutes(-5)];
    assert!(matches!(
        resolve(&req).unwrap_err(),
        ResolveError::InvalidStaffMember { ref id, .. } if id == "alice"
    ));

    req.staff = vec![nurse("alice", 1), nurse("alice", 2)];
    assert!(matches!(
        resolve(&req).unwrap_err(),
        ResolveError::InvalidStaffMember { .. }
    ));
}

#[test]
fn empty_staff_is_partial_not_an_error() {
    let mut req = october();
    req.shifts = vec![shift("s", at(3, 8), at(3, 16), "NURSE", 2)];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Partial);
    assert_eq!(resp.gaps[0].unmet, 2);
    assert_eq!(resp.gaps[0].reason, GapReason::NoEligibleStaff);
}

#[test]
fn specialty_and_availability_filter_eligibility() {
    let mut req = october();
    let cardio = nurse("cardio", 3).with_specialty("cardio");
    let plain = nurse("plain", 3);
    let absent = StaffMember::new(StaffId::new("absent"), "NURSE", 3)
        .with_specialty("cardio")
        .with_availability(TimeWindow::new(at(20, 0), at(25, 0)).unwrap());
    req.staff = vec![absent, cardio, plain];
    req.shifts = vec![shift("icu", at(4, 8), at(4, 16), "NURSE", 1).with_specialty("cardio")];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Feasible);
    assert_eq!(resp.assignments[0].staff_id.as_str(), "cardio");
}

#[test]
fn insufficient_eligible_staff_when_all_are_used() {
    let mut req = october();
    req.staff = vec![nurse("alice", 2)];
    req.shifts = vec![shift("pair", at(5, 8), at(5, 16), "NURSE", 2)];

    let resp = resolve(&req).unwrap();
    let gap = resp.gap_for(&ShiftId::new("pair")).unwrap();
    assert_eq!(gap.reason, GapReason::InsufficientEligibleStaff);
    assert_eq!(gap.covered, 1);
    assert_eq!(gap.unmet, 1);
}

#[test]
fn overlap_with_quota_left_is_capacity_exhausted() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3)];
    req.shifts = vec![
        shift("a", at(6, 8), at(6, 14), "NURSE", 1),
        shift("b", at(6, 12), at(6, 18), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments.len(), 1);
    assert_eq!(resp.gaps[0].reason, GapReason::CapacityExhausted);
}

#[test]
fn short_rest_with_quota_left_is_capacity_exhausted() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3).with_min_rest_minutes(11 * 60)];
    req.shifts = vec![
        shift("early", at(6, 8), at(6, 14), "NURSE", 1),
        shift("evening", at(6, 18), at(6, 22), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Partial);
    assert_eq!(resp.assignments.len(), 1);
    let gap = &resp.gaps[0];
    assert_eq!(gap.shift_id.as_str(), "evening");
    assert_eq!(gap.reason, GapReason::CapacityExhausted);
    assert!(!gap.reasons.contains(&GapReason::Contended));
}

#[test]
fn day_night_day_chain_keeps_both_days() {
    let mut req = october();
    req.staff = vec![nurse("alice", 3).with_min_rest_minutes(11 * 60)];
    req.shifts = vec![
        shift("d1", at(2, 8), at(2, 20), "NURSE", 1),
        shift("n1", at(2, 20), at(3, 8), "NURSE", 1),
        shift("d2", at(3, 8), at(3, 20), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    let mut ids: Vec<&str> = resp.assignments.iter().map(|a| a.shift_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["d1", "d2"]);
    assert_eq!(resp.covered_headcount, 2);
    assert_eq!(resp.gaps.len(), 1);
    assert_eq!(resp.gaps[0].shift_id.as_str(), "n1");
    assert_eq!(resp.gaps[0].reason, GapReason::CapacityExhausted);
}

#[test]
fn month_of_days_and_nights_fills_the_quota() {
    let mut req = october();
    req.staff = vec![nurse("alice", 10).with_min_rest_minutes(11 * 60)];
    for d in 1..30 {
        req.shifts.push(shift(&format!("day-{d:02}"), at(d, 8), at(d, 20), "NURSE", 1));
        req.shifts.push(shift(&format!("night-{d:02}"), at(d, 20), at(d + 1, 8), "NURSE", 1));
    }

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.covered_headcount, 10);
    assert_eq!(resp.assignments.len(), 10);

    let mut windows: Vec<(DateTime<Utc>, DateTime<Utc>)> = resp
        .assignments
        .iter()
        .filter_map(|a| req.shifts.iter().find(|s| s.id == a.shift_id))
        .map(|s| (s.start, s.end))
        .collect();
    assert_eq!(windows.len(), 10);
    windows.sort_unstable();
    for pair in windows.windows(2) {
        assert!(pair[1].0 - pair[0].1 >= chrono::Duration::hours(11));
    }
}

#[test]
fn max_hours_counts_short_shifts_first() {
    let mut req = october();
    req.staff = vec![nurse("alice", 5).with_max_hours(20)];
    req.shifts = vec![
        shift("long-a", at(20, 8), at(20, 20), "NURSE", 1),
        shift("long-b", at(22, 8), at(22, 20), "NURSE", 1),
        shift("short", at(24, 8), at(24, 12), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.covered_headcount, 2);
    assert!(resp.assignments_for(&ShiftId::new("short")).next().is_some());
    assert_eq!(resp.workload.per_staff[0].assigned_minutes, 16 * 60);
    assert_eq!(resp.gaps.len(), 1);
}

#[test]
fn higher_priority_shift_wins_scarce_staff() {
    let mut req = october();
    req.staff = vec![nurse("alice", 1)];
    req.shifts = vec![
        shift("a", at(7, 8), at(7, 14), "NURSE", 1),
        shift("b", at(7, 12), at(7, 18), "NURSE", 1).with_priority(5),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments.len(), 1);
    assert_eq!(resp.assignments[0].shift_id.as_str(), "b");
    assert_eq!(resp.gaps[0].shift_id.as_str(), "a");
}

#[test]
fn rest_rule_keeps_close_shifts_apart() {
    let mut req = october();
    req.staff = vec![nurse("alice", 5).with_min_rest_minutes(11 * 60)];
    req.shifts = vec![
        shift("night", at(8, 20), at(9, 8), "NURSE", 1),
        shift("morning", at(9, 12), at(9, 18), "NURSE", 1),
        shift("later", at(10, 8), at(10, 14), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    let ids: Vec<&str> = resp.assignments.iter().map(|a| a.shift_id.as_str()).collect();
    assert_eq!(resp.assignments.len(), 2);
    assert!(ids.contains(&"later"));
    assert!(!(ids.contains(&"night") && ids.contains(&"morning")));
}

#[test]
fn committed_shifts_consume_quota_and_block_rest() {
    let mut req = october();
    req.staff = vec![nurse("alice", 2)
        .with_min_rest_minutes(8 * 60)
        .with_committed(TimeWindow::new(at(11, 8), at(11, 16)).unwrap())];
    req.shifts = vec![
        shift("too-close", at(11, 18), at(11, 22), "NURSE", 1),
        shift("x", at(13, 8), at(13, 16), "NURSE", 1),
        shift("y", at(14, 8), at(14, 16), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments.len(), 1);
    assert!(resp.assignments_for(&ShiftId::new("too-close")).next().is_none());
}

#[test]
fn max_hours_bounds_assigned_minutes() {
    let mut req = october();
    req.staff = vec![nurse("alice", 5).with_max_hours(8)];
    req.shifts = vec![
        shift("s1", at(12, 8), at(12, 12), "NURSE", 1),
        shift("s2", at(13, 8), at(13, 12), "NURSE", 1),
        shift("s3", at(14, 8), at(14, 12), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments.len(), 2);
    assert_eq!(resp.workload.per_staff[0].assigned_minutes, 8 * 60);
}

#[test]
fn group_cap_limits_shifts_per_period() {
    let mut req = october();
    req.max_shifts_per_group = Some(1);
    req.staff = vec![nurse("alice", 5)];
    req.shifts = vec![
        shift("w1a", at(13, 8), at(13, 12), "NURSE", 1).with_group("2025-W42"),
        shift("w1b", at(15, 8), at(15, 12), "NURSE", 1).with_group("2025-W42"),
        shift("w2", at(20, 8), at(20, 12), "NURSE", 1).with_group("2025-W43"),
    ];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments.len(), 2);
    assert!(resp.assignments_for(&ShiftId::new("w2")).next().is_some());
    assert_eq!(resp.gaps.len(), 1);
}

#[test]
fn fairness_spreads_load_evenly() {
    let mut req = october();
    req.staff = vec![nurse("alice", 4), nurse("bob", 4)];
    req.shifts = (0..4)
        .map(|d| shift(&format!("s{d}"), at(16 + d, 8), at(16 + d, 16), "NURSE", 1))
        .collect();

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.status, ResolveStatus::Feasible);
    assert_eq!(resp.workload.total_assignments, 4);
    assert_eq!(resp.workload.mean_per_staff, 2.0);
    assert_eq!(resp.workload.std_dev, 0.0);
    for load in &resp.workload.per_staff {
        assert_eq!(load.assigned, 2);
    }
}

#[test]
fn avoided_shift_goes_to_someone_else() {
    let mut req = october();
    let mut alice = nurse("alice", 2);
    alice.avoid.push(ShiftId::new("night"));
    req.staff = vec![alice, nurse("bob", 2)];
    req.shifts = vec![shift("night", at(18, 20), at(19, 6), "NURSE", 1)];

    let resp = resolve(&req).unwrap();
    assert_eq!(resp.assignments[0].staff_id.as_str(), "bob");
}

#[test]
fn summary_line_lists_gaps() {
    let mut req = october();
    req.staff = vec![nurse("alice", 1)];
    req.shifts = vec![
        shift("a", at(2, 8), at(2, 14), "NURSE", 1),
        shift("b", at(2, 12), at(2, 18), "NURSE", 1),
    ];

    let resp = resolve(&req).unwrap();
    insta::assert_snapshot!(resp.to_string(), @"PARTIAL covered=1/2 gaps=b:CAPACITY_EXHAUSTED");
}
