#![forbid(unsafe_code)]
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use shift_resolver::{
    generate_shifts, generate_shifts_within, load_template_from_file, GroupBy, Slot, Template,
    TimeWindow,
};
use tempfile::tempdir;

fn sample_template() -> Template {
    Template {
        id: "ward".into(),
        name: "Ward rotation".into(),
        description: Some("Jour et nuit, renfort le week-end".into()),
        rotation_cycle_days: 7,
        group_by: Some(GroupBy::Week),
        slots: vec![
            Slot {
                role: "NURSE".into(),
                specialty: None,
                start_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                days: vec![1, 2, 3, 4, 5, 6, 7],
                headcount: 1,
                priority: 1,
            },
            Slot {
                role: "DOCTOR".into(),
                specialty: Some("cardio".into()),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                days: vec![6, 7],
                headcount: 2,
                priority: 3,
            },
        ],
    }
}

#[test]
fn load_template_from_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ward.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&sample_template()).unwrap()).unwrap();

    let loaded = load_template_from_file(&path).unwrap();
    assert_eq!(loaded.id, "ward");
    assert_eq!(loaded.slots.len(), 2);
    assert_eq!(loaded.group_by, Some(GroupBy::Week));
}

#[test]
fn generate_shifts_from_template() {
    let template = sample_template();
    let start = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap(); // vendredi
    let end = NaiveDate::from_ymd_opt(2025, 10, 28).unwrap(); // mardi

    let shifts = generate_shifts(&template, start, end).unwrap();
    // 5 nuits + 2 journées de week-end
    assert_eq!(shifts.len(), 7);

    let weekend: Vec<_> = shifts.iter().filter(|s| s.role.as_str() == "DOCTOR").collect();
    assert_eq!(weekend.len(), 2);
    assert!(weekend.iter().all(|s| s.headcount == 2 && s.priority == 3));
    assert!(weekend.iter().all(|s| s.specialty.as_deref() == Some("cardio")));

    let first_night = shifts
        .iter()
        .find(|s| s.id.as_str() == "ward-2025-10-24-1")
        .unwrap();
    assert_eq!(first_night.start, Utc.with_ymd_and_hms(2025, 10, 24, 20, 0, 0).unwrap());
    assert_eq!(first_night.end, Utc.with_ymd_and_hms(2025, 10, 25, 8, 0, 0).unwrap());
    assert_eq!(first_night.group.as_deref(), Some("2025-W43"));

    let monday = shifts
        .iter()
        .find(|s| s.id.as_str() == "ward-2025-10-27-1")
        .unwrap();
    assert_eq!(monday.group.as_deref(), Some("2025-W44"));

    for pair in shifts.windows(2) {
        assert!(pair[0].start <= pair[1].start);
    }
}

#[test]
fn cycle_days_and_month_groups() {
    let mut template = sample_template();
    template.rotation_cycle_days = 3;
    template.group_by = Some(GroupBy::Month);
    template.slots.truncate(1);
    template.slots[0].days = vec![8]; // premier jour du cycle

    let start = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
    let shifts = generate_shifts(&template, start, end).unwrap();

    let ids: Vec<&str> = shifts.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["ward-2025-10-30-1", "ward-2025-11-02-1", "ward-2025-11-05-1"]
    );
    assert_eq!(shifts[0].group.as_deref(), Some("2025-10"));
    assert_eq!(shifts[1].group.as_deref(), Some("2025-11"));
}

#[test]
fn invalid_template_is_rejected() {
    let mut template = sample_template();
    template.slots[0].days.clear();
    let day = NaiveDate::from_ymd_opt(2025, 10, 24).unwrap();
    assert!(generate_shifts(&template, day, day).is_err());

    let template = sample_template();
    let before = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
    assert!(generate_shifts(&template, day, before).is_err());
}

#[test]
fn shifts_past_the_period_end_are_skipped() {
    let template = sample_template();
    // vendredi 24 au dimanche 26 inclus
    let period = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 10, 24, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 10, 27, 0, 0, 0).unwrap(),
    )
    .unwrap();

    let (shifts, skipped) = generate_shifts_within(&template, &period).unwrap();
    assert_eq!(skipped, 1);
    assert!(shifts.iter().all(|s| s.start >= period.start && s.end <= period.end));
    assert!(!shifts.iter().any(|s| s.id.as_str() == "ward-2025-10-26-1"));
    // 2 nuits + 2 journées de week-end
    assert_eq!(shifts.len(), 4);
}
