use chrono::NaiveDate;
use gridver_temporal::{HourGroup, TimeManager};

#[test]
fn test_groups_partition_expanded_times() {
    let tm = TimeManager::new(
        NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        vec![HourGroup::new("synoptic", [0, 12]), HourGroup::new("off", [6, 18])],
        vec![
            HourGroup::new("short", [1, 2, 3]),
            HourGroup::new("medium", [24, 48]),
        ],
    )
    .unwrap();

    let times = tm.expand_verification_times();
    let groups = tm.group_times_for_processing();
    assert_eq!(times.len(), 5 * 4 * 5);
    assert_eq!(groups.len(), 4);
    assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), times.len());

    for group in &groups {
        assert!(!group.is_empty());
        for entry in &group.times {
            assert_eq!(entry.group_key(), group.key);
            assert!(entry.valid_time >= entry.init_time());
        }
    }
    // leap day is in range
    assert!(times.iter().any(|t| t.date == NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
}
