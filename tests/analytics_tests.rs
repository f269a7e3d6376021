mod common;

use common::{employee, roster, today};
use hr_dashboard::analytics::{
    self, AGE_BANDS, RetirementPolicy, age_band_counts, department_overview, profile,
};
use hr_dashboard::graph::{self, GraphOptions};
use hr_dashboard::notifications::{self, NotificationKind, Priority};
use hr_dashboard::report::TOTAL_LABEL;
use hr_dashboard::{Field, RecordStore, slides};
use std::io::{Cursor, Read};

#[test]
fn age_bands_skip_rows_without_a_date() {
    let store = roster();
    let counts = age_band_counts(&store.full_view(), today());
    assert_eq!(
        counts,
        vec![
            (AGE_BANDS[0], 0),
            (AGE_BANDS[1], 1),
            (AGE_BANDS[2], 1),
            (AGE_BANDS[3], 0),
            (AGE_BANDS[4], 1),
        ]
    );
}

#[test]
fn age_band_crosstab_uses_band_order_and_margins() {
    let store = roster();
    let tab = analytics::age_bands_by_department(&store.full_view(), today());
    let mut expected: Vec<String> = AGE_BANDS.iter().map(|b| b.to_string()).collect();
    expected.retain(|b| tab.col_labels.contains(b));
    assert_eq!(tab.col_labels, expected);
    assert_eq!(tab.grand_total(), 3);
    assert_eq!(tab.get("Sales", AGE_BANDS[4]), 1);

    let table = tab.to_table();
    assert_eq!(table.headers[0], Field::Department.label());
    assert_eq!(table.headers.last().map(String::as_str), Some(TOTAL_LABEL));
}

#[test]
fn department_overview_in_first_seen_order() {
    let store = roster();
    let overview = department_overview(&store.full_view(), today());
    let names: Vec<&str> = overview.iter().map(|d| d.department.as_str()).collect();
    assert_eq!(names, vec!["Sales", "HR", "IT"]);

    let sales = &overview[0];
    assert_eq!(sales.employees, 3);
    assert_eq!(
        sales.job_categories,
        vec![("A".to_string(), 2), ("B".to_string(), 1)]
    );
    assert!(sales.average_age.is_some_and(|a| (53.0..54.0).contains(&a)));
    // IT's only member has a free-text birth date
    assert_eq!(overview[2].average_age, None);

    let averages = analytics::average_age_by_department(&store.full_view(), today());
    assert_eq!(averages.len(), 2);
}

#[test]
fn profile_of_an_employee_near_retirement() {
    let store = roster();
    let sara = store.find("1003").unwrap();
    let card = profile(sara, today(), &RetirementPolicy::default());
    assert_eq!(card.age, Some(62.4));
    assert_eq!(card.remaining_years, Some(2.6));
    assert!(card.service_ratio.is_some_and(|r| r > 0.95 && r < 0.97));
}

#[test]
fn notifications_flag_missing_data_and_retirement() {
    let store = roster();
    let found = notifications::check(&store.full_view(), today(), &RetirementPolicy::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, NotificationKind::RetirementAge);
    assert_eq!(found[0].priority, Priority::Medium);
    assert_eq!(found[0].employee_id, "1003");

    let sparse = RecordStore::new(vec![employee("Hala", "77", "", "1950-01-01")]).unwrap();
    let found = notifications::check(&sparse.full_view(), today(), &RetirementPolicy::default());
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].priority, Priority::High);
    assert_eq!(
        found[0].message,
        format!(
            "الموظف Hala - 77 يحتاج لاستكمال: {}، {}",
            Field::Department.label(),
            Field::Position.label()
        )
    );
}

#[test]
fn warning_age_is_configurable() {
    let store = roster();
    let strict = RetirementPolicy {
        retirement_age: 65,
        warning_age: 40,
    };
    let found = notifications::check(&store.full_view(), today(), &strict);
    let ids: Vec<&str> = found.iter().map(|n| n.employee_id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1003"]);
}

#[test]
fn charts_render_svg() {
    let store = roster();
    let options = GraphOptions {
        max_bars: Some(1),
        ..GraphOptions::for_field(Field::Department)
    };
    let svg = graph::category_chart(&store.full_view(), Field::Department, &options).unwrap();
    assert!(svg.starts_with("<svg"));

    let ages = graph::age_histogram(&store.full_view(), today(), &GraphOptions::default()).unwrap();
    assert!(ages.starts_with("<svg"));

    assert!(graph::category_chart(&store.full_view(), Field::Name, &options).is_err());
}

#[test]
fn slide_deck_has_one_slide_per_department() {
    let store = roster();
    let outline = slides::outline(&store.full_view(), today());
    assert_eq!(outline.len(), 5);
    assert_eq!(outline[1].lines[0], "• إجمالي عدد الموظفين: 5");
    assert_eq!(outline[1].lines[2], "• أكبر إدارة: Sales (3 موظف)");
    assert_eq!(outline[2].title, "إدارة Sales");

    let bytes = slides::build(&store.full_view(), today()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    for n in 1..=5 {
        assert!(archive.by_name(&format!("ppt/slides/slide{n}.xml")).is_ok());
    }
    let mut xml = String::new();
    archive
        .by_name("ppt/slides/slide3.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("إدارة Sales"));
    assert!(xml.contains(r#"rtl="1""#));
}
