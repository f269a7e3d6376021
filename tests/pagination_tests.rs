mod common;

use common::{numbered, roster};
use hr_dashboard::DashboardError;
use hr_dashboard::filter::FilterConfig;
use hr_dashboard::login::Principal;
use hr_dashboard::pagination::{PageCursor, checked_page_size, paginate};
use hr_dashboard::session::{DataSource, SessionContext, expiry_after};

fn context(store: hr_dashboard::RecordStore, page_size: usize) -> SessionContext {
    let principal = Principal {
        login_id: "viewer".into(),
        is_admin: false,
    };
    SessionContext::new(principal, store, DataSource::None, page_size, expiry_after(1))
}

#[test]
fn hundred_and_one_rows_make_five_pages() {
    let store = numbered(101);
    let view = store.full_view();
    let mut cursor = PageCursor::default();

    let first = paginate(&view, 25, &mut cursor).unwrap();
    assert_eq!(first.page_count, 5);
    assert_eq!(first.rows.len(), 25);
    assert_eq!(first.rows[0].seq, 1);

    cursor.jump(5, 5).unwrap();
    let last = paginate(&view, 25, &mut cursor).unwrap();
    assert_eq!(last.rows.len(), 1);
    assert_eq!(last.rows[0].seq, 101);
    assert_eq!(last.rows[0].employee.employee_id, "101");
}

#[test]
fn jump_past_the_end_is_out_of_range_and_keeps_the_page() {
    let mut ctx = context(numbered(101), 25);
    ctx.jump(3).unwrap();
    match ctx.jump(6) {
        Err(DashboardError::OutOfRange { page, page_count }) => {
            assert_eq!((page, page_count), (6, 5));
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
    assert_eq!(ctx.current_page(), 3);
}

#[test]
fn sequence_numbers_continue_across_pages() {
    let mut ctx = context(numbered(30), 10);
    let mut seen = Vec::new();
    for _ in 0..3 {
        let page = ctx.page().unwrap();
        seen.extend(page.rows.iter().map(|r| r.seq));
        ctx.next_page().unwrap();
    }
    assert_eq!(seen, (1..=30).collect::<Vec<_>>());
    // next on the last page stays there
    assert_eq!(ctx.current_page(), 3);
}

#[test]
fn grid_has_sequence_column_first() {
    let mut ctx = context(roster(), 10);
    let (headers, rows) = ctx.page().unwrap().grid();
    assert_eq!(headers.len(), 11);
    assert_eq!(headers[0], "ت");
    assert_eq!(rows[0][0], "1");
    assert_eq!(rows[0][1], "Ahmed Ali");
}

#[test]
fn page_size_bounds() {
    assert!(checked_page_size(9).is_err());
    assert_eq!(checked_page_size(10).unwrap(), 10);
    assert_eq!(checked_page_size(100).unwrap(), 100);
    assert!(checked_page_size(101).is_err());
}

#[test]
fn narrowing_the_view_clamps_the_cursor() {
    let mut ctx = context(numbered(100), 10);
    ctx.jump(10).unwrap();
    ctx.apply_filter(FilterConfig {
        search_text: "Employee 1".into(),
        ..Default::default()
    })
    .unwrap();
    // 1, 10..=19 and 100 match
    assert_eq!(ctx.view().len(), 12);
    assert_eq!(ctx.page_count(), 2);
    assert_eq!(ctx.current_page(), 2);
}

#[test]
fn failed_filter_keeps_previous_view() {
    let mut ctx = context(roster(), 10);
    ctx.apply_filter(FilterConfig {
        department: Some("Sales".into()),
        ..Default::default()
    })
    .unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let bad = FilterConfig {
        date_range: Some(hr_dashboard::filter::DateRange { start, end }),
        ..Default::default()
    };
    assert!(ctx.apply_filter(bad).is_err());
    assert_eq!(ctx.view().len(), 3);
    assert_eq!(ctx.filter().department.as_deref(), Some("Sales"));
}

#[test]
fn switching_store_resets_filter_and_page() {
    let mut ctx = context(numbered(50), 10);
    ctx.jump(4).unwrap();
    ctx.apply_filter(FilterConfig {
        search_text: "Employee".into(),
        ..Default::default()
    })
    .unwrap();
    ctx.set_store(roster(), DataSource::Upload("roster.xlsx".into()));
    assert_eq!(ctx.current_page(), 1);
    assert_eq!(ctx.view().len(), 5);
    assert!(ctx.filter().is_noop());
    assert_eq!(ctx.source(), &DataSource::Upload("roster.xlsx".into()));
}
