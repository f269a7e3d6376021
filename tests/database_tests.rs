mod common;

use common::{employee, roster};
use hr_dashboard::{DashboardError, Field, loader};
use hr_dashboard::database::{EmployeePatch, EmployeeRepository};
use hr_dashboard::login::AuthGate;

async fn repository() -> EmployeeRepository {
    EmployeeRepository::connect("sqlite::memory:").await.unwrap()
}

#[tokio::test]
async fn rejects_non_sqlite_urls() {
    let err = EmployeeRepository::connect("postgres://localhost/hr").await.unwrap_err();
    assert!(matches!(err, DashboardError::Validation(_)));
}

#[tokio::test]
async fn import_counts_inserts_updates_and_bad_rows() {
    let repo = repository().await;
    let rows = roster().rows().to_vec();

    // 1004 carries a free-text birth date and is refused row by row
    let first = repo.upsert_batch(&rows, false).await.unwrap();
    assert_eq!((first.inserted, first.updated, first.errors), (4, 0, 1));
    assert_eq!(
        first.message(),
        "Import completed: 4 records imported, 0 records updated, 1 errors."
    );

    let second = repo.upsert_batch(&rows, false).await.unwrap();
    assert_eq!((second.inserted, second.updated, second.errors), (0, 4, 1));
    assert_eq!(repo.count().await.unwrap(), 4);
}

#[tokio::test]
async fn import_keeps_national_ids_unique() {
    let repo = repository().await;
    let mut clash = employee("Other", "2001", "HR", "1990-01-01");
    clash.national_id = "N1001".into();
    let rows = vec![employee("First", "1001", "HR", "1990-01-01"), clash];

    let summary = repo.upsert_batch(&rows, false).await.unwrap();
    assert_eq!((summary.inserted, summary.errors), (1, 1));
    assert!(repo.find("2001").await.unwrap().is_none());
}

#[tokio::test]
async fn replace_existing_empties_the_table_first() {
    let repo = repository().await;
    repo.upsert_batch(&roster().rows().to_vec(), false).await.unwrap();

    let fresh = vec![employee("New", "9001", "Ops", "1985-05-05")];
    let summary = repo.upsert_batch(&fresh, true).await.unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(repo.count().await.unwrap(), 1);

    let store = repo.load_store().await.unwrap();
    assert_eq!(store.rows()[0].employee_id, "9001");
}

#[tokio::test]
async fn uploaded_rows_with_bad_keys_are_counted_one_by_one() {
    let repo = repository().await;
    let header: Vec<&str> = Field::ALL.iter().map(|f| f.label()).collect();
    let blanks = format!(
        "{}\nAli,,N1\nOmar,,N2\nSara,1003,N3,1962-01-20\n",
        header.join(",")
    );
    let rows = loader::read_upload("staff.csv", blanks.as_bytes()).unwrap();
    let summary = repo.upsert_batch(&rows, false).await.unwrap();
    assert_eq!((summary.inserted, summary.updated, summary.errors), (1, 0, 2));

    // a number repeated inside one file upserts onto its first row
    let repeated = format!("{}\nAli,7,N7\nAli Omar,7,N8\n", header.join(","));
    let rows = loader::read_upload("staff.csv", repeated.as_bytes()).unwrap();
    let summary = repo.upsert_batch(&rows, false).await.unwrap();
    assert_eq!((summary.inserted, summary.updated, summary.errors), (1, 1, 0));
    let stored = repo.find("7").await.unwrap().unwrap();
    assert_eq!((stored.name.as_str(), stored.national_id.as_str()), ("Ali Omar", "N8"));
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn fatal_failure_after_replace_restores_the_table() {
    let repo = repository().await;
    repo.upsert_batch(&roster().rows().to_vec(), false).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER halt_import BEFORE INSERT ON employees \
         WHEN NEW.employee_id = 'halt' BEGIN SELECT RAISE(ABORT, 'import halted'); END",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let rows = vec![
        employee("New", "9001", "Ops", "1985-05-05"),
        employee("Halt", "halt", "Ops", "1985-05-05"),
    ];
    let err = repo.upsert_batch(&rows, true).await.unwrap_err();
    assert!(matches!(err, DashboardError::Persistence(_)));

    assert_eq!(repo.count().await.unwrap(), 4);
    assert!(repo.find("1001").await.unwrap().is_some());
    assert!(repo.find("9001").await.unwrap().is_none());
}

#[tokio::test]
async fn add_update_delete_round() {
    let repo = repository().await;
    let ahmed = employee("Ahmed", "1001", "Sales", "1980-03-15");
    repo.add_one(&ahmed).await.unwrap();

    let dup = repo.add_one(&ahmed).await.unwrap_err();
    assert!(matches!(dup, DashboardError::DuplicateKey(_)));

    let patch = EmployeePatch {
        department: Some("HR".into()),
        workplace: Some("Tripoli".into()),
        ..Default::default()
    };
    let updated = repo.update_one("1001", &patch).await.unwrap();
    assert_eq!(updated.department.as_deref(), Some("HR"));
    assert_eq!(updated.name, "Ahmed");

    let stored = repo.find("1001").await.unwrap().unwrap();
    assert_eq!(stored.workplace.as_deref(), Some("Tripoli"));
    assert!(stored.updated_at >= stored.created_at);

    let missing = repo.update_one("404", &patch).await.unwrap_err();
    assert!(matches!(missing, DashboardError::NotFound(_)));

    repo.delete_one("1001").await.unwrap();
    let gone = repo.delete_one("1001").await.unwrap_err();
    assert!(matches!(gone, DashboardError::NotFound(_)));
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn update_cannot_steal_another_national_id() {
    let repo = repository().await;
    repo.add_one(&employee("A", "1", "X", "")).await.unwrap();
    repo.add_one(&employee("B", "2", "X", "")).await.unwrap();

    let patch = EmployeePatch {
        national_id: Some("N1".into()),
        ..Default::default()
    };
    let err = repo.update_one("2", &patch).await.unwrap_err();
    assert!(matches!(err, DashboardError::DuplicateKey(_)));
    assert_eq!(repo.find("2").await.unwrap().unwrap().national_id, "N2");
}

#[tokio::test]
async fn auth_gate_checks_credentials() {
    let repo = repository().await;
    let gate = AuthGate::new(repo.pool().clone(), "admin", Some("s3cret")).await.unwrap();

    let admin = gate.verify("admin", "s3cret").await.unwrap();
    assert!(admin.is_admin);
    assert!(matches!(gate.verify("admin", "wrong").await, Err(DashboardError::Auth)));
    assert!(matches!(gate.verify("nobody", "s3cret").await, Err(DashboardError::Auth)));

    gate.add_user("clerk", "pw", false).await.unwrap();
    let dup = gate.add_user("clerk", "other", false).await.unwrap_err();
    assert!(matches!(dup, DashboardError::DuplicateKey(_)));
    assert!(!gate.verify("clerk", "pw").await.unwrap().is_admin);

    gate.change_password("clerk", "pw", "pw2").await.unwrap();
    assert!(gate.verify("clerk", "pw").await.is_err());
    assert!(gate.verify("clerk", "pw2").await.is_ok());
    assert!(gate.change_password("clerk", "wrong", "pw3").await.is_err());

    let users = gate.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn bootstrap_admin_cannot_be_deleted() {
    let repo = repository().await;
    let gate = AuthGate::new(repo.pool().clone(), "admin", None).await.unwrap();

    let err = gate.delete_user("admin").await.unwrap_err();
    assert!(matches!(err, DashboardError::Forbidden(_)));

    let err = gate.delete_user("ghost").await.unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(_)));

    // a second start keeps the existing admin
    let again = AuthGate::new(repo.pool().clone(), "admin", Some("ignored")).await.unwrap();
    assert!(again.verify("admin", "ignored").await.is_err());
}
