//! Persistence bridge: mirrors employee records into a SQLite table.
//!
//! Every write runs inside a transaction that is committed only on success.
//! Dropping an uncommitted `sqlx::Transaction` rolls it back, so an early
//! return through `?` leaves the table as it was.

use crate::columns::Field;
use crate::employee::Employee;
use crate::error::{DashboardError, Result};
use crate::store::RecordStore;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    employee_id TEXT NOT NULL UNIQUE,
    national_id TEXT NOT NULL UNIQUE,
    birth_date TEXT,
    education TEXT,
    position TEXT,
    job_category TEXT,
    department TEXT,
    affiliation TEXT,
    workplace TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const COLUMNS: &str = "id, name, employee_id, national_id, birth_date, education, position, \
    job_category, department, affiliation, workplace, created_at, updated_at";

/// Open a SQLite pool. Only `sqlite:` URLs are accepted.
///
/// The pool holds exactly one long-lived connection, which keeps an
/// in-memory database alive for the life of the pool.
pub async fn open_pool(url: &str) -> Result<SqlitePool> {
    if !url.starts_with("sqlite:") {
        return Err(DashboardError::validation(format!(
            "unsupported database URL `{url}`; only sqlite: URLs are supported"
        )));
    }
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// A row of the `employees` table
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredEmployee {
    pub id: i64,
    pub name: String,
    pub employee_id: String,
    pub national_id: String,
    pub birth_date: Option<NaiveDate>,
    pub education: Option<String>,
    pub position: Option<String>,
    pub job_category: Option<String>,
    pub department: Option<String>,
    pub affiliation: Option<String>,
    pub workplace: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<StoredEmployee> for Employee {
    fn from(row: StoredEmployee) -> Self {
        Employee {
            name: row.name,
            employee_id: row.employee_id,
            national_id: row.national_id,
            birth_date: row.birth_date.into(),
            education: row.education,
            position: row.position,
            job_category: row.job_category,
            department: row.department,
            affiliation: row.affiliation,
            workplace: row.workplace,
        }
    }
}

/// Partial update; absent fields are left unchanged, an empty string clears
/// an optional field
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub employee_id: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub education: Option<String>,
    pub position: Option<String>,
    pub job_category: Option<String>,
    pub department: Option<String>,
    pub affiliation: Option<String>,
    pub workplace: Option<String>,
}

impl EmployeePatch {
    fn entries(&self) -> [(Field, &Option<String>); 10] {
        [
            (Field::Name, &self.name),
            (Field::EmployeeId, &self.employee_id),
            (Field::NationalId, &self.national_id),
            (Field::BirthDate, &self.birth_date),
            (Field::Education, &self.education),
            (Field::Position, &self.position),
            (Field::JobCategory, &self.job_category),
            (Field::Department, &self.department),
            (Field::Affiliation, &self.affiliation),
            (Field::Workplace, &self.workplace),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, v)| v.is_none())
    }

    pub fn apply(&self, employee: &mut Employee) {
        for (field, value) in self.entries() {
            if let Some(value) = value {
                employee.set(field, value);
            }
        }
    }
}

/// Outcome of a batch import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

impl ImportSummary {
    pub fn message(&self) -> String {
        format!(
            "Import completed: {} records imported, {} records updated, {} errors.",
            self.inserted, self.updated, self.errors
        )
    }
}

enum Upserted {
    Inserted,
    Updated,
}

#[derive(Clone, Debug)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    /// Connect and make sure the table exists
    pub async fn connect(url: &str) -> Result<Self> {
        let repo = Self::from_pool(open_pool(url).await?);
        repo.initialize().await?;
        Ok(repo)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the table; safe to call repeatedly
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        info!("Database tables ready");
        Ok(())
    }

    /// Insert or update every row keyed by employee number.
    ///
    /// With `replace_existing` the table is emptied first, in the same
    /// transaction. Rows that fail validation or break a table constraint
    /// are counted and skipped; any other failure rolls the whole batch back.
    pub async fn upsert_batch(&self, rows: &[Employee], replace_existing: bool) -> Result<ImportSummary> {
        let mut tx = self.pool.begin().await?;
        if replace_existing {
            let deleted = sqlx::query("DELETE FROM employees")
                .execute(&mut *tx)
                .await?
                .rows_affected();
            info!("Deleted {} existing records before import", deleted);
        }

        let mut summary = ImportSummary::default();
        for row in rows {
            match upsert_row(&mut tx, row).await {
                Ok(Upserted::Inserted) => summary.inserted += 1,
                Ok(Upserted::Updated) => summary.updated += 1,
                Err(e) if is_row_error(&e) => {
                    summary.errors += 1;
                    error!("Error importing employee {}: {}", row.employee_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;
        info!("{}", summary.message());
        Ok(summary)
    }

    /// Insert a new employee; an existing employee number is an error
    pub async fn add_one(&self, row: &Employee) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if find_id(&mut tx, &row.employee_id).await?.is_some() {
            return Err(DashboardError::DuplicateKey(format!(
                "employee number {} already exists",
                row.employee_id
            )));
        }
        insert_row(&mut tx, row).await?;
        tx.commit().await?;
        info!("Added employee {}", row.employee_id);
        Ok(())
    }

    /// Merge `patch` into the employee with number `employee_id`
    pub async fn update_one(&self, employee_id: &str, patch: &EmployeePatch) -> Result<Employee> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query_as::<_, StoredEmployee>(&format!(
            "SELECT {COLUMNS} FROM employees WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DashboardError::NotFound(format!("employee number {employee_id}")))?;

        let id = existing.id;
        let mut employee = Employee::from(existing);
        patch.apply(&mut employee);
        employee.validate_keys()?;
        let birth_date = employee.birth_date.to_stored()?;

        sqlx::query(
            "UPDATE employees SET name = ?, employee_id = ?, national_id = ?, birth_date = ?, \
             education = ?, position = ?, job_category = ?, department = ?, affiliation = ?, \
             workplace = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&employee.name)
        .bind(&employee.employee_id)
        .bind(&employee.national_id)
        .bind(birth_date)
        .bind(&employee.education)
        .bind(&employee.position)
        .bind(&employee.job_category)
        .bind(&employee.department)
        .bind(&employee.affiliation)
        .bind(&employee.workplace)
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(unique_violation)?;

        tx.commit().await?;
        info!("Updated employee {}", employee_id);
        Ok(employee)
    }

    pub async fn delete_one(&self, employee_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM employees WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DashboardError::NotFound(format!("employee number {employee_id}")));
        }
        tx.commit().await?;
        info!("Deleted employee {}", employee_id);
        Ok(())
    }

    /// Every row, ordered by surrogate id
    pub async fn fetch_all(&self) -> Result<Vec<Employee>> {
        let rows = sqlx::query_as::<_, StoredEmployee>(&format!(
            "SELECT {COLUMNS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    pub async fn find(&self, employee_id: &str) -> Result<Option<StoredEmployee>> {
        let row = sqlx::query_as::<_, StoredEmployee>(&format!(
            "SELECT {COLUMNS} FROM employees WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// The table as a record store
    pub async fn load_store(&self) -> Result<RecordStore> {
        let rows = self.fetch_all().await?;
        info!("Loaded {} employees from the database", rows.len());
        RecordStore::new(rows)
    }
}

async fn upsert_row(tx: &mut Transaction<'_, Sqlite>, row: &Employee) -> Result<Upserted> {
    row.validate_keys()?;
    let birth_date = row.birth_date.to_stored()?;

    match find_id(tx, &row.employee_id).await? {
        Some(id) => {
            sqlx::query(
                "UPDATE employees SET name = ?, national_id = ?, birth_date = ?, education = ?, \
                 position = ?, job_category = ?, department = ?, affiliation = ?, workplace = ?, \
                 updated_at = ? WHERE id = ?",
            )
            .bind(&row.name)
            .bind(&row.national_id)
            .bind(birth_date)
            .bind(&row.education)
            .bind(&row.position)
            .bind(&row.job_category)
            .bind(&row.department)
            .bind(&row.affiliation)
            .bind(&row.workplace)
            .bind(now())
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(unique_violation)?;
            Ok(Upserted::Updated)
        }
        None => {
            insert_row(tx, row).await?;
            Ok(Upserted::Inserted)
        }
    }
}

async fn insert_row(tx: &mut Transaction<'_, Sqlite>, row: &Employee) -> Result<()> {
    row.validate_keys()?;
    let birth_date = row.birth_date.to_stored()?;
    let stamp = now();
    sqlx::query(
        "INSERT INTO employees (name, employee_id, national_id, birth_date, education, position, \
         job_category, department, affiliation, workplace, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.name)
    .bind(&row.employee_id)
    .bind(&row.national_id)
    .bind(birth_date)
    .bind(&row.education)
    .bind(&row.position)
    .bind(&row.job_category)
    .bind(&row.department)
    .bind(&row.affiliation)
    .bind(&row.workplace)
    .bind(stamp)
    .bind(stamp)
    .execute(&mut **tx)
    .await
    .map_err(unique_violation)?;
    Ok(())
}

async fn find_id(tx: &mut Transaction<'_, Sqlite>, employee_id: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM employees WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(id)
}

/// Failures that only concern one row of a batch; anything else is fatal
fn is_row_error(e: &DashboardError) -> bool {
    match e {
        DashboardError::Validation(_) | DashboardError::DuplicateKey(_) => true,
        DashboardError::Persistence(sqlx::Error::Database(db)) => matches!(
            db.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation
        ),
        _ => false,
    }
}

/// Unique-constraint failures become `DuplicateKey`; everything else stays
/// a persistence error
fn unique_violation(e: sqlx::Error) -> DashboardError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            warn!("Unique constraint rejected a row: {}", db.message());
            DashboardError::DuplicateKey(db.message().to_string())
        }
        _ => DashboardError::Persistence(e),
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
