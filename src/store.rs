use crate::columns::Field;
use crate::employee::Employee;
use crate::error::{DashboardError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// The full in-memory set of employee records for a session.
///
/// Cloning is cheap: the rows are shared behind an `Arc` and never mutated
/// in place. Replacing the data means building a new store.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    rows: Arc<Vec<Employee>>,
}

impl RecordStore {
    /// Build a store, enforcing uniqueness of both natural keys
    pub fn new(rows: Vec<Employee>) -> Result<Self> {
        let mut employee_ids = HashSet::with_capacity(rows.len());
        let mut national_ids = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !row.employee_id.is_empty() && !employee_ids.insert(row.employee_id.as_str()) {
                return Err(DashboardError::DuplicateKey(format!(
                    "employee number {} appears more than once",
                    row.employee_id
                )));
            }
            if !row.national_id.is_empty() && !national_ids.insert(row.national_id.as_str()) {
                return Err(DashboardError::DuplicateKey(format!(
                    "national ID {} appears more than once",
                    row.national_id
                )));
            }
        }
        Ok(RecordStore {
            rows: Arc::new(rows),
        })
    }

    pub fn empty() -> Self {
        RecordStore::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Employee] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Employee> {
        self.rows.get(index)
    }

    /// Exact lookup by employee number
    pub fn find(&self, employee_id: &str) -> Option<&Employee> {
        let employee_id = employee_id.trim();
        if employee_id.is_empty() {
            return None;
        }
        self.rows.iter().find(|e| e.employee_id == employee_id)
    }

    /// Distinct non-empty values of a field in first-seen order
    pub fn distinct(&self, field: Field) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in self.rows.iter() {
            if let Some(value) = row.value(field) {
                if seen.insert(value.clone()) {
                    out.push(value.into_owned());
                }
            }
        }
        out
    }

    /// A view over every row
    pub fn full_view(&self) -> View {
        View {
            store: self.clone(),
            indices: Arc::from((0..self.len()).collect::<Vec<_>>()),
        }
    }

    pub fn same_as(&self, other: &RecordStore) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }
}

/// A derived, read-only subset of a [`RecordStore`], in store order.
#[derive(Clone, Debug)]
pub struct View {
    store: RecordStore,
    indices: Arc<[usize]>,
}

impl View {
    pub(crate) fn from_indices(store: &RecordStore, indices: Vec<usize>) -> View {
        View {
            store: store.clone(),
            indices: Arc::from(indices),
        }
    }

    pub fn empty(store: &RecordStore) -> View {
        View::from_indices(store, Vec::new())
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Store positions of the rows in this view
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn rows(&self) -> impl Iterator<Item = &Employee> + '_ {
        self.indices.iter().filter_map(|&i| self.store.get(i))
    }

    /// Rows `start..end` of the view, clamped to its length
    pub fn slice(&self, start: usize, end: usize) -> impl Iterator<Item = &Employee> + '_ {
        let end = end.min(self.len());
        let start = start.min(end);
        self.indices[start..end]
            .iter()
            .filter_map(|&i| self.store.get(i))
    }

    /// Materialize the view's rows
    pub fn to_vec(&self) -> Vec<Employee> {
        self.rows().cloned().collect()
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.store.same_as(&other.store) && self.indices == other.indices
    }
}
