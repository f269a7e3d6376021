//! Aggregate reports over a view: group-by counts, cross-tabulations and the
//! key-indicator summary. Every report can be flattened into a [`Table`] for
//! display or export.

use crate::columns::{COUNT_LABEL, Field};
use crate::employee::Employee;
use crate::error::{DashboardError, Result};
use crate::store::View;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Label of the totals row/column in cross-tabulations
pub const TOTAL_LABEL: &str = "المجموع";

/// A rectangular grid of display strings with a header row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Table {
        Table { headers, rows }
    }

    /// All ten fields of every row in the view, headed by display labels
    pub fn from_view(view: &View) -> Table {
        Table::from_view_columns(view, &Field::ALL)
    }

    /// A chosen subset of columns, in the given order
    pub fn from_view_columns(view: &View, fields: &[Field]) -> Table {
        let headers = fields.iter().map(|f| f.label().to_string()).collect();
        let rows = view
            .rows()
            .map(|e| fields.iter().map(|f| e.display(*f)).collect())
            .collect();
        Table { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountRow {
    pub keys: Vec<String>,
    pub count: usize,
}

/// Result of a group-by + count
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountTable {
    pub group_by: Vec<Field>,
    pub rows: Vec<CountRow>,
}

impl CountTable {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn to_table(&self) -> Table {
        let mut headers: Vec<String> = self.group_by.iter().map(|f| f.label().to_string()).collect();
        headers.push(COUNT_LABEL.to_string());
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells = r.keys.clone();
                cells.push(r.count.to_string());
                cells
            })
            .collect();
        Table { headers, rows }
    }
}

/// Group the view by `group_by` and count rows per group.
///
/// Groups appear in the order their key was first seen. Rows missing a value
/// for any grouping field are left out.
pub fn aggregate(view: &View, group_by: &[Field]) -> Result<CountTable> {
    if group_by.is_empty() {
        return Err(DashboardError::validation("choose at least one field to group by"));
    }
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
    let mut rows: Vec<CountRow> = Vec::new();

    for employee in view.rows() {
        let Some(keys) = group_by
            .iter()
            .map(|f| employee.value(*f).map(|v| v.into_owned()))
            .collect::<Option<Vec<String>>>()
        else {
            continue;
        };
        match positions.get(&keys) {
            Some(&pos) => rows[pos].count += 1,
            None => {
                positions.insert(keys.clone(), rows.len());
                rows.push(CountRow { keys, count: 1 });
            }
        }
    }

    Ok(CountTable {
        group_by: group_by.to_vec(),
        rows,
    })
}

/// A count matrix indexed by two categorical keys
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_header: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    pub margins: bool,
}

impl CrossTab {
    pub fn get(&self, row: &str, col: &str) -> usize {
        let r = self.row_labels.iter().position(|l| l == row);
        let c = self.col_labels.iter().position(|l| l == col);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<usize> {
        (0..self.col_labels.len())
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> usize {
        self.row_totals().iter().sum()
    }

    pub fn to_table(&self) -> Table {
        let mut headers = vec![self.row_header.clone()];
        headers.extend(self.col_labels.iter().cloned());
        if self.margins {
            headers.push(TOTAL_LABEL.to_string());
        }

        let row_totals = self.row_totals();
        let mut rows: Vec<Vec<String>> = self
            .row_labels
            .iter()
            .zip(&self.counts)
            .zip(&row_totals)
            .map(|((label, counts), total)| {
                let mut cells = vec![label.clone()];
                cells.extend(counts.iter().map(usize::to_string));
                if self.margins {
                    cells.push(total.to_string());
                }
                cells
            })
            .collect();

        if self.margins {
            let mut totals = vec![TOTAL_LABEL.to_string()];
            totals.extend(self.col_totals().iter().map(usize::to_string));
            totals.push(self.grand_total().to_string());
            rows.push(totals);
        }
        Table { headers, rows }
    }
}

/// Cross-tabulate two fields. Labels are sorted; rows missing either value
/// are left out.
pub fn crosstab(view: &View, row_field: Field, col_field: Field, margins: bool) -> Result<CrossTab> {
    Ok(crosstab_by(
        view,
        row_field.label(),
        |e| e.value(row_field).map(|v| v.into_owned()),
        |e| e.value(col_field).map(|v| v.into_owned()),
        None,
        margins,
    ))
}

/// Cross-tabulate with arbitrary keys; `col_order` fixes the column order
/// and drops columns outside it.
pub fn crosstab_by<R, C>(
    view: &View,
    row_header: &str,
    row_key: R,
    col_key: C,
    col_order: Option<&[&str]>,
    margins: bool,
) -> CrossTab
where
    R: Fn(&Employee) -> Option<String>,
    C: Fn(&Employee) -> Option<String>,
{
    let pairs: Vec<(String, String)> = view
        .rows()
        .filter_map(|e| Some((row_key(e)?, col_key(e)?)))
        .filter(|(_, c)| col_order.is_none_or(|order| order.contains(&c.as_str())))
        .collect();

    let row_labels: Vec<String> = pairs
        .iter()
        .map(|(r, _)| r.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_labels: Vec<String> = match col_order {
        Some(order) => order.iter().map(|s| s.to_string()).collect(),
        None => pairs
            .iter()
            .map(|(_, c)| c.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let mut counts = vec![vec![0usize; col_labels.len()]; row_labels.len()];
    for (r, c) in &pairs {
        let ri = row_labels.binary_search(r).ok();
        let ci = col_labels.iter().position(|l| l == c);
        if let (Some(ri), Some(ci)) = (ri, ci) {
            counts[ri][ci] += 1;
        }
    }

    CrossTab {
        row_header: row_header.to_string(),
        row_labels,
        col_labels,
        counts,
        margins,
    }
}

/// Key indicators of a view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_employees: usize,
    pub departments: usize,
    pub job_categories: usize,
    pub workplaces: usize,
    pub avg_per_department: Option<f64>,
}

pub fn summary(view: &View) -> Summary {
    let distinct = |field: Field| {
        view.rows()
            .filter_map(|e| e.value(field))
            .collect::<BTreeSet<_>>()
            .len()
    };
    let departments = distinct(Field::Department);
    let total_employees = view.len();
    Summary {
        total_employees,
        departments,
        job_categories: distinct(Field::JobCategory),
        workplaces: distinct(Field::Workplace),
        avg_per_department: (departments > 0)
            .then(|| (total_employees as f64 / departments as f64 * 10.0).round() / 10.0),
    }
}

impl Summary {
    pub fn to_table(&self) -> Table {
        let mut rows = vec![
            vec!["إجمالي عدد الموظفين".to_string(), self.total_employees.to_string()],
            vec!["عدد الإدارات".to_string(), self.departments.to_string()],
            vec!["عدد الفئات الوظيفية".to_string(), self.job_categories.to_string()],
            vec!["عدد مواقع العمل".to_string(), self.workplaces.to_string()],
        ];
        if let Some(avg) = self.avg_per_department {
            rows.push(vec!["متوسط الموظفين لكل إدارة".to_string(), format!("{avg:.1}")]);
        }
        Table::new(vec!["المؤشر".to_string(), "القيمة".to_string()], rows)
    }
}

/// Sheets of the comprehensive statistical workbook
pub fn statistical_report(view: &View) -> Result<Vec<(String, Table)>> {
    Ok(vec![
        ("المؤشرات الرئيسية".to_string(), summary(view).to_table()),
        (
            "تفاصيل الإدارات".to_string(),
            aggregate(view, &[Field::Department])?.to_table(),
        ),
        (
            "تفاصيل الفئات".to_string(),
            aggregate(view, &[Field::JobCategory])?.to_table(),
        ),
    ])
}
