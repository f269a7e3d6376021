//! Filter engine: free-text search, categorical equality and birth-date range.
//!
//! Every active predicate is ANDed. Applying a configuration never touches
//! the store; it yields a fresh [`View`] in store order, so applying the same
//! configuration twice yields equal views.

use crate::columns::{ALL_SENTINEL, Field};
use crate::employee::{Employee, parse_date};
use crate::error::{DashboardError, Result};
use crate::store::{RecordStore, View};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which columns the free-text search looks at
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SearchColumn {
    /// Every text-typed column
    #[default]
    All,
    Field(Field),
    /// A column name that matches no field; the search matches nothing
    Unknown(String),
}

impl SearchColumn {
    pub fn parse(raw: &str) -> SearchColumn {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") || trimmed == ALL_SENTINEL {
            return SearchColumn::All;
        }
        match Field::from_header(trimmed) {
            Some(field) => SearchColumn::Field(field),
            None => SearchColumn::Unknown(trimmed.to_string()),
        }
    }
}

/// Inclusive birth-date bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
        if start > end {
            return Err(DashboardError::validation(format!(
                "date range starts after it ends ({start} > {end})"
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Parse textual bounds; malformed text is a validation error
    pub fn parse(start: &str, end: &str) -> Result<DateRange> {
        let parse = |raw: &str| {
            parse_date(raw)
                .ok_or_else(|| DashboardError::validation(format!("malformed date bound `{raw}`")))
        };
        DateRange::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One filter-apply action's worth of predicates
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FilterConfig {
    pub search_column: SearchColumn,
    pub search_text: String,
    pub department: Option<String>,
    pub job_category: Option<String>,
    pub workplace: Option<String>,
    pub date_range: Option<DateRange>,
}

/// Wire form of a filter configuration, as submitted by the filter form.
///
/// Unknown keys are rejected. Conversion into [`FilterConfig`] is where date
/// bounds get validated.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRequest {
    #[serde(default)]
    pub search_column: String,
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    #[serde(default)]
    pub workplace: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

impl TryFrom<FilterRequest> for FilterConfig {
    type Error = DashboardError;

    fn try_from(req: FilterRequest) -> Result<FilterConfig> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let date_range = match (&req.date_from, &req.date_to) {
            _ if blank(&req.date_from) && blank(&req.date_to) => None,
            (Some(from), Some(to)) if !blank(&req.date_from) && !blank(&req.date_to) => {
                Some(DateRange::parse(from, to)?)
            }
            _ => {
                return Err(DashboardError::validation(
                    "both date bounds are required for a date-range filter",
                ));
            }
        };
        Ok(FilterConfig {
            search_column: SearchColumn::parse(&req.search_column),
            search_text: req.search_text,
            department: req.department,
            job_category: req.job_category,
            workplace: req.workplace,
            date_range,
        })
    }
}

impl FilterConfig {
    /// Lower-cased, non-empty comma-separated search terms
    pub fn search_terms(&self) -> Vec<String> {
        self.search_text
            .split(',')
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect()
    }

    /// Categorical filters that are switched on, as (field, required value)
    pub fn active_categories(&self) -> Vec<(Field, &str)> {
        [
            (Field::Department, &self.department),
            (Field::JobCategory, &self.job_category),
            (Field::Workplace, &self.workplace),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value.as_deref()?;
            (!value.is_empty() && value != ALL_SENTINEL).then_some((field, value))
        })
        .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.search_terms().is_empty()
            && self.active_categories().is_empty()
            && self.date_range.is_none()
    }

    fn validate(&self) -> Result<()> {
        if let Some(range) = &self.date_range {
            DateRange::new(range.start, range.end)?;
        }
        Ok(())
    }
}

/// Apply `config` to `store`.
///
/// Fails only on invalid configuration (an inverted date range), before any
/// row is examined.
pub fn apply(store: &RecordStore, config: &FilterConfig) -> Result<View> {
    config.validate()?;

    if store.is_empty() {
        return Ok(View::empty(store));
    }

    let search_fields: Vec<Field> = match &config.search_column {
        SearchColumn::All => Field::ALL.into_iter().filter(|f| f.is_text()).collect(),
        SearchColumn::Field(field) => vec![*field],
        SearchColumn::Unknown(_) => Vec::new(),
    };
    let terms = config.search_terms();
    if !terms.is_empty() && search_fields.is_empty() {
        return Ok(View::empty(store));
    }
    let categories = config.active_categories();

    let indices = store
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| matches_terms(row, &terms, &search_fields))
        .filter(|(_, row)| {
            categories
                .iter()
                .all(|(field, wanted)| row.value(*field).is_some_and(|v| v == *wanted))
        })
        .filter(|(_, row)| match &config.date_range {
            Some(range) => row.birth_date.date().is_some_and(|d| range.contains(d)),
            None => true,
        })
        .map(|(i, _)| i)
        .collect();

    Ok(View::from_indices(store, indices))
}

/// Every term must occur in at least one of the searched columns
fn matches_terms(row: &Employee, terms: &[String], fields: &[Field]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let haystacks: Vec<String> = fields
        .iter()
        .filter_map(|f| row.value(*f))
        .map(|v| v.to_lowercase())
        .collect();
    terms
        .iter()
        .all(|term| haystacks.iter().any(|hay| hay.contains(term.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_terms_split_on_commas_and_skip_blanks() {
        let config = FilterConfig {
            search_text: " Ahmed , ,SALES,".into(),
            ..Default::default()
        };
        assert_eq!(config.search_terms(), vec!["ahmed", "sales"]);
    }

    #[test]
    fn sentinel_disables_categorical_filters() {
        let config = FilterConfig {
            department: Some(ALL_SENTINEL.into()),
            job_category: Some(String::new()),
            workplace: Some("طرابلس".into()),
            ..Default::default()
        };
        assert_eq!(
            config.active_categories(),
            vec![(Field::Workplace, "طرابلس")]
        );
    }

    #[test]
    fn request_with_half_a_range_is_rejected() {
        let req = FilterRequest {
            date_from: Some("1980-01-01".into()),
            ..Default::default()
        };
        assert!(FilterConfig::try_from(req).is_err());
    }

    #[test]
    fn search_column_parsing() {
        assert_eq!(SearchColumn::parse("all"), SearchColumn::All);
        assert_eq!(SearchColumn::parse(ALL_SENTINEL), SearchColumn::All);
        assert_eq!(
            SearchColumn::parse("الادارة"),
            SearchColumn::Field(Field::Department)
        );
        assert_eq!(
            SearchColumn::parse("salary"),
            SearchColumn::Unknown("salary".into())
        );
    }
}
