use crate::columns::Field;
use crate::error::{DashboardError, Result};
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

lazy_static! {
    static ref TIMESTAMP_PREFIX: Regex = Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T]").unwrap();
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Canonical string form used for dates in every export
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Birth date as found in the source data.
///
/// Spreadsheets regularly carry free-text dates, so a value that cannot be
/// parsed is kept verbatim instead of being dropped: it still renders and
/// exports, is excluded by the date-range filter, and is rejected row-by-row
/// when imported into the database.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum BirthDate {
    #[default]
    Unknown,
    Date(NaiveDate),
    Unparsed(String),
}

impl BirthDate {
    pub fn parse(raw: &str) -> BirthDate {
        let raw = raw.trim();
        if raw.is_empty() {
            return BirthDate::Unknown;
        }
        match parse_date(raw) {
            Some(date) => BirthDate::Date(date),
            None => BirthDate::Unparsed(raw.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            BirthDate::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, BirthDate::Unknown)
    }

    /// Strict conversion used on write paths: unparsed text is an error
    pub fn to_stored(&self) -> Result<Option<NaiveDate>> {
        match self {
            BirthDate::Unknown => Ok(None),
            BirthDate::Date(d) => Ok(Some(*d)),
            BirthDate::Unparsed(raw) => Err(DashboardError::validation(format!(
                "malformed birth date `{raw}`"
            ))),
        }
    }

    pub fn display(&self) -> Cow<'_, str> {
        match self {
            BirthDate::Unknown => Cow::Borrowed(""),
            BirthDate::Date(d) => Cow::Owned(d.format(DATE_FORMAT).to_string()),
            BirthDate::Unparsed(raw) => Cow::Borrowed(raw),
        }
    }
}

impl From<Option<NaiveDate>> for BirthDate {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(BirthDate::Date).unwrap_or_default()
    }
}

impl Serialize for BirthDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BirthDate::Unknown => serializer.serialize_none(),
            other => serializer.serialize_str(&other.display()),
        }
    }
}

impl<'de> Deserialize<'de> for BirthDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.map(|r| BirthDate::parse(&r)).unwrap_or_default())
    }
}

/// Parse a date in one of the accepted layouts
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let candidate = TIMESTAMP_PREFIX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// One employee row.
///
/// Employee number and national ID are the natural keys. Categorical fields
/// are optional; an absent value never matches an equality filter and is
/// left out of group-by and cross-tab counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Employee {
    pub name: String,
    pub employee_id: String,
    pub national_id: String,
    #[serde(default)]
    pub birth_date: BirthDate,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub workplace: Option<String>,
}

impl Employee {
    /// String representation of a field; `None` when the value is absent
    pub fn value(&self, field: Field) -> Option<Cow<'_, str>> {
        let text = match field {
            Field::Name => Some(self.name.as_str()),
            Field::EmployeeId => Some(self.employee_id.as_str()),
            Field::NationalId => Some(self.national_id.as_str()),
            Field::BirthDate => {
                return match &self.birth_date {
                    BirthDate::Unknown => None,
                    other => Some(other.display()),
                };
            }
            Field::Education => self.education.as_deref(),
            Field::Position => self.position.as_deref(),
            Field::JobCategory => self.job_category.as_deref(),
            Field::Department => self.department.as_deref(),
            Field::Affiliation => self.affiliation.as_deref(),
            Field::Workplace => self.workplace.as_deref(),
        };
        text.filter(|t| !t.is_empty()).map(Cow::Borrowed)
    }

    /// Value rendered for display; absent values render empty
    pub fn display(&self, field: Field) -> String {
        self.value(field).map(Cow::into_owned).unwrap_or_default()
    }

    /// Set a field from its display string. Empty text clears optional fields.
    pub fn set(&mut self, field: Field, raw: &str) {
        let raw = raw.trim();
        let optional = || (!raw.is_empty()).then(|| raw.to_string());
        match field {
            Field::Name => self.name = raw.to_string(),
            Field::EmployeeId => self.employee_id = raw.to_string(),
            Field::NationalId => self.national_id = raw.to_string(),
            Field::BirthDate => self.birth_date = BirthDate::parse(raw),
            Field::Education => self.education = optional(),
            Field::Position => self.position = optional(),
            Field::JobCategory => self.job_category = optional(),
            Field::Department => self.department = optional(),
            Field::Affiliation => self.affiliation = optional(),
            Field::Workplace => self.workplace = optional(),
        }
    }

    /// Age in fractional years on `today`, or `None` when the birth date is unusable
    pub fn age_on(&self, today: NaiveDate) -> Option<f64> {
        let born = self.birth_date.date()?;
        let days = (today - born).num_days();
        (days >= 0).then(|| days as f64 / 365.25)
    }

    /// Whole-year age, calendar based
    pub fn whole_years_on(&self, today: NaiveDate) -> Option<u32> {
        let born = self.birth_date.date()?;
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    /// Reject records that cannot satisfy the key invariants
    pub fn validate_keys(&self) -> Result<()> {
        if self.employee_id.trim().is_empty() {
            return Err(DashboardError::validation("employee number is required"));
        }
        if self.national_id.trim().is_empty() {
            return Err(DashboardError::validation(format!(
                "national ID is required for employee {}",
                self.employee_id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(DashboardError::validation(format!(
                "name is required for employee {}",
                self.employee_id
            )));
        }
        Ok(())
    }
}
