//! Column mapping between internal field identifiers and Arabic display labels.
//!
//! The mapping is a fixed bijection over the ten employee fields. Raw header
//! text coming from spreadsheets is normalized once, at the parsing boundary,
//! into a [`Field`]; nothing past the loader ever sees a raw header string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel value that disables a categorical filter ("all")
pub const ALL_SENTINEL: &str = "الكل";

/// Display label of the sequence column prepended to rendered tables
pub const SEQUENCE_LABEL: &str = "ت";

/// Display label of the count column in aggregate tables
pub const COUNT_LABEL: &str = "العدد";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    EmployeeId,
    NationalId,
    BirthDate,
    Education,
    Position,
    JobCategory,
    Department,
    Affiliation,
    Workplace,
}

impl Field {
    /// All fields, in spreadsheet column order
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::EmployeeId,
        Field::NationalId,
        Field::BirthDate,
        Field::Education,
        Field::Position,
        Field::JobCategory,
        Field::Department,
        Field::Affiliation,
        Field::Workplace,
    ];

    /// Fields that can be grouped, cross-tabulated and charted
    pub const CATEGORICAL: [Field; 6] = [
        Field::Education,
        Field::Position,
        Field::JobCategory,
        Field::Department,
        Field::Affiliation,
        Field::Workplace,
    ];

    pub fn ident(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::EmployeeId => "employee_id",
            Field::NationalId => "national_id",
            Field::BirthDate => "birth_date",
            Field::Education => "education",
            Field::Position => "position",
            Field::JobCategory => "job_category",
            Field::Department => "department",
            Field::Affiliation => "affiliation",
            Field::Workplace => "workplace",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "الاسم",
            Field::EmployeeId => "الرقم الوظيفي",
            Field::NationalId => "الرقم الوطني",
            Field::BirthDate => "تاريخ الميلاد",
            Field::Education => "المؤهل العلمي",
            Field::Position => "الوظيفة",
            Field::JobCategory => "فئة الوظيفة",
            Field::Department => "الادارة",
            Field::Affiliation => "التابعية",
            Field::Workplace => "موقع العمل",
        }
    }

    /// Text-typed fields are searched by the "all columns" free-text search
    pub fn is_text(self) -> bool {
        !matches!(self, Field::BirthDate)
    }

    pub fn is_categorical(self) -> bool {
        Field::CATEGORICAL.contains(&self)
    }

    pub fn from_ident(ident: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.ident() == ident)
    }

    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Map raw header text to a field.
    ///
    /// Accepts either the display label or the internal identifier. The text
    /// is trimmed, Arabic tatweel (kashida) is removed and inner whitespace
    /// runs collapse to a single space, so `" الرقم الوطني"` and
    /// `"الاســــــم"` both resolve.
    pub fn from_header(raw: &str) -> Option<Field> {
        let normalized = normalize_header(raw);
        Field::from_label(&normalized).or_else(|| Field::from_ident(&normalized.to_lowercase()))
    }
}

/// Normalize header text for matching
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.replace('\u{0640}', ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.ident())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Field::from_header(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown field `{raw}`")))
    }
}
