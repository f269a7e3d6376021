//! Age-derived statistics: employee profile, age bands, per-department
//! averages and the department overview used by the org-structure page and
//! the slide deck.

use crate::columns::Field;
use crate::employee::Employee;
use crate::report::{CrossTab, crosstab_by};
use crate::store::View;
use chrono::NaiveDate;
use serde::Serialize;

/// Age band labels, youngest first
pub const AGE_BANDS: [&str; 5] = ["< 25", "25-35", "35-45", "45-55", "> 55"];

/// Label of the derived age-band dimension
pub const AGE_BAND_LABEL: &str = "الفئة العمرية";

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RetirementPolicy {
    pub retirement_age: u32,
    /// Age at which an employee starts showing up in retirement alerts
    pub warning_age: u32,
}

impl Default for RetirementPolicy {
    fn default() -> Self {
        RetirementPolicy {
            retirement_age: 65,
            warning_age: 60,
        }
    }
}

/// Search-by-number result card
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Profile {
    pub employee: Employee,
    pub age: Option<f64>,
    pub remaining_years: Option<f64>,
    /// Share of the working life completed, in `[0, 1]`
    pub service_ratio: Option<f64>,
}

pub fn profile(employee: &Employee, today: NaiveDate, policy: &RetirementPolicy) -> Profile {
    let age = employee.age_on(today);
    let retirement = f64::from(policy.retirement_age);
    Profile {
        employee: employee.clone(),
        age: age.map(round1),
        remaining_years: age.map(|a| round1((retirement - a).max(0.0))),
        service_ratio: age.map(|a| {
            if retirement > 0.0 {
                (a / retirement).min(1.0)
            } else {
                1.0
            }
        }),
    }
}

/// Band for an age in years; bins are right-inclusive over (0, 100]
pub fn age_band(age: f64) -> Option<&'static str> {
    match age {
        a if a <= 0.0 || a > 100.0 => None,
        a if a <= 25.0 => Some(AGE_BANDS[0]),
        a if a <= 35.0 => Some(AGE_BANDS[1]),
        a if a <= 45.0 => Some(AGE_BANDS[2]),
        a if a <= 55.0 => Some(AGE_BANDS[3]),
        _ => Some(AGE_BANDS[4]),
    }
}

/// Employees per department and age band; rows without a usable birth date
/// are skipped
pub fn age_bands_by_department(view: &View, today: NaiveDate) -> CrossTab {
    crosstab_by(
        view,
        Field::Department.label(),
        |e| e.value(Field::Department).map(|v| v.into_owned()),
        |e| e.age_on(today).and_then(age_band).map(str::to_string),
        Some(&AGE_BANDS[..]),
        true,
    )
}

/// Employee count per age band over the whole view, in band order
pub fn age_band_counts(view: &View, today: NaiveDate) -> Vec<(&'static str, usize)> {
    let mut counts = [0usize; AGE_BANDS.len()];
    for band in view.rows().filter_map(|e| e.age_on(today).and_then(age_band)) {
        if let Some(i) = AGE_BANDS.iter().position(|b| *b == band) {
            counts[i] += 1;
        }
    }
    AGE_BANDS.into_iter().zip(counts).collect()
}

/// Mean age of the rows with a usable birth date, one decimal
pub fn average_age<'a>(rows: impl Iterator<Item = &'a Employee>, today: NaiveDate) -> Option<f64> {
    let (sum, n) = rows
        .filter_map(|e| e.age_on(today))
        .fold((0.0, 0usize), |(sum, n), age| (sum + age, n + 1));
    (n > 0).then(|| round1(sum / n as f64))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentOverview {
    pub department: String,
    pub employees: usize,
    /// Job category counts, first-seen order
    pub job_categories: Vec<(String, usize)>,
    pub average_age: Option<f64>,
}

/// One entry per department in first-seen order
pub fn department_overview(view: &View, today: NaiveDate) -> Vec<DepartmentOverview> {
    let mut departments: Vec<String> = Vec::new();
    for dept in view.rows().filter_map(|e| e.value(Field::Department)) {
        if !departments.iter().any(|d| *d == *dept) {
            departments.push(dept.into_owned());
        }
    }

    departments
        .into_iter()
        .map(|department| {
            let members: Vec<&Employee> = view
                .rows()
                .filter(|e| e.department.as_deref() == Some(department.as_str()))
                .collect();
            let mut job_categories: Vec<(String, usize)> = Vec::new();
            for category in members.iter().filter_map(|e| e.job_category.as_deref()) {
                match job_categories.iter_mut().find(|(c, _)| c == category) {
                    Some((_, n)) => *n += 1,
                    None => job_categories.push((category.to_string(), 1)),
                }
            }
            DepartmentOverview {
                employees: members.len(),
                average_age: average_age(members.iter().copied(), today),
                job_categories,
                department,
            }
        })
        .collect()
}

/// Average age per department, first-seen order; departments with no usable
/// birth date are left out
pub fn average_age_by_department(view: &View, today: NaiveDate) -> Vec<(String, f64)> {
    department_overview(view, today)
        .into_iter()
        .filter_map(|d| Some((d.department, d.average_age?)))
        .collect()
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
