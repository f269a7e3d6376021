use crate::analytics::RetirementPolicy;
use crate::columns::Field;
use crate::employee::Employee;
use crate::store::View;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "عالية",
            Priority::Medium => "متوسطة",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    IncompleteData,
    RetirementAge,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::IncompleteData => "بيانات ناقصة",
            NotificationKind::RetirementAge => "تنبيه سن التقاعد",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub priority: Priority,
    pub employee_id: String,
    pub message: String,
}

const REQUIRED: [Field; 4] = [
    Field::Name,
    Field::EmployeeId,
    Field::Department,
    Field::Position,
];

const UNKNOWN: &str = "غير معروف";

/// Data-quality and retirement alerts for every row of the view, in row order
pub fn check(view: &View, today: NaiveDate, policy: &RetirementPolicy) -> Vec<Notification> {
    view.rows()
        .flat_map(|e| check_employee(e, today, policy))
        .collect()
}

fn check_employee(e: &Employee, today: NaiveDate, policy: &RetirementPolicy) -> Vec<Notification> {
    let name = e.value(Field::Name).unwrap_or(UNKNOWN.into());
    let id = e.value(Field::EmployeeId).unwrap_or(UNKNOWN.into());
    let mut out = Vec::new();

    let missing: Vec<&str> = REQUIRED
        .iter()
        .filter(|f| e.value(**f).is_none())
        .map(|f| f.label())
        .collect();
    if !missing.is_empty() {
        out.push(Notification {
            kind: NotificationKind::IncompleteData,
            priority: Priority::High,
            employee_id: e.employee_id.clone(),
            message: format!("الموظف {name} - {id} يحتاج لاستكمال: {}", missing.join("، ")),
        });
    }

    if e
        .age_on(today)
        .is_some_and(|age| age >= f64::from(policy.warning_age))
    {
        out.push(Notification {
            kind: NotificationKind::RetirementAge,
            priority: Priority::Medium,
            employee_id: e.employee_id.clone(),
            message: format!("الموظف {name} سيبلغ/بلغ سن التقاعد"),
        });
    }
    out
}
