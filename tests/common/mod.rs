#![allow(dead_code)]

use chrono::NaiveDate;
use hr_dashboard::{BirthDate, Employee, RecordStore};

pub fn employee(name: &str, employee_id: &str, department: &str, birth_date: &str) -> Employee {
    Employee {
        name: name.to_string(),
        employee_id: employee_id.to_string(),
        national_id: format!("N{employee_id}"),
        birth_date: BirthDate::parse(birth_date),
        department: (!department.is_empty()).then(|| department.to_string()),
        ..Employee::default()
    }
}

pub fn with(mut employee: Employee, job_category: &str, workplace: &str, position: &str) -> Employee {
    employee.job_category = Some(job_category.to_string());
    employee.workplace = Some(workplace.to_string());
    employee.position = Some(position.to_string());
    employee
}

/// Small roster used across the integration tests
pub fn roster() -> RecordStore {
    RecordStore::new(vec![
        with(employee("Ahmed Ali", "1001", "Sales", "1980-03-15"), "A", "Tripoli", "Manager"),
        with(employee("Ahmed Omar", "1002", "HR", "1995-07-01"), "B", "Tripoli", "Clerk"),
        with(employee("Sara Salem", "1003", "Sales", "1962-01-20"), "A", "Benghazi", "Clerk"),
        with(employee("Omar Nuri", "1004", "IT", "unknown"), "C", "Benghazi", "Engineer"),
        with(employee("Mona Adel", "1005", "Sales", ""), "B", "Tripoli", "Clerk"),
    ])
    .unwrap()
}

/// `n` employees, all in one department, for paging tests
pub fn numbered(n: usize) -> RecordStore {
    RecordStore::new(
        (1..=n)
            .map(|i| employee(&format!("Employee {i}"), &i.to_string(), "Ops", "1990-01-01"))
            .collect(),
    )
    .unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}
