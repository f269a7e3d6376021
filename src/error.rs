use thiserror::Error;

/// Errors raised anywhere in the dashboard.
///
/// Read-path failures (filtering, paging, charting) leave the caller's state
/// untouched; write-path failures are raised only after the surrounding
/// transaction has been rolled back.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Bad user input: filter values, dates, page sizes, form fields
    #[error("validation error: {0}")]
    Validation(String),

    /// A natural key (employee number, national ID, login id) is already taken
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The requested key does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Page jump outside `[1, page_count]`
    #[error("page {page} is out of range 1..={page_count}")]
    OutOfRange { page: usize, page_count: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any failure of the relational layer
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("invalid login id or password")]
    Auth,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The spreadsheet parser could not read the input file
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("chart error: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DashboardError::Validation(msg.into())
    }

    /// Short machine-readable tag used in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Validation(_) => "validation",
            DashboardError::DuplicateKey(_) => "duplicate_key",
            DashboardError::NotFound(_) => "not_found",
            DashboardError::OutOfRange { .. } => "out_of_range",
            DashboardError::Io(_) => "io",
            DashboardError::Persistence(_) => "persistence",
            DashboardError::Auth => "auth",
            DashboardError::Forbidden(_) => "forbidden",
            DashboardError::Spreadsheet(_) => "spreadsheet",
            DashboardError::Export(_) => "export",
            DashboardError::Chart(_) => "chart",
        }
    }
}

impl From<calamine::Error> for DashboardError {
    fn from(e: calamine::Error) -> Self {
        DashboardError::Spreadsheet(e.to_string())
    }
}

impl From<calamine::XlsxError> for DashboardError {
    fn from(e: calamine::XlsxError) -> Self {
        DashboardError::Spreadsheet(e.to_string())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(e: csv::Error) -> Self {
        DashboardError::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for DashboardError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        DashboardError::Export(e.to_string())
    }
}

impl From<zip::result::ZipError> for DashboardError {
    fn from(e: zip::result::ZipError) -> Self {
        DashboardError::Export(e.to_string())
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for DashboardError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Chart(e.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::Export(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = DashboardError::OutOfRange {
            page: 6,
            page_count: 5,
        };
        assert_eq!(err.to_string(), "page 6 is out of range 1..=5");
        assert_eq!(err.kind(), "out_of_range");
    }
}
