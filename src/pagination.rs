use crate::columns::{Field, SEQUENCE_LABEL};
use crate::employee::Employee;
use crate::error::{DashboardError, Result};
use crate::store::View;
use serde::Serialize;

pub const MIN_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Number of pages for `len` rows; never less than one
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Current page of a session's table, 1-based
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    current: usize,
}

impl Default for PageCursor {
    fn default() -> Self {
        PageCursor { current: 1 }
    }
}

impl PageCursor {
    pub fn current(&self) -> usize {
        self.current
    }

    /// Pull the cursor back inside `[1, page_count]`
    pub fn clamp(&mut self, page_count: usize) {
        self.current = self.current.clamp(1, page_count.max(1));
    }

    /// Jump to `page`; outside `[1, page_count]` is an error and the cursor stays put
    pub fn jump(&mut self, page: usize, page_count: usize) -> Result<()> {
        if page == 0 || page > page_count {
            return Err(DashboardError::OutOfRange { page, page_count });
        }
        self.current = page;
        Ok(())
    }

    pub fn next(&mut self, page_count: usize) {
        if self.current < page_count {
            self.current += 1;
        }
    }

    pub fn prev(&mut self) {
        if self.current > 1 {
            self.current -= 1;
        }
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }
}

/// A row as displayed: sequence number relative to the whole view
#[derive(Clone, Debug, Serialize)]
pub struct NumberedRow {
    pub seq: usize,
    pub employee: Employee,
}

#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub rows: Vec<NumberedRow>,
    pub page_count: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub total_rows: usize,
}

impl Page {
    /// Render the page as a display grid: sequence column then the ten labels
    pub fn grid(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut headers = vec![SEQUENCE_LABEL.to_string()];
        headers.extend(Field::ALL.iter().map(|f| f.label().to_string()));
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.seq.to_string()];
                cells.extend(Field::ALL.iter().map(|f| row.employee.display(*f)));
                cells
            })
            .collect();
        (headers, rows)
    }
}

/// Slice `view` into the cursor's page.
///
/// The cursor is clamped first, so a view that shrank since the last call
/// never leaves it pointing past the end.
pub fn paginate(view: &View, page_size: usize, cursor: &mut PageCursor) -> Result<Page> {
    if page_size == 0 {
        return Err(DashboardError::validation("page size must be positive"));
    }
    let pages = page_count(view.len(), page_size);
    cursor.clamp(pages);

    let start = (cursor.current() - 1) * page_size;
    let rows = view
        .slice(start, start + page_size)
        .enumerate()
        .map(|(i, employee)| NumberedRow {
            seq: start + i + 1,
            employee: employee.clone(),
        })
        .collect();

    Ok(Page {
        rows,
        page_count: pages,
        current_page: cursor.current(),
        page_size,
        total_rows: view.len(),
    })
}

/// Validate a user-chosen page size against the allowed range
pub fn checked_page_size(size: usize) -> Result<usize> {
    if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(DashboardError::validation(format!(
            "page size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_view_still_has_one_page() {
        assert_eq!(page_count(0, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
    }

    #[test]
    fn cursor_clamps_after_shrink() {
        let mut cursor = PageCursor::default();
        cursor.jump(4, 4).unwrap();
        cursor.clamp(2);
        assert_eq!(cursor.current(), 2);
        cursor.next(2);
        assert_eq!(cursor.current(), 2);
    }

    #[test]
    fn failed_jump_leaves_cursor() {
        let mut cursor = PageCursor::default();
        cursor.jump(3, 5).unwrap();
        assert!(cursor.jump(0, 5).is_err());
        assert!(cursor.jump(6, 5).is_err());
        assert_eq!(cursor.current(), 3);
    }
}
