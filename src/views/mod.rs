//! View models built from an [`AppContext`](crate::context::AppContext).
//!
//! These hold exactly what a screen shows; rendering happens in the binary.

pub mod dashboard;
pub mod notifications;
pub mod task_list;

pub use dashboard::Dashboard;
pub use notifications::NotificationsView;
pub use task_list::{TaskFilter, TaskListView};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One page of a paginated list. `number` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub number: usize,
    pub total_pages: usize,
    pub items: &'a [T],
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Number of pages needed for `len` items. A page size of zero is treated as one.
pub fn page_count(len: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    (len + page_size - 1) / page_size
}

/// Returns page `number` (1-based) of `items`, or `None` when out of range.
pub fn paginate<T>(items: &[T], page_size: usize, number: usize) -> Option<Page<'_, T>> {
    let page_size = page_size.max(1);
    let total_pages = page_count(items.len(), page_size);
    if number == 0 || number > total_pages {
        return None;
    }
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Some(Page {
        number,
        total_pages,
        items: &items[start..end],
    })
}
