use serde::{Deserialize, Serialize};

/// Fixed-size page slicing over an ordered collection. The page size is a
/// deployment-wide setting, never per-request.
#[derive(Debug, Clone, Copy)]
pub struct Pager {
    per_page: u32,
}

/// Where a requested page lands after clamping: its 1-based number, the page
/// count, and the LIMIT/OFFSET bounds to fetch it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub number: u32,
    pub num_pages: u32,
    pub limit: i64,
    pub offset: i64,
}

impl Pager {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Clamps `requested` into `1..=num_pages`. An empty collection still has
    /// one (empty) page, and out-of-range requests land on the last page, so
    /// slicing never errors.
    pub fn locate(&self, total: i64, requested: u32) -> PageBounds {
        let total = total.max(0);
        let per_page = i64::from(self.per_page);
        let num_pages = ((total + per_page - 1) / per_page).max(1) as u32;
        let number = requested.clamp(1, num_pages);
        PageBounds {
            number,
            num_pages,
            limit: per_page,
            offset: i64::from(number - 1) * per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub per_page: u32,
    pub num_pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn assemble(items: Vec<T>, bounds: PageBounds, total: i64, per_page: u32) -> Self {
        Self {
            items,
            number: bounds.number,
            per_page,
            num_pages: bounds.num_pages,
            total,
            has_next: bounds.number < bounds.num_pages,
            has_previous: bounds.number > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
