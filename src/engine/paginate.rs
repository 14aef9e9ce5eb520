use crate::models::{HotelId, HotelRecord};
use std::collections::HashSet;

/// One page of the effective result list
#[derive(Debug)]
pub struct Page<'a> {
    pub records: Vec<&'a HotelRecord>,
    /// 1-based, clamped into `1..=total_pages`
    pub page: usize,
    pub total_pages: usize,
    /// Length of the effective list the pages were cut from
    pub total_results: usize,
}

/// Page windows over the filtered, sorted set
///
/// With no active filter and a fast-painted first page, page 1 is exactly
/// that first page and later pages hold everything else, so no hotel shows
/// up twice. Under an active filter pages are plain fixed-size slices.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn paginate<'a>(
        &self,
        filtered: Vec<&'a HotelRecord>,
        first_page: &'a [HotelRecord],
        filter_active: bool,
        page: usize,
    ) -> Page<'a> {
        if filter_active || first_page.is_empty() {
            return self.slice(filtered, page);
        }

        let shown: HashSet<&HotelId> = first_page.iter().map(|record| &record.id).collect();
        let rest: Vec<&HotelRecord> = filtered
            .into_iter()
            .filter(|record| !shown.contains(&record.id))
            .collect();

        let total_pages = 1 + rest.len().div_ceil(self.page_size);
        let page = page.clamp(1, total_pages);
        let records = if page == 1 {
            first_page.iter().collect()
        } else {
            rest.iter()
                .skip((page - 2) * self.page_size)
                .take(self.page_size)
                .copied()
                .collect()
        };

        Page {
            records,
            page,
            total_pages,
            total_results: first_page.len() + rest.len(),
        }
    }

    fn slice<'a>(&self, filtered: Vec<&'a HotelRecord>, page: usize) -> Page<'a> {
        let total_results = filtered.len();
        let total_pages = total_results.div_ceil(self.page_size).max(1);
        let page = page.clamp(1, total_pages);
        let records = filtered
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        Page {
            records,
            page,
            total_pages,
            total_results,
        }
    }
}
