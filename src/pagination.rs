/// Page index and size for the visible slice of the directory.
///
/// `current_page` is 1-based; the service counts from 0 (see
/// [`Pagination::wire_page`]). Totals are copied from the latest successful
/// fetch and never computed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
    total_pages: usize,
    total_elements: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_pages: 0,
            total_elements: 0,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn total_elements(&self) -> usize {
        self.total_elements
    }

    pub fn wire_page(&self) -> usize {
        self.current_page - 1
    }

    /// Move to `page` if it lies within `1..=total_pages`. Returns whether
    /// the current page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    /// Change the page size and go back to the first page. Zero and the
    /// current size are ignored. Returns whether anything changed.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if size == 0 || size == self.page_size {
            return false;
        }
        self.page_size = size;
        self.current_page = 1;
        true
    }

    /// Jump to `page` before any totals are known. The next
    /// [`Pagination::apply_totals`] clamps it if it does not exist.
    pub fn seek(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Go back to the first page. Returns whether the page changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.current_page != 1;
        self.current_page = 1;
        changed
    }

    /// Overwrite the totals with a fetch result. If the current page no
    /// longer exists it is clamped to the last one; returns whether that
    /// happened.
    pub fn apply_totals(&mut self, total_pages: usize, total_elements: usize) -> bool {
        self.total_pages = total_pages;
        self.total_elements = total_elements;

        let last = total_pages.max(1);
        if self.current_page > last {
            self.current_page = last;
            true
        } else {
            false
        }
    }

    /// Account for one record removed from the visible page.
    pub fn record_removal(&mut self) {
        self.total_elements = self.total_elements.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_first_page() {
        let pagination = Pagination::new(10);
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.wire_page(), 0);
        assert_eq!(Pagination::new(0).page_size(), 1);
    }

    #[test]
    fn go_to_page_respects_bounds() {
        let mut pagination = Pagination::new(10);
        assert!(!pagination.go_to_page(2), "no totals yet");

        pagination.apply_totals(3, 25);
        assert!(!pagination.go_to_page(0));
        assert!(!pagination.go_to_page(4));
        assert!(!pagination.go_to_page(1), "already there");
        assert!(pagination.go_to_page(3));
        assert_eq!(pagination.current_page(), 3);
        assert_eq!(pagination.wire_page(), 2);
        assert!(!pagination.next_page());
        assert!(pagination.prev_page());
        assert_eq!(pagination.current_page(), 2);
    }

    #[test]
    fn prev_page_stops_at_first() {
        let mut pagination = Pagination::new(10);
        pagination.apply_totals(2, 12);
        assert!(!pagination.prev_page());
        assert!(pagination.next_page());
        assert!(!pagination.next_page(), "no page past the last");
        assert_eq!(pagination.current_page(), 2);
    }

    #[test]
    fn page_size_change_resets_to_first_page() {
        let mut pagination = Pagination::new(10);
        pagination.apply_totals(5, 50);
        pagination.go_to_page(4);

        assert!(!pagination.set_page_size(10));
        assert_eq!(pagination.current_page(), 4);
        assert!(!pagination.set_page_size(0));

        assert!(pagination.set_page_size(20));
        assert_eq!(pagination.page_size(), 20);
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn totals_are_taken_verbatim_and_clamp_page() {
        let mut pagination = Pagination::new(10);
        pagination.apply_totals(5, 50);
        pagination.go_to_page(5);

        assert!(pagination.apply_totals(3, 30));
        assert_eq!(pagination.current_page(), 3);
        assert_eq!(pagination.total_elements(), 30);

        assert!(pagination.apply_totals(0, 0));
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.total_pages(), 0);
    }

    #[test]
    fn seek_is_clamped_by_next_totals() {
        let mut pagination = Pagination::new(10);
        pagination.seek(9);
        assert_eq!(pagination.wire_page(), 8);
        assert!(pagination.apply_totals(3, 21));
        assert_eq!(pagination.current_page(), 3);

        pagination.seek(0);
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn removal_never_underflows() {
        let mut pagination = Pagination::new(10);
        pagination.apply_totals(1, 1);
        pagination.record_removal();
        pagination.record_removal();
        assert_eq!(pagination.total_elements(), 0);
    }
}
