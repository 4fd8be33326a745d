use serde::Serialize;

/// Comments shown per page in the comment listing.
pub const DEFAULT_PER_PAGE: usize = 10;

/// Position of a page within a filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    /// 1-based index of the first item on this page, 0 for an empty page.
    pub start_index: usize,
    /// 1-based index of the last item on this page, 0 for an empty page.
    pub end_index: usize,
}

/// Slices one page out of `items`.
///
/// Page numbers are 1-based. A missing or zero page means the first page and
/// a page past the end is clamped to the last one.
pub fn paginate_items<T: Clone>(
    items: &[T],
    requested_page: Option<usize>,
    per_page: usize,
) -> (Vec<T>, Pagination) {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let current_page = requested_page
        .unwrap_or(1)
        .clamp(1, total_pages.max(1));

    let offset = per_page.saturating_mul(current_page - 1);
    let page: Vec<T> = items.iter().skip(offset).take(per_page).cloned().collect();

    let (start_index, end_index) = if page.is_empty() {
        (0, 0)
    } else {
        (offset + 1, offset + page.len())
    };

    let pagination = Pagination {
        current_page,
        per_page,
        total_items,
        total_pages,
        has_previous: total_pages > 0 && current_page > 1,
        has_next: current_page < total_pages,
        start_index,
        end_index,
    };

    (page, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page() {
        let items: Vec<_> = (1..=25).collect();
        let (page, meta) = paginate_items(&items, Some(2), DEFAULT_PER_PAGE);

        assert_eq!(page, (11..=20).collect::<Vec<_>>());
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_previous);
        assert!(meta.has_next);
        assert_eq!((meta.start_index, meta.end_index), (11, 20));
    }

    #[test]
    fn empty_listing_reports_page_one_of_zero() {
        let (page, meta) = paginate_items::<u8>(&[], Some(4), DEFAULT_PER_PAGE);

        assert!(page.is_empty());
        assert_eq!(meta.current_page, 1);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_previous);
        assert!(!meta.has_next);
        assert_eq!((meta.start_index, meta.end_index), (0, 0));
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        let items: Vec<_> = (1..=5).collect();

        let (page, meta) = paginate_items(&items, Some(10), 2);
        assert_eq!(page, vec![5]);
        assert_eq!(meta.current_page, 3);
        assert!(!meta.has_next);

        let (page, meta) = paginate_items(&items, Some(0), 2);
        assert_eq!(page, vec![1, 2]);
        assert_eq!(meta.current_page, 1);
        assert!(!meta.has_previous);
    }
}
