use serde::{Deserialize, Serialize};

use crate::value::Item;

/// Paging metadata, always derived from the collection it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number as requested, even when out of range.
    pub current_page: usize,
    pub total_pages: usize,
    /// Size of the raw, unfiltered collection.
    pub total_items: usize,
    /// Size of the collection being paginated.
    pub filtered_items: usize,
}

/// Slices `items` into fixed-size pages. Out-of-range page numbers are
/// not an error; they simply yield an empty slice. `total_pages` never
/// drops below 1 so an empty view still reads as one empty page.
pub fn paginate(
    items: &[Item],
    page: usize,
    page_size: usize,
    total_items: usize,
) -> (Vec<Item>, Pagination) {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size);
    let slice: Vec<Item> = items.iter().skip(start).take(page_size).cloned().collect();
    let pagination = Pagination {
        current_page: page,
        total_pages: items.len().div_ceil(page_size).max(1),
        total_items,
        filtered_items: items.len(),
    };
    (slice, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldMap;

    fn items(count: usize) -> Vec<Item> {
        (0..count)
            .map(|index| Item {
                index,
                id: format!("item-{index}"),
                fields: FieldMap::new(),
            })
            .collect()
    }

    #[test]
    fn first_page_holds_the_first_page_size_items() {
        let all = items(130);
        let (slice, pagination) = paginate(&all, 1, 60, 130);
        assert_eq!(slice.len(), 60);
        assert_eq!(slice[0].index, 0);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.filtered_items, 130);
    }

    #[test]
    fn last_page_may_be_short() {
        let all = items(130);
        let (slice, pagination) = paginate(&all, 3, 60, 130);
        assert_eq!(slice.len(), 10);
        assert_eq!(slice[0].index, 120);
        assert_eq!(pagination.current_page, 3);
    }

    #[test]
    fn out_of_range_page_is_empty_not_an_error() {
        let all = items(5);
        let (slice, pagination) = paginate(&all, 9, 60, 5);
        assert!(slice.is_empty());
        assert_eq!(pagination.current_page, 9);
        assert_eq!(pagination.total_pages, 1);
    }

    #[test]
    fn empty_collection_still_reports_one_page() {
        let (slice, pagination) = paginate(&[], 1, 60, 42);
        assert!(slice.is_empty());
        assert_eq!(pagination.total_pages, 1);
        assert_eq!(pagination.total_items, 42);
        assert_eq!(pagination.filtered_items, 0);
    }
}
