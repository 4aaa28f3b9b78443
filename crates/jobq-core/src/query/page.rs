use serde::{Deserialize, Serialize};

use crate::Listing;

/// One bounded, ordered slice of ranked results plus pagination
/// metadata. Invariants: `total_pages = ceil(total_results / page_size)`
/// and `page_number ∈ [1, max(total_pages, 1)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Listing>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_results: u64,
    pub total_pages: u32,
}

/// Slices the ranked result set, clamping the requested page against
/// the freshly computed total first.
pub fn paginate(ranked: Vec<Listing>, requested_page: u32, page_size: u32) -> Page {
    let page_size = page_size.max(1);
    let total_results = ranked.len() as u64;
    let total_pages = total_results.div_ceil(page_size as u64) as u32;

    let page_number = requested_page.clamp(1, total_pages.max(1));
    let start = ((page_number - 1) * page_size) as usize;
    let items: Vec<Listing> = ranked
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    Page {
        items,
        page_number,
        page_size,
        total_results,
        total_pages,
    }
}
