//! Page-number pagination over an overfetched result window.

/// Films returned per page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Hits selected for a page together with the page number actually served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow<T> {
    pub hits: Vec<T>,
    pub page: u32,
}

/// Select the hits for `page` out of the window fetched from the index.
///
/// A missing page, page 0, or a page beyond `total_hits` serves the first
/// `page_size` hits as page 1; out-of-range pages never fail. Otherwise the
/// slice starts at `page_size * page - 1` and runs to the end of the window,
/// so consecutive pages overlap by one hit and are not capped at `page_size`.
pub fn paginate<T>(
    total_hits: u64,
    hits: Vec<T>,
    page: Option<u32>,
    page_size: usize,
) -> PageWindow<T> {
    let requested = page.filter(|page| *page > 0);

    let Some(page) = requested else {
        return first_page(hits, page_size);
    };

    let reach = (page_size as u64).saturating_mul(u64::from(page));
    if reach > total_hits {
        return first_page(hits, page_size);
    }

    let offset = usize::try_from(reach.saturating_sub(1)).unwrap_or(usize::MAX);
    PageWindow {
        hits: hits.into_iter().skip(offset).collect(),
        page,
    }
}

fn first_page<T>(hits: Vec<T>, page_size: usize) -> PageWindow<T> {
    PageWindow {
        hits: hits.into_iter().take(page_size).collect(),
        page: 1,
    }
}
