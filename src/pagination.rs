//! Page arithmetic and navigation links.
//!
//! Totals use ceiling division, so `total_pages` is zero exactly when the
//! result set is empty. An empty result set is a normal page with no
//! navigation links; a page number beyond a non-empty result set is
//! [`PageView::OutOfRange`] and callers redirect to their canonical
//! fallback location instead of rendering it.

use url::Url;

/// Number of pages needed for `total_items` at `page_size` items per page.
///
/// `page_size` must be non-zero.
pub fn total_pages(total_items: u64, page_size: u64) -> u64 {
    total_items.div_ceil(page_size)
}

/// Item offset for a 1-based page number. Saturates instead of wrapping
/// for page numbers near `u64::MAX`.
pub fn offset_for_page(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(page_size)
}

/// Return a copy of `url` with the page parameter set to `page`.
///
/// The first occurrence of `param` is replaced in place, later duplicates
/// are dropped, and the parameter is appended if absent. All other query
/// pairs keep their values and relative order, so free-text queries,
/// language selections, and corpus filters survive page navigation.
pub fn with_page(url: &Url, param: &str, page: u64) -> Url {
    let value = page.to_string();
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (k, v) in url.query_pairs() {
        if k == param {
            if !replaced {
                pairs.push((k.into_owned(), value.clone()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }
    if !replaced {
        pairs.push((param.to_string(), value));
    }

    let mut out = url.clone();
    out.query_pairs_mut().clear().extend_pairs(pairs).finish();
    out
}

/// Navigation state for a resolved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub page: u64,
    pub total_pages: u64,
    /// Link to the previous page; `None` on the first page.
    pub prev: Option<Url>,
    /// Link to the next page; `None` on the last page.
    pub next: Option<Url>,
}

/// Outcome of resolving a requested page against the actual total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    /// The page can be rendered.
    Ready(Navigation),
    /// The page number points past the last page of a non-empty result set.
    OutOfRange { total_pages: u64 },
}

/// Resolve a requested page number against a result total.
///
/// `current` is the request URL whose `param` pair is rewritten to build
/// the prev/next links.
pub fn resolve(
    page: u64,
    total_items: u64,
    page_size: u64,
    current: &Url,
    param: &str,
) -> PageView {
    let pages = total_pages(total_items, page_size);

    if pages == 0 {
        // nothing to paginate: render the empty page, no links
        return PageView::Ready(Navigation {
            page,
            total_pages: 0,
            prev: None,
            next: None,
        });
    }
    if page > pages {
        return PageView::OutOfRange { total_pages: pages };
    }

    let prev = (page > 1).then(|| with_page(current, param, page - 1));
    let next = (page < pages).then(|| with_page(current, param, page + 1));
    PageView::Ready(Navigation {
        page,
        total_pages: pages,
        prev,
        next,
    })
}
