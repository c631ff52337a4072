use std::future::Future;

use log::debug;

/// Page size used for every paginated listing.
pub const PER_PAGE: u64 = 10_000;

/// Items of one page together with the page count the provider reported alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
}

/// Walks a paginated listing from page 1, accumulating items.
///
/// Stops once the current page equals the reported page count, or once a page comes back with
/// fewer than `per_page` items, whichever happens first. Both checks run on every page.
pub async fn collect_pages<T, E, F, Fut>(per_page: u64, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut page = 0;

    loop {
        page += 1;
        let Page {
            items: page_items,
            total_pages,
        } = fetch_page(page).await?;

        let returned = page_items.len() as u64;
        debug!(
            "Page {} of {}: got {} items",
            page, total_pages, returned
        );
        items.extend(page_items);

        if page >= total_pages || returned < per_page {
            break;
        }
    }

    Ok(items)
}
