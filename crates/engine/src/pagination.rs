//! Offset pagination over list endpoints

use snapshot_core::{ListParams, Page, SnapshotResult};
use tracing::warn;

/// Collect every item of a paginated listing
///
/// The first page's `total` is authoritative. Each further call asks for
/// `offset = items collected so far`. An empty page before the total is
/// reached ends the listing early with a warning rather than looping.
pub fn fetch_all<T, F>(mut call: F, mut params: ListParams) -> SnapshotResult<Vec<T>>
where
    F: FnMut(&ListParams) -> SnapshotResult<Page<T>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut total: Option<usize> = None;

    loop {
        params.offset = items.len();
        let page = call(&params)?;
        let expected = *total.get_or_insert(page.total);

        if page.items.is_empty() && items.len() < expected {
            warn!(
                target: "snapshot::pagination",
                collected = items.len(),
                expected,
                "Listing returned an empty page before reaching its total"
            );
            break;
        }

        items.extend(page.items);
        if items.len() >= expected {
            break;
        }
    }

    Ok(items)
}
