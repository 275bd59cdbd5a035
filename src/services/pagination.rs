//! Page assembly over ascending `seq` scans
//!
//! Both modes over-fetch one row past the requested limit. When that extra row
//! comes back there is a next page; it is dropped before the page is returned.

use std::future::Future;

use crate::db::{AuthorRecord, BookRecord, ScanRange};

use super::cursor::{decode_cursor, encode_cursor};
use super::error::{CatalogError, CatalogResult};

/// Default upper bound for a requested page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// A bounded, ordered slice of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more_pages: bool,
    /// Cursor of the last returned item, `None` for an empty page
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more_pages: false,
            cursor: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Rows that carry the store's insert sequence
pub trait Sequenced {
    fn seq(&self) -> i64;
}

impl Sequenced for BookRecord {
    fn seq(&self) -> i64 {
        self.seq
    }
}

impl Sequenced for AuthorRecord {
    fn seq(&self) -> i64 {
        self.seq
    }
}

fn check_limit(limit: i64, max_page_size: i64) -> CatalogResult<()> {
    if limit < 1 || limit > max_page_size {
        return Err(CatalogError::validation(format!(
            "limit must be between 1 and {max_page_size}"
        )));
    }
    Ok(())
}

/// Scan window for the page after `cursor`
pub fn cursor_window(
    cursor: Option<&str>,
    limit: i64,
    max_page_size: i64,
) -> CatalogResult<ScanRange> {
    check_limit(limit, max_page_size)?;
    let after_seq = cursor.map(decode_cursor).transpose()?;

    Ok(ScanRange {
        after_seq,
        offset: 0,
        limit: Some(limit + 1),
    })
}

/// Scan window for the zero-based page index `page`
pub fn offset_window(page: i64, limit: i64, max_page_size: i64) -> CatalogResult<ScanRange> {
    check_limit(limit, max_page_size)?;
    if page < 0 {
        return Err(CatalogError::validation("page must not be negative"));
    }
    let offset = page
        .checked_mul(limit)
        .ok_or_else(|| CatalogError::validation("page is out of range"))?;

    Ok(ScanRange {
        after_seq: None,
        offset,
        limit: Some(limit + 1),
    })
}

/// Turn an over-fetched scan into a page of at most `limit` items
pub fn into_page<T: Sequenced>(mut rows: Vec<T>, limit: i64) -> Page<T> {
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more_pages = rows.len() > limit;
    if has_more_pages {
        rows.truncate(limit);
    }
    let cursor = rows.last().map(|row| encode_cursor(row.seq()));

    Page {
        items: rows,
        has_more_pages,
        cursor,
    }
}

/// Cursor pagination: items strictly after `cursor`, stable under concurrent inserts
pub async fn paginate<T, F, Fut>(
    cursor: Option<&str>,
    limit: i64,
    max_page_size: i64,
    fetch: F,
) -> CatalogResult<Page<T>>
where
    T: Sequenced,
    F: FnOnce(ScanRange) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    let range = cursor_window(cursor, limit, max_page_size)?;
    let rows = fetch(range).await?;
    Ok(into_page(rows, limit))
}

/// Offset pagination. Inserts that land between calls can shift page boundaries.
pub async fn paginate_offset<T, F, Fut>(
    page: i64,
    limit: i64,
    max_page_size: i64,
    fetch: F,
) -> CatalogResult<Page<T>>
where
    T: Sequenced,
    F: FnOnce(ScanRange) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    let range = offset_window(page, limit, max_page_size)?;
    let rows = fetch(range).await?;
    Ok(into_page(rows, limit))
}
