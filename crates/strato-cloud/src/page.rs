//! Paged result contract
//!
//! Normalizes the two backend pagination styles (server-side cursor with an
//! opaque continuation token, and fully materialized lists sliced on the
//! client) into one result type. A consumer keeps requesting pages until
//! `is_truncated` is false or `next_token` is absent, and sees every item
//! exactly once, in backend order.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Acceptable `maxResults` values for the backend are 0 to 500, inclusive.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Clamp a requested page size to the backend ceiling, defaulting to it.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
}

/// One page of results from a listing call.
///
/// Invariant: `next_token` is `Some` only when `is_truncated` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in backend order.
    pub items: Vec<T>,

    /// Whether more results remain after this page.
    pub is_truncated: bool,

    /// Opaque marker for the next page, if any.
    pub next_token: Option<String>,

    /// Whether the backend paginated this listing itself.
    pub supports_server_pagination: bool,
}

impl<T> PagedResult<T> {
    /// Build a page from a server-paginated response.
    ///
    /// The backend's continuation token is the authoritative truncation
    /// signal: a page is truncated exactly when the token is present.
    pub fn from_server_page(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            is_truncated: next_page_token.is_some(),
            next_token: next_page_token,
            items,
            supports_server_pagination: true,
        }
    }

    /// Build a page by slicing a fully materialized list.
    ///
    /// Used for listings the backend cannot paginate (e.g. resources derived
    /// from a single document). The marker is the decimal offset of the
    /// first item of the page.
    pub fn from_full_list(items: Vec<T>, limit: Option<u32>, marker: Option<&str>) -> Result<Self> {
        let offset = parse_marker(marker)?;
        let limit = clamp_limit(limit) as usize;
        let total = items.len();

        let page: Vec<T> = items
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();
        let consumed = offset.saturating_add(page.len());
        let truncated = consumed < total;

        Ok(Self {
            items: page,
            is_truncated: truncated,
            next_token: truncated.then(|| consumed.to_string()),
            supports_server_pagination: false,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn parse_marker(marker: Option<&str>) -> Result<usize> {
    match marker {
        None => Ok(0),
        Some(m) => m.parse::<usize>().map_err(|_| {
            CloudError::InvalidArgument(format!("invalid pagination marker: {m}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_page_token_presence_is_truncation() {
        let page = PagedResult::from_server_page(vec![1, 2, 3], Some("tok".to_string()));
        assert!(page.is_truncated);
        assert_eq!(page.next_token.as_deref(), Some("tok"));

        let last = PagedResult::from_server_page(vec![4], None);
        assert!(!last.is_truncated);
        assert!(last.next_token.is_none());
    }

    #[test]
    fn test_client_slice_exhaustive() {
        let all: Vec<i32> = (0..7).collect();
        let mut seen = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page =
                PagedResult::from_full_list(all.clone(), Some(3), marker.as_deref()).unwrap();
            seen.extend(page.items.iter().copied());
            if !page.is_truncated {
                assert!(page.next_token.is_none());
                break;
            }
            marker = page.next_token;
        }

        assert_eq!(seen, all);
    }

    #[test]
    fn test_client_slice_preserves_order() {
        let page = PagedResult::from_full_list(vec!["b", "a", "c"], Some(2), None).unwrap();
        assert_eq!(page.items, vec!["b", "a"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_token.as_deref(), Some("2"));
    }

    #[test]
    fn test_invalid_marker_rejected() {
        let err = PagedResult::from_full_list(vec![1], None, Some("not-a-number")).unwrap_err();
        assert!(matches!(err, CloudError::InvalidArgument(_)));
    }

    #[test]
    fn test_limit_clamped_to_ceiling() {
        assert_eq!(clamp_limit(None), 500);
        assert_eq!(clamp_limit(Some(10_000)), 500);
        assert_eq!(clamp_limit(Some(20)), 20);
    }
}
