//! Offset/limit ⟷ page/pageSize normalization (`spec.md` §4.6).

use crate::models::PageParams;
use crate::{Error, Result};

/// Default `limit`/`pageSize` when the caller specifies neither.
pub const DEFAULT_LIMIT: usize = 20;
/// Hard ceiling on `limit`.
pub const MAX_LIMIT: usize = 500;
/// Hard ceiling on `pageSize`.
pub const MAX_PAGE_SIZE: usize = 500;

/// Raw pagination input as received from a caller: either `offset`/`limit`
/// or `page`/`pageSize`, never expected to carry both forms at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationRequest {
    /// Zero-based row offset.
    pub offset: Option<usize>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Rows per page.
    pub page_size: Option<usize>,
}

/// Normalizes a [`PaginationRequest`] into offset/limit form, clamping
/// `limit`/`page_size` to their configured maximums.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if both forms are supplied together,
/// or if `page` is given without `page_size` (or vice versa).
pub fn normalize(request: PaginationRequest, max_limit: usize, max_page_size: usize) -> Result<PageParams> {
    let uses_offset_form = request.offset.is_some() || request.limit.is_some();
    let uses_page_form = request.page.is_some() || request.page_size.is_some();

    if uses_offset_form && uses_page_form {
        return Err(Error::InvalidArgument("pagination parameters are internally inconsistent: specify offset/limit or page/pageSize, not both".to_string()));
    }

    if uses_page_form {
        let (Some(page), Some(page_size)) = (request.page, request.page_size) else {
            return Err(Error::InvalidArgument("page and pageSize must be supplied together".to_string()));
        };
        if page == 0 {
            return Err(Error::InvalidArgument("page is 1-based; page=0 is invalid".to_string()));
        }
        let page_size = page_size.min(max_page_size).max(1);
        let offset = (page - 1) * page_size;
        return Ok(PageParams { offset, limit: page_size, page: Some(page), page_size: Some(page_size) });
    }

    let limit = request.limit.unwrap_or(DEFAULT_LIMIT).min(max_limit).max(1);
    let offset = request.offset.unwrap_or(0);
    Ok(PageParams { offset, limit, page: None, page_size: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_specified() {
        let params = normalize(PaginationRequest::default(), MAX_LIMIT, MAX_PAGE_SIZE).unwrap();
        assert_eq!(params.offset, 0);
        assert_eq!(params.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn page_converts_to_offset() {
        let request = PaginationRequest { page: Some(3), page_size: Some(10), ..Default::default() };
        let params = normalize(request, MAX_LIMIT, MAX_PAGE_SIZE).unwrap();
        assert_eq!(params.offset, 20);
        assert_eq!(params.limit, 10);
        assert_eq!(params.page, Some(3));
    }

    #[test]
    fn limit_is_clamped_to_max() {
        let request = PaginationRequest { limit: Some(10_000), ..Default::default() };
        let params = normalize(request, MAX_LIMIT, MAX_PAGE_SIZE).unwrap();
        assert_eq!(params.limit, MAX_LIMIT);
    }

    #[test]
    fn mixing_both_forms_is_rejected() {
        let request = PaginationRequest { offset: Some(0), page: Some(1), page_size: Some(10), ..Default::default() };
        assert!(normalize(request, MAX_LIMIT, MAX_PAGE_SIZE).is_err());
    }

    #[test]
    fn page_without_page_size_is_rejected() {
        let request = PaginationRequest { page: Some(1), ..Default::default() };
        assert!(normalize(request, MAX_LIMIT, MAX_PAGE_SIZE).is_err());
    }
}
