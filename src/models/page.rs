use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Raw pagination query parameters as they appear on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

/// Normalized pagination parameters. `sort_by` is kept as the raw key; each
/// store maps it against its own column whitelist and falls back to
/// `created_at` for anything unrecognized.
#[derive(Debug, Clone)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl PageParams {
    pub fn new(
        page: Option<u32>,
        limit: Option<u32>,
        sort_by: Option<String>,
        sort_order: Option<SortOrder>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            sort_by,
            sort_order: sort_order.unwrap_or(SortOrder::Desc),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

impl From<PageQuery> for PageParams {
    fn from(query: PageQuery) -> Self {
        Self::new(query.page, query.limit, query.sort_by, query.sort_order)
    }
}

/// Page metadata on every paginated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl PageInfo {
    pub fn new(params: &PageParams, total: u64) -> Self {
        Self {
            page: params.page,
            limit: params.limit,
            total,
            pages: (total + params.limit as u64 - 1) / params.limit as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_and_clamping() {
        let params = PageParams::new(None, None, None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(params.sort_order, SortOrder::Desc);

        let params = PageParams::new(Some(0), Some(1000), None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn test_offset() {
        let params = PageParams::new(Some(3), Some(10), None, None);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn test_page_count_is_ceiling_of_total_over_limit() {
        let params = PageParams::new(Some(1), Some(10), None, None);
        assert_eq!(PageInfo::new(&params, 0).pages, 0);
        assert_eq!(PageInfo::new(&params, 10).pages, 1);
        assert_eq!(PageInfo::new(&params, 11).pages, 2);
        assert_eq!(PageInfo::new(&params, 25).pages, 3);
    }
}
