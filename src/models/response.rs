use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::page::PageInfo;

/// The JSON envelope carried by every API response:
/// `{success, message, data?, errors?, pageInfo?}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            page_info: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, page_info: PageInfo) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            page_info: Some(page_info),
        }
    }
}

impl ApiResponse<()> {
    /// Success envelope with no payload, e.g. logout or member removal.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            errors: None,
            page_info: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let json = serde_json::to_value(ApiResponse::message("Logged out successfully")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("data").is_none());
        assert!(json.get("errors").is_none());
        assert!(json.get("pageInfo").is_none());
    }

    #[test]
    fn test_page_info_uses_camel_case() {
        use crate::models::page::{PageInfo, PageParams};
        let params = PageParams::new(Some(2), Some(10), None, None);
        let resp = ApiResponse::paginated("ok", vec![1, 2], PageInfo::new(&params, 12));
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["pageInfo"]["pages"], 2);
        assert_eq!(json["pageInfo"]["page"], 2);
    }
}
