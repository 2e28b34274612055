use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::PagingConfig;
use crate::persistence::{Page, PageRequest};

// ============================================================================
// HAL helpers - `_links`, `_embedded` and paging metadata
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub href: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
}

pub type Links = BTreeMap<&'static str, Link>;

/// Builds absolute hrefs from the request's scheme and host.
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn from_request(req: &HttpRequest) -> Self {
        let info = req.connection_info();
        Self {
            base: format!("{}://{}", info.scheme(), info.host()),
        }
    }

    pub fn link(&self, path: &str) -> Link {
        Link {
            href: format!("{}{}", self.base, path),
            templated: false,
        }
    }

    pub fn templated(&self, path: &str) -> Link {
        Link {
            href: format!("{}{}", self.base, path),
            templated: true,
        }
    }
}

/// A single resource with its links flattened next to its fields.
#[derive(Debug, Serialize)]
pub struct EntityModel<T: Serialize> {
    #[serde(flatten)]
    pub content: T,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u32,
}

#[derive(Debug, Serialize)]
pub struct CollectionModel<T: Serialize> {
    #[serde(rename = "_embedded")]
    pub embedded: BTreeMap<&'static str, Vec<T>>,
    #[serde(rename = "_links")]
    pub links: Links,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageMetadata>,
}

impl<T: Serialize> CollectionModel<T> {
    pub fn new(rel: &'static str, items: Vec<T>, links: Links) -> Self {
        Self {
            embedded: BTreeMap::from([(rel, items)]),
            links,
            page: None,
        }
    }

    /// Collection for one page; adds first/prev/next/last links.
    pub fn paged<E>(
        rel: &'static str,
        page: &Page<E>,
        items: Vec<T>,
        path: &str,
        links: &LinkBuilder,
    ) -> Self {
        let page_link = |number: u64| links.link(&format!("{path}?page={number}&size={}", page.size));

        let mut map = Links::new();
        map.insert("self", page_link(u64::from(page.number)));
        if page.total_pages() > 0 {
            map.insert("first", page_link(0));
            map.insert("last", page_link(page.total_pages() - 1));
        }
        if page.has_previous() {
            map.insert("prev", page_link(u64::from(page.number) - 1));
        }
        if page.has_next() {
            map.insert("next", page_link(u64::from(page.number) + 1));
        }
        map.insert("profile", links.link(&format!("/profile{path}")));

        Self {
            embedded: BTreeMap::from([(rel, items)]),
            links: map,
            page: Some(PageMetadata {
                size: page.size,
                total_elements: page.total_elements,
                total_pages: page.total_pages(),
                number: page.number,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    pub fn to_request(&self, paging: &PagingConfig) -> PageRequest {
        let size = self
            .size
            .unwrap_or(paging.default_page_size)
            .clamp(1, paging.max_page_size);
        PageRequest::new(self.page.unwrap_or(0), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults_and_cap() {
        let paging = PagingConfig::default();

        let request = PageParams::default().to_request(&paging);
        assert_eq!(request, PageRequest::new(0, 20));

        let request = PageParams { page: Some(2), size: Some(5000) }.to_request(&paging);
        assert_eq!(request, PageRequest::new(2, 1000));

        let request = PageParams { page: None, size: Some(0) }.to_request(&paging);
        assert_eq!(request.size, 1);
    }

    #[test]
    fn test_paged_collection_links() {
        let builder = LinkBuilder {
            base: "http://localhost:8080".to_string(),
        };
        let page: Page<u8> = Page::new(vec![1, 2], PageRequest::new(1, 2), 5);

        let model = CollectionModel::paged("numbers", &page, vec![1, 2], "/numbers", &builder);
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["_embedded"]["numbers"], serde_json::json!([1, 2]));
        assert_eq!(json["page"]["totalPages"], 3);
        assert_eq!(json["page"]["totalElements"], 5);
        assert_eq!(
            json["_links"]["next"]["href"],
            "http://localhost:8080/numbers?page=2&size=2"
        );
        assert_eq!(
            json["_links"]["prev"]["href"],
            "http://localhost:8080/numbers?page=0&size=2"
        );
        assert!(json["_links"]["self"].get("templated").is_none());
    }
}
