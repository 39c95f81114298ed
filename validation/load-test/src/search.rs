//! Search request construction and search response parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{ApiClient, RequestOutcome};
use crate::target::Target;

/// Year range sent with every search.
pub const YEAR_RANGE: [u16; 2] = [1947, 2023];

/// Body of `POST /api/v1/searches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_string: String,
    pub exact_match: bool,
    pub max_passages_per_doc: u32,
    pub keyword_filters: BTreeMap<String, Vec<String>>,
    pub year_range: [u16; 2],
    pub sort_field: Option<String>,
    pub sort_order: String,
    pub limit: u32,
    pub offset: u32,
}

impl SearchRequest {
    /// Request for a free-text query.
    ///
    /// With `encode_query` set, `query_string` carries the same URL-encoded
    /// form used in the UI search URL, which is what the target API has always
    /// received from this generator.
    pub fn for_query(query: &str, encode_query: bool) -> Self {
        let query_string = if encode_query {
            encode_query_component(query)
        } else {
            query.to_string()
        };
        Self {
            query_string,
            exact_match: false,
            max_passages_per_doc: 10,
            keyword_filters: BTreeMap::new(),
            year_range: YEAR_RANGE,
            sort_field: None,
            sort_order: "desc".to_string(),
            limit: 10,
            offset: 0,
        }
    }
}

/// Percent-encode a query for use as a URL component.
pub fn encode_query_component(query: &str) -> String {
    urlencoding::encode(query).into_owned()
}

/// Parsed search API response. Only the fields a walk navigates by are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub families: Vec<FamilyResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyResult {
    pub family_slug: String,
    #[serde(default)]
    pub family_documents: Vec<DocumentResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentResult {
    pub document_slug: String,
}

impl SearchResponse {
    /// Parse the body of a search outcome. A missing or malformed body yields
    /// no families.
    pub fn from_outcome(outcome: &RequestOutcome) -> Self {
        outcome
            .body
            .as_ref()
            .and_then(|body| serde_json::from_value(body.clone()).ok())
            .unwrap_or_default()
    }

    /// Families that can be opened, i.e. list at least one document.
    pub fn openable_families(&self) -> Vec<&FamilyResult> {
        self.families
            .iter()
            .filter(|f| !f.family_documents.is_empty())
            .collect()
    }
}

/// Load the UI results page, then query the search API.
///
/// Returns the API outcome; the page load is only a side effect.
pub async fn do_basic_search(
    client: &dyn ApiClient,
    target: &Target,
    query: &str,
    encode_query_in_body: bool,
) -> RequestOutcome {
    info!(query, "Searching");

    client
        .get(&target.search_page_url(&encode_query_component(query)))
        .await;

    let request = SearchRequest::for_query(query, encode_query_in_body);
    // Plain data with string keys, serialization cannot fail
    let body = serde_json::to_value(&request).unwrap_or_default();
    client.post_json(&target.search_api_url(), &body).await
}
