//! Read side of the manager REST surface: `GET /queue` (paginated).

use serde_json::Value;

use janitor_http::{ApiResponse, HttpClient, RequestPolicy};

/// One page of a manager's `/queue` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueuePage {
    /// Total records the manager reports across all pages.
    pub total_records: u64,
    /// The raw item objects on this page.
    pub records: Vec<Value>,
}

/// Thin wrapper over a manager's base URL and API key.
pub struct ManagerClient<'a> {
    http: &'a HttpClient,
    service: &'a str,
    api_url: &'a str,
    api_key: &'a str,
    policy: RequestPolicy,
}

impl<'a> ManagerClient<'a> {
    /// Build a client for one manager instance.
    #[must_use]
    pub const fn new(http: &'a HttpClient, service: &'a str, api_url: &'a str, api_key: &'a str, policy: RequestPolicy) -> Self {
        Self { http, service, api_url, api_key, policy }
    }

    /// Fetch one page of the queue. `page` is 1-indexed, matching the
    /// manager APIs' own convention.
    pub async fn fetch_queue_page(&self, page: u64, page_size: u64) -> Option<QueuePage> {
        let url = format!("{}/queue", self.api_url.trim_end_matches('/'));
        let page_str = page.to_string();
        let size_str = page_size.to_string();
        let query = [("page", page_str.as_str()), ("pageSize", size_str.as_str())];

        let response = self
            .http
            .request(self.service, reqwest::Method::GET, &url, Some(self.api_key), &query, None, self.policy)
            .await
            .ok()?;

        let ApiResponse::Json(body) = response else {
            tracing::warn!(service = self.service, "queue page response was not json");
            return None;
        };
        let total_records = body.get("totalRecords").and_then(Value::as_u64).unwrap_or(0);
        let records = body.get("records").and_then(Value::as_array).cloned().unwrap_or_default();
        Some(QueuePage { total_records, records })
    }

    /// Send `DELETE /queue/{id}` with the given query parameters.
    pub async fn delete_queue_item(&self, id: i64, query: &[(&str, &str)]) -> bool {
        let url = format!("{}/queue/{id}", self.api_url.trim_end_matches('/'));
        self.http
            .request(self.service, reqwest::Method::DELETE, &url, Some(self.api_key), query, None, self.policy)
            .await
            .is_ok()
    }

    /// POST a search command body to `/command`.
    pub async fn post_command(&self, body: &Value) -> bool {
        let url = format!("{}/command", self.api_url.trim_end_matches('/'));
        self.http
            .request(self.service, reqwest::Method::POST, &url, Some(self.api_key), &[], Some(body), self.policy)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_page_defaults_to_empty() {
        let page = QueuePage::default();
        assert_eq!(page.total_records, 0);
        assert!(page.records.is_empty());
    }
}
