//! HTTP client for a keyed-record service exposing records and subscriptions
//! as REST resources.
//!
//! | Operation          | Request                                           |
//! |--------------------|---------------------------------------------------|
//! | save record        | `PUT    /{db}/records/{type}/{key}`               |
//! | query              | `GET    /{db}/records/{type}?sort=..&order=desc`  |
//! | delete record      | `DELETE /{db}/records/{type}/{key}`               |
//! | fetch subscription | `GET    /{db}/subscriptions/{id}`                 |
//! | save subscription  | `PUT    /{db}/subscriptions/{id}`                 |

use async_trait::async_trait;
use noticeboard_core::RemoteRecord;
use reqwest::{Response, StatusCode};
use tracing::{debug, info};

use crate::RemoteError;
use crate::remote::{QueryResults, RecordQuery, RemoteDatabase, Subscription};

/// Remote store reached over HTTP.
pub struct HttpDatabase {
    client: reqwest::Client,
    base_url: String,
    database: String,
}

impl HttpDatabase {
    /// Create a client for the given service base URL and database name.
    ///
    /// `base_url` should be like `http://localhost:4000` (a trailing slash is
    /// trimmed).
    pub fn new(base_url: String, database: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
        }
    }

    fn records_url(&self, record_type: &str) -> String {
        format!("{}/{}/records/{}", self.base_url, self.database, record_type)
    }

    fn record_url(&self, record_type: &str, key: &str) -> String {
        format!("{}/{}", self.records_url(record_type), key)
    }

    fn subscription_url(&self, id: &str) -> String {
        format!("{}/{}/subscriptions/{}", self.base_url, self.database, id)
    }
}

/// Turn a non-success response into [`RemoteError::Server`].
async fn check(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Server {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteDatabase for HttpDatabase {
    async fn save_record(&self, record: RemoteRecord) -> Result<(), RemoteError> {
        let url = self.record_url(&record.record_type, &record.key);
        info!(url = %url, "saving record");
        let resp = self.client.put(&url).json(&record).send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn query_records(&self, query: &RecordQuery) -> Result<QueryResults, RemoteError> {
        let url = self.records_url(&query.record_type);
        let order = if query.descending { "desc" } else { "asc" };
        info!(url = %url, sort = %query.sort_by, order, "querying records");
        let resp = self
            .client
            .get(&url)
            .query(&[("sort", query.sort_by.as_str()), ("order", order)])
            .send()
            .await?;
        let resp = check(resp).await?;

        // Parse per record so one malformed entry does not fail the batch.
        let raw: Vec<serde_json::Value> = resp.json().await?;
        info!(count = raw.len(), "queried records");
        Ok(raw
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(RemoteError::from))
            .collect())
    }

    async fn delete_record(&self, record_type: &str, key: &str) -> Result<(), RemoteError> {
        let url = self.record_url(record_type, key);
        info!(url = %url, "deleting record");
        let resp = self.client.delete(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(url = %url, "record already absent");
            return Ok(());
        }
        check(resp).await?;
        Ok(())
    }

    async fn fetch_subscription(&self, id: &str) -> Result<Option<Subscription>, RemoteError> {
        let url = self.subscription_url(id);
        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp).await?;
        Ok(Some(resp.json().await?))
    }

    async fn save_subscription(&self, subscription: Subscription) -> Result<(), RemoteError> {
        let url = self.subscription_url(&subscription.id);
        info!(url = %url, "saving subscription");
        let resp = self.client.put(&url).json(&subscription).send().await?;
        check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let db = HttpDatabase::new("http://localhost:4000/".into(), "public".into());
        assert_eq!(db.base_url, "http://localhost:4000");
    }

    #[test]
    fn builds_resource_urls() {
        let db = HttpDatabase::new("http://localhost:4000".into(), "public".into());
        assert_eq!(
            db.records_url("Notice"),
            "http://localhost:4000/public/records/Notice"
        );
        assert_eq!(
            db.record_url("Notice", "abc"),
            "http://localhost:4000/public/records/Notice/abc"
        );
        assert_eq!(
            db.subscription_url("notice-changes"),
            "http://localhost:4000/public/subscriptions/notice-changes"
        );
    }

    #[test]
    fn malformed_entries_fail_individually() {
        let raw: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"recordType": "Notice", "key": "a", "attributes": {}},
                {"recordType": "Notice"},
                {"recordType": "Notice", "key": "c"}
            ]"#,
        )
        .unwrap();
        let parsed: Vec<Result<RemoteRecord, RemoteError>> = raw
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(RemoteError::from))
            .collect();
        assert!(parsed[0].is_ok());
        assert!(matches!(parsed[1], Err(RemoteError::Json(_))));
        assert_eq!(parsed[2].as_ref().unwrap().key, "c");
    }
}
