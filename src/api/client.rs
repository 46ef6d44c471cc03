//! Typed operations against the upstream cat catalog API.
//!
//! Each operation shapes and logs one request, dispatches it through the
//! transport, and returns the raw JSON records for the mapper to normalize.
//! Pagination across pages is the sync job's concern; retry is the
//! transport's.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::api::transport::{Method, Transport, TransportError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("limit must be positive")]
    InvalidLimit,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

pub struct CatApiClient {
    transport: Transport,
    host: String,
}

impl CatApiClient {
    pub fn new(transport: Transport, host: &str) -> Self {
        Self {
            transport,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    /// One page of raw breed records.
    pub fn list_breeds(&self, page: usize, limit: usize) -> Result<Vec<Value>, ApiError> {
        if limit == 0 {
            return Err(ApiError::InvalidLimit);
        }
        let url = format!("{}/v1/breeds", self.host);
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        info!("Fetching breeds: {url} - page={page} limit={limit}");
        let body = self.transport.send(Method::Get, &url, &query)?;
        decode_array(&body)
    }

    /// Single raw image record by external id.
    pub fn get_image(&self, id: &str) -> Result<Value, ApiError> {
        let url = format!("{}/v1/images/{id}", self.host);
        info!("Fetching image: {url}");
        let body = self.transport.send(Method::Get, &url, &[])?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// One page of raw image records from the search endpoint; alternate
    /// discovery path when images are not known via breed references.
    pub fn search_images(&self, page: usize, limit: usize) -> Result<Vec<Value>, ApiError> {
        if limit == 0 {
            return Err(ApiError::InvalidLimit);
        }
        let url = format!("{}/v1/images/search", self.host);
        let query = [
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("has_breeds", "1".to_string()),
            ("order", "DESC".to_string()),
        ];
        info!("Searching images: {url} - page={page} limit={limit}");
        let body = self.transport.send(Method::Get, &url, &query)?;
        decode_array(&body)
    }

    /// Raw image content from its source url.
    pub fn fetch_content(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        info!("Fetching raw image data: {url}");
        Ok(self.transport.fetch_bytes(url)?)
    }
}

fn decode_array(body: &str) -> Result<Vec<Value>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ApiError::Decode(format!(
            "expected a JSON array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sim::{SimResponse, SimTable};
    use serde_json::json;

    fn client(table: SimTable) -> CatApiClient {
        CatApiClient::new(Transport::simulated(table), "sim://api.thecatapi.com/")
    }

    #[test]
    fn list_breeds_shapes_query_and_decodes_page() {
        let table = SimTable::new().route("/v1/breeds", |req| {
            assert_eq!(req.query_param("page"), Some("3"));
            assert_eq!(req.query_param("limit"), Some("25"));
            SimResponse::json(200, &json!([{"id": "aege"}, {"id": "munc"}]))
        });
        let breeds = client(table).list_breeds(3, 25).unwrap();
        assert_eq!(breeds.len(), 2);
        assert_eq!(breeds[0]["id"], "aege");
    }

    #[test]
    fn zero_limit_is_rejected_before_dispatch() {
        // An empty table would panic on any dispatch, so reaching the
        // transport at all fails this test.
        let err = client(SimTable::new()).list_breeds(0, 0).unwrap_err();
        assert!(matches!(err, ApiError::InvalidLimit));
        let err = client(SimTable::new()).search_images(0, 0).unwrap_err();
        assert!(matches!(err, ApiError::InvalidLimit));
    }

    #[test]
    fn get_image_resolves_parameterized_path() {
        let table = SimTable::new().route("/v1/images/[A-Za-z0-9_-]+", |_| {
            SimResponse::json(200, &json!({"id": "j5cVSqLer", "width": 1600}))
        });
        let image = client(table).get_image("j5cVSqLer").unwrap();
        assert_eq!(image["id"], "j5cVSqLer");
    }

    #[test]
    fn search_images_sends_discovery_parameters() {
        let table = SimTable::new().route("/v1/images/search", |req| {
            assert_eq!(req.query_param("has_breeds"), Some("1"));
            assert_eq!(req.query_param("order"), Some("DESC"));
            SimResponse::json(200, &json!([{"id": "abc"}]))
        });
        let images = client(table).search_images(0, 10).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn transport_errors_pass_through_unchanged() {
        let table =
            SimTable::new().route("/v1/breeds", |_| SimResponse::status(403));
        let err = client(table).list_breeds(0, 10).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::Status { status: 403, .. })
        ));
    }

    #[test]
    fn non_array_page_is_a_decode_error() {
        let table = SimTable::new()
            .route("/v1/breeds", |_| SimResponse::json(200, &json!({"oops": 1})));
        let err = client(table).list_breeds(0, 10).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
