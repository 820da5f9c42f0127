//! REST client for the querier service.

use std::time::Duration;

use baskt_core::{BasketNav, OpenInterest, PoolState, Position, PositionFilter};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::{BoxFuture, QueryClient};
use crate::error::{QueryError, QueryResult};

/// Default timeout for querier requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// `QueryClient` backed by the querier's REST API.
///
/// Endpoints, relative to `base_url`:
/// - `GET /positions?userId=&basktId=&isActive=`
/// - `GET /positions/{id}`
/// - `GET /pool`
/// - `GET /baskets/{id}/nav`
/// - `GET /baskets/{id}/open-interest`
pub struct HttpQueryClient {
    client: Client,
    base_url: String,
}

impl HttpQueryClient {
    pub fn new(base_url: impl Into<String>) -> QueryResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> QueryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> QueryResult<Response> {
        request
            .send()
            .await
            .map_err(|e| QueryError::Unavailable(format!("HTTP request failed: {e}")))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> QueryResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Querier returned error status");
            return Err(QueryError::HttpClient(format!("HTTP {status}: {body}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| QueryError::Unavailable(format!("Failed to read response: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> QueryResult<T> {
        let url = self.url(path);
        debug!(%url, "Querier GET");
        let response = self.send(self.client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QueryError::NotFound(path.to_string()));
        }
        Self::decode(response).await
    }
}

impl QueryClient for HttpQueryClient {
    fn get_positions<'a>(
        &'a self,
        filter: &'a PositionFilter,
    ) -> BoxFuture<'a, QueryResult<Vec<Position>>> {
        Box::pin(async move {
            let url = self.url("/positions");
            debug!(%url, filter = %filter.cache_key(), "Querier GET positions");
            let response = self.send(self.client.get(&url).query(filter)).await?;
            Self::decode(response).await
        })
    }

    fn get_position<'a>(
        &'a self,
        position_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<Option<Position>>> {
        Box::pin(async move {
            match self.get_json(&format!("/positions/{position_id}")).await {
                Ok(position) => Ok(Some(position)),
                Err(QueryError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    fn get_liquidity_pool(&self) -> BoxFuture<'_, QueryResult<PoolState>> {
        Box::pin(self.get_json("/pool"))
    }

    fn get_basket_nav<'a>(&'a self, basket_id: &'a str) -> BoxFuture<'a, QueryResult<BasketNav>> {
        Box::pin(async move { self.get_json(&format!("/baskets/{basket_id}/nav")).await })
    }

    fn get_open_interest<'a>(
        &'a self,
        basket_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<OpenInterest>> {
        Box::pin(async move {
            self.get_json(&format!("/baskets/{basket_id}/open-interest"))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpQueryClient::new("http://localhost:4000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(client.url("/pool"), "http://localhost:4000/pool");
    }

    #[tokio::test]
    async fn test_unreachable_querier_is_unavailable() {
        let client =
            HttpQueryClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = client.get_liquidity_pool().await.unwrap_err();
        assert!(matches!(err, QueryError::Unavailable(_)));
    }
}
