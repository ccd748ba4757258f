//! HTTP client for a single upstream service.

use std::sync::Arc;

use civic_feed_message::{ValidationError, parse_message, parse_messages, parse_sources};
use civic_feed_message_models::{Dialect, IncomingMessage, Source};

use crate::UpstreamError;
use crate::cache::SharedCache;
use crate::query::{MessageQuery, encode, endpoint_url};
use crate::registry::{UpstreamService, find_service};

/// Fetches and validates messages and sources from one upstream.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    service: UpstreamService,
    base_url: String,
}

impl UpstreamClient {
    /// Creates a client for `service` using its resolved base URL.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if the HTTP client cannot be built.
    pub fn new(service: UpstreamService) -> Result<Self, UpstreamError> {
        let base_url = service.resolved_base_url();
        Self::with_base_url(service, base_url)
    }

    /// Creates a client for `service` talking to an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if the HTTP client cannot be built.
    pub fn with_base_url(
        service: UpstreamService,
        base_url: impl Into<String>,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(service.timeout())
            .user_agent(concat!("civic_feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Config {
                message: format!("failed to build HTTP client for {}: {e}", service.id),
            })?;

        Ok(Self::with_http_client(service, base_url, http))
    }

    /// Creates a client around an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_http_client(
        service: UpstreamService,
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::debug!("{} client using {base_url}", service.name);

        Self {
            http,
            service,
            base_url,
        }
    }

    /// Creates a client for the enabled service with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if no such service is enabled.
    pub fn for_service(id: &str) -> Result<Self, UpstreamError> {
        let service = find_service(id).ok_or_else(|| UpstreamError::Config {
            message: format!("unknown upstream service '{id}'"),
        })?;
        Self::new(service)
    }

    /// The service configuration.
    #[must_use]
    pub const fn service(&self) -> &UpstreamService {
        &self.service
    }

    /// The payload dialect of this service.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.service.dialect
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the message list request for `query`.
    #[must_use]
    pub fn messages_url(&self, query: &MessageQuery) -> String {
        endpoint_url(
            &self.base_url,
            &self.service.endpoints.messages,
            &query.to_query_string(),
        )
    }

    /// Fetches the message list matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] if the request fails or the
    /// status is not 2xx, and [`UpstreamError::Validation`] if the body does
    /// not match the schema.
    pub async fn fetch_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<Vec<IncomingMessage>, UpstreamError> {
        let context = self.dialect().messages_context();
        let body = self.get_json(&self.messages_url(query), context).await?;
        let messages = parse_messages(body, self.dialect())?;
        log::info!(
            "{}: fetched {} messages",
            self.service.name,
            messages.len()
        );
        Ok(messages)
    }

    /// Fetches a single message by id.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if the service has no lookup
    /// endpoint, otherwise the same errors as [`Self::fetch_messages`].
    pub async fn fetch_message(&self, id: &str) -> Result<IncomingMessage, UpstreamError> {
        let path = self
            .service
            .endpoints
            .message_by_id
            .as_deref()
            .ok_or_else(|| UpstreamError::Config {
                message: format!("{} does not support lookup by id", self.service.name),
            })?;

        let url = endpoint_url(&self.base_url, path, &format!("id={}", encode(id)));
        let body = self.get_json(&url, self.dialect().message_context()).await?;
        Ok(parse_message(body, self.dialect())?)
    }

    /// Fetches the full sources list.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_messages`].
    pub async fn fetch_sources(&self) -> Result<Vec<Source>, UpstreamError> {
        let url = endpoint_url(&self.base_url, &self.service.endpoints.sources, "");
        let body = self.get_json(&url, self.dialect().sources_context()).await?;
        Ok(parse_sources(body, self.dialect())?)
    }

    /// Returns the sources list through `cache`, keyed by service id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_sources`]. Failures are not cached.
    pub async fn cached_sources(
        &self,
        cache: &SharedCache<Arc<Vec<Source>>>,
    ) -> Result<Arc<Vec<Source>>, UpstreamError> {
        cache
            .get_or_fetch(&self.service.id, move || async move {
                self.fetch_sources().await.map(Arc::new)
            })
            .await
    }

    async fn get_json(
        &self,
        url: &str,
        context: &'static str,
    ) -> Result<serde_json::Value, UpstreamError> {
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                context,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("{context}: HTTP {status} from {url}");
            return Err(UpstreamError::Transport {
                context,
                message: status.to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport {
                context,
                message: e.to_string(),
            })?;

        decode_body(&text, context)
    }
}

/// Parses a response body as JSON. A non-JSON body is a schema violation.
fn decode_body(text: &str, context: &'static str) -> Result<serde_json::Value, UpstreamError> {
    serde_json::from_str(text).map_err(|e| {
        ValidationError::new(context, format!("response body is not JSON: {e}")).into()
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one canned HTTP response on a random local port and returns
    /// the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}")
    }

    fn client(id: &str, base_url: &str) -> UpstreamClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        UpstreamClient::with_http_client(find_service(id).unwrap(), base_url, http)
    }

    #[test]
    fn builds_messages_url() {
        let client = client("updates", "https://api.example.org/");
        let query = MessageQuery {
            zoom: Some(14.0),
            categories: vec!["water".to_string()],
            ..MessageQuery::default()
        };
        assert_eq!(
            client.messages_url(&query),
            "https://api.example.org/updates?zoom=14&categories=water"
        );
    }

    #[test]
    fn non_json_body_is_a_validation_error() {
        let err = decode_body("<html>", "Updates list").unwrap_err();
        assert!(matches!(err, UpstreamError::Validation(_)));
        assert!(err.to_string().starts_with("Updates list: invalid response payload"));
    }

    #[test]
    fn unknown_service_is_a_config_error() {
        assert!(matches!(
            UpstreamClient::for_service("payload"),
            Err(UpstreamError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn fetches_and_validates_messages() {
        let base = serve_once(
            "200 OK",
            r#"{"messages":[{"id":"m1","text":"Repair works","createdAt":"2025-01-05T08:00:00Z","locality":"bg.sofia"}]}"#,
        )
        .await;
        let messages = client("updates", &base)
            .fetch_messages(&MessageQuery::default())
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let base = serve_once("503 Service Unavailable", "{}").await;
        let err = client("oboapp", &base)
            .fetch_messages(&MessageQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport { .. }));
        assert!(err.to_string().contains("Service Unavailable"));
        assert!(err.to_string().starts_with("OboApp messages"));
    }

    #[tokio::test]
    async fn schema_violation_is_a_validation_error() {
        let base = serve_once(
            "200 OK",
            r#"{"messages":[{"text":"No locality","createdAt":"2025-01-05T08:00:00Z"}]}"#,
        )
        .await;
        let err = client("updates", &base)
            .fetch_messages(&MessageQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Validation(_)));
        assert!(err.to_string().contains("invalid response payload"));
    }

    #[tokio::test]
    async fn lookup_by_id_requires_endpoint() {
        let err = client("oboapp", "http://127.0.0.1:9")
            .fetch_message("m1")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Config { .. }));
    }

    #[tokio::test]
    async fn sources_are_cached_per_service() {
        let base = serve_once(
            "200 OK",
            r#"{"sources":[{"id":"sofiyska-voda","name":"Sofiyska Voda","url":"https://example.org"}]}"#,
        )
        .await;
        let client = client("oboapp", &base);
        let cache = SharedCache::new(
            client.service().sources_ttl(),
            Arc::new(crate::cache::ManualClock::new()),
        );

        let first = client.cached_sources(&cache).await.unwrap();
        // The stub only answers once; a second request would fail.
        let second = client.cached_sources(&cache).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
