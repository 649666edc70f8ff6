//! HTTP transport: request building and mapping of responses onto
//! [`ClientError`].

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// How a non-success status is read for a given kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    General,
    /// Status changes: a refusal is about the transition, not the caller
    Transition,
    /// Credential checks: every client error means the credential is bad
    Profile,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map an HTTP failure to the client taxonomy
pub fn classify(status: StatusCode, endpoint: Endpoint, message: String) -> ClientError {
    let code = status.as_u16();

    if status.is_server_error() {
        return ClientError::Network(format!("server returned {}: {}", code, message));
    }

    match (endpoint, code) {
        (Endpoint::Profile, 400..=499) => ClientError::Auth(message),
        (Endpoint::Transition, 403 | 409) => ClientError::InvalidTransition(message),
        (_, 409) => ClientError::InvalidTransition(message),
        (_, 401 | 403 | 429) => ClientError::Auth(message),
        (_, 400..=499) => ClientError::Validation(message),
        _ => ClientError::Network(format!("unexpected status {}: {}", code, message)),
    }
}

/// Thin wrapper over `reqwest` for the alert API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a request for `path`, with the bearer credential if given
    pub fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode the success body as `R`
    pub async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
    ) -> ClientResult<R> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let response = Self::check(response, endpoint).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| ClientError::Network(format!("Invalid response body: {}", e)))
    }

    async fn check(response: Response, endpoint: Endpoint) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        debug!(status = status.as_u16(), "Request failed: {}", message);
        Err(classify(status, endpoint, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_code(code: u16, endpoint: Endpoint) -> ClientError {
        classify(
            StatusCode::from_u16(code).unwrap(),
            endpoint,
            "msg".to_string(),
        )
    }

    #[test]
    fn test_general_mapping() {
        assert!(matches!(
            classify_code(400, Endpoint::General),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            classify_code(404, Endpoint::General),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            classify_code(401, Endpoint::General),
            ClientError::Auth(_)
        ));
        assert!(matches!(
            classify_code(403, Endpoint::General),
            ClientError::Auth(_)
        ));
        assert!(matches!(
            classify_code(429, Endpoint::General),
            ClientError::Auth(_)
        ));
        assert!(matches!(
            classify_code(409, Endpoint::General),
            ClientError::InvalidTransition(_)
        ));
        assert!(matches!(
            classify_code(503, Endpoint::General),
            ClientError::Network(_)
        ));
    }

    #[test]
    fn test_transition_mapping() {
        assert_eq!(
            classify_code(403, Endpoint::Transition),
            ClientError::InvalidTransition("msg".to_string())
        );
        assert!(matches!(
            classify_code(401, Endpoint::Transition),
            ClientError::Auth(_)
        ));
        assert!(matches!(
            classify_code(400, Endpoint::Transition),
            ClientError::Validation(_)
        ));
    }

    #[test]
    fn test_profile_mapping() {
        for code in [400, 401, 403, 404] {
            assert!(matches!(
                classify_code(code, Endpoint::Profile),
                ClientError::Auth(_)
            ));
        }
        assert!(matches!(
            classify_code(500, Endpoint::Profile),
            ClientError::Network(_)
        ));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/");
        let request = client
            .request(Method::GET, "/api/alerts", None)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:5000/api/alerts");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is not served in the test environment
        let client = ApiClient::new("http://127.0.0.1:9");
        let request = client.request(Method::GET, "/api/alerts", None);
        let result: ClientResult<serde_json::Value> = client.send(request, Endpoint::General).await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }
}
