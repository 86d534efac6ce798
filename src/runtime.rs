//! Remote model invocation.

use crate::error::{parse_retry_after, service_message, Result, SdxlError};
use async_trait::async_trait;

/// Environment variable holding the Bedrock API key.
pub const TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
/// Environment variable overriding the runtime endpoint.
pub const ENDPOINT_ENV: &str = "BEDROCK_ENDPOINT";
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Sends a serialized request body to a model and returns the raw response body.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Invokes `model_id` with `body`. One attempt, no retries.
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>>;
}

/// Builder for [`BedrockRuntime`].
#[derive(Debug, Clone, Default)]
pub struct BedrockRuntimeBuilder {
    token: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    client: Option<reqwest::Client>,
}

impl BedrockRuntimeBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `AWS_BEARER_TOKEN_BEDROCK`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the region. Falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Overrides the endpoint URL. Falls back to `BEDROCK_ENDPOINT`, then the
    /// regional endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Uses an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the runtime, resolving credentials and endpoint.
    pub fn build(self) -> Result<BedrockRuntime> {
        let token = self
            .token
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SdxlError::Auth(format!("{TOKEN_ENV} not set and no token provided"))
            })?;

        let endpoint = match self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV).ok())
        {
            Some(endpoint) => endpoint,
            None => {
                let region = self
                    .region
                    .or_else(|| std::env::var("AWS_REGION").ok())
                    .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
                    .unwrap_or_else(|| DEFAULT_REGION.to_string());
                format!("https://bedrock-runtime.{region}.amazonaws.com")
            }
        };

        let endpoint = reqwest::Url::parse(&endpoint)
            .map_err(|e| SdxlError::InvalidRequest(format!("invalid endpoint {endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(SdxlError::InvalidRequest(format!(
                "invalid endpoint {endpoint}"
            )));
        }

        Ok(BedrockRuntime {
            client: self.client.unwrap_or_default(),
            token,
            endpoint,
        })
    }
}

/// Bedrock runtime client authenticated with an API key.
pub struct BedrockRuntime {
    client: reqwest::Client,
    token: String,
    endpoint: reqwest::Url,
}

impl BedrockRuntime {
    /// Creates a new `BedrockRuntimeBuilder`.
    pub fn builder() -> BedrockRuntimeBuilder {
        BedrockRuntimeBuilder::new()
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn invoke_url(&self, model_id: &str) -> reqwest::Url {
        let mut url = self.endpoint.clone();
        // Checked in build().
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("model")
                .push(model_id)
                .push("invoke");
        }
        url
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> SdxlError {
        let message = service_message(text);
        match status {
            400 | 422 => SdxlError::InvalidRequest(message),
            401 | 403 => SdxlError::Auth(message),
            429 => SdxlError::RateLimited {
                retry_after: parse_retry_after(headers),
            },
            _ => SdxlError::Api { status, message },
        }
    }
}

#[async_trait]
impl ModelInvoker for BedrockRuntime {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.invoke_url(model_id);
        tracing::debug!(url = %url, bytes = body.len(), "invoking model");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "stability.stable-diffusion-xl-v1";

    fn runtime(server: &MockServer) -> BedrockRuntime {
        BedrockRuntime::builder()
            .token("test-token")
            .endpoint(server.uri())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_with_explicit_token() {
        let runtime = BedrockRuntime::builder()
            .token("abc")
            .region("eu-central-1")
            .build();
        assert!(runtime.is_ok());
    }

    #[test]
    fn test_builder_regional_endpoint() {
        let runtime = BedrockRuntime::builder()
            .token("abc")
            .region("us-west-2")
            .build()
            .unwrap();
        // An explicit endpoint env var would take precedence.
        if std::env::var(ENDPOINT_ENV).is_err() {
            assert_eq!(
                runtime.endpoint(),
                "https://bedrock-runtime.us-west-2.amazonaws.com/"
            );
        }
    }

    #[test]
    fn test_builder_rejects_bad_endpoint() {
        let err = BedrockRuntime::builder()
            .token("abc")
            .endpoint("not a url")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SdxlError::InvalidRequest(_)));
    }

    #[test]
    fn test_invoke_url() {
        let runtime = BedrockRuntime::builder()
            .token("abc")
            .endpoint("https://bedrock-runtime.us-east-1.amazonaws.com")
            .build()
            .unwrap();
        assert_eq!(
            runtime.invoke_url(MODEL).as_str(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/stability.stable-diffusion-xl-v1/invoke"
        );
    }

    #[tokio::test]
    async fn test_invoke_sends_body_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/model/{MODEL}/invoke")))
            .and(header("authorization", "Bearer test-token"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"text_prompts": [{"text": "a", "weight": 1.0}]})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"artifacts":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let body = br#"{"text_prompts":[{"text":"a","weight":1.0}]}"#.to_vec();
        let response = runtime(&server).invoke_model(MODEL, body).await.unwrap();
        assert_eq!(response, br#"{"artifacts":[]}"#);
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"message":"The security token included in the request is invalid."}"#),
            )
            .mount(&server)
            .await;

        let err = runtime(&server)
            .invoke_model(MODEL, b"{}".to_vec())
            .await
            .unwrap_err();
        match err {
            SdxlError::Auth(msg) => assert!(msg.contains("security token")),
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_throttling_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .set_body_string(r#"{"message":"Too many requests"}"#),
            )
            .mount(&server)
            .await;

        let err = runtime(&server)
            .invoke_model(MODEL, b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdxlError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn test_validation_error_maps_to_invalid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"message":"Malformed input request: cfg_scale"}"#),
            )
            .mount(&server)
            .await;

        let err = runtime(&server)
            .invoke_model(MODEL, b"{}".to_vec())
            .await
            .unwrap_err();
        match err {
            SdxlError::InvalidRequest(msg) => assert_eq!(msg, "Malformed input request: cfg_scale"),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let err = runtime(&server)
            .invoke_model(MODEL, b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, SdxlError::Api { status: 503, .. }));
    }
}
