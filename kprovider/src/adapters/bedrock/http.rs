//! reqwest-based Bedrock Runtime transport using bearer-token authentication.

use futures_util::StreamExt;
use reqwest::{Client, Response, Url};

use crate::{ProviderError, ProviderFuture, SecretString};

use super::errors::classify_status;
use super::event_stream::decode_event_stream;
use super::transport::{BedrockTransport, ConverseEventStream};
use super::types::{ConverseRequest, ConverseResponse};

const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

#[derive(Debug, Clone)]
pub struct BedrockHttpTransport {
    client: Client,
    region: String,
    endpoint_url: Option<String>,
    token: SecretString,
}

impl BedrockHttpTransport {
    pub fn new(client: Client, region: impl Into<String>, token: impl Into<SecretString>) -> Self {
        Self {
            client,
            region: region.into(),
            endpoint_url: None,
            token: token.into(),
        }
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn base_url(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }

    /// `{base}/model/{modelId}/{operation}` with the model id percent-encoded as one segment.
    pub fn operation_url(&self, model_id: &str, operation: &str) -> Result<Url, ProviderError> {
        let base = self.base_url();
        let mut url = Url::parse(&base).map_err(|err| {
            ProviderError::invalid_request(format!("invalid Bedrock endpoint {base}: {err}"))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::invalid_request(format!("Bedrock endpoint cannot be a base: {base}"))
            })?
            .pop_if_empty()
            .extend(["model", model_id, operation]);

        Ok(url)
    }

    async fn send(
        &self,
        request: &ConverseRequest,
        operation: &str,
        accept: &str,
    ) -> Result<Response, ProviderError> {
        let url = self.operation_url(&request.model_id, operation)?;
        let body = request.to_body()?;

        tracing::debug!(model_id = %request.model_id, operation, "sending Bedrock request");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, accept)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(status.as_u16(), &body)
    }
}

impl BedrockTransport for BedrockHttpTransport {
    fn converse<'a>(
        &'a self,
        request: ConverseRequest,
    ) -> ProviderFuture<'a, Result<ConverseResponse, ProviderError>> {
        Box::pin(async move {
            let response = self.send(&request, "converse", "application/json").await?;

            response
                .json::<ConverseResponse>()
                .await
                .map_err(|err| ProviderError::provider_response(err.to_string()))
        })
    }

    fn converse_stream<'a>(
        &'a self,
        request: ConverseRequest,
    ) -> ProviderFuture<'a, Result<ConverseEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let response = self
                .send(&request, "converse-stream", EVENT_STREAM_CONTENT_TYPE)
                .await?;

            let chunks = response.bytes_stream().map(|chunk| {
                chunk.map_err(|err| {
                    if err.is_timeout() {
                        ProviderError::timeout(err.to_string())
                    } else {
                        ProviderError::transport(err.to_string())
                    }
                })
            });

            Ok(Box::pin(decode_event_stream(chunks)) as ConverseEventStream<'a>)
        })
    }
}
