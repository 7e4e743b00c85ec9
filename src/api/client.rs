//! REST API client
//!
//! Thin wrapper over `reqwest` that resolves paths against the instance
//! base URL, attaches the bearer token, collects `Link` pagination metadata
//! and turns non-2xx answers into errors.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::dto::Validate;
use super::link::LinkHeader;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Longest error body kept in `ClientError::Status`
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client bound to one instance
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl ApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(Duration::from_secs(config.http.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Internal(e.into()))?;

        Ok(Self::with_http_client(
            http,
            config.base_url()?,
            config.instance.token().map(str::to_string),
        ))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, base_url: Url, access_token: Option<String>) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether requests will carry credentials
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Resolve a path (or an absolute URL, used verbatim) and append query pairs
    pub fn url_for(&self, path_or_url: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path_or_url)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GET a path or absolute URL
    pub async fn get(&self, path_or_url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        let url = self.url_for(path_or_url, query)?;
        let request = self.authorize(self.http.get(url.clone()), &url);
        self.send("GET", request, url).await
    }

    /// PATCH a JSON body
    pub async fn patch_json<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path, &[])?;
        let request = self.authorize(self.http.patch(url.clone()).json(body), &url);
        self.send("PATCH", request, url).await
    }

    /// Attach the bearer token, but only for the configured instance.
    ///
    /// Pagination links are opaque and may point at another origin.
    fn authorize(&self, request: reqwest::RequestBuilder, url: &Url) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) if url.origin() == self.base_url.origin() => request.bearer_auth(token),
            Some(_) => {
                tracing::debug!(url = %url, "Not sending credentials to foreign origin");
                request
            }
            None => request,
        }
    }

    async fn send(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
        url: Url,
    ) -> Result<ApiResponse> {
        let response = request.send().await?;
        let status = response.status();

        let links = LinkHeader::from_values(
            response
                .headers()
                .get_all(http::header::LINK)
                .iter()
                .filter_map(|value| value.to_str().ok()),
            &url,
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                method,
                url = %url,
                status = status.as_u16(),
                "API request rejected"
            );
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            method,
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            has_next = links.next().is_some(),
            "API request completed"
        );

        Ok(ApiResponse {
            url,
            status: status.as_u16(),
            links,
            body,
        })
    }
}

/// Successful API response with its pagination metadata
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: Url,
    status: u16,
    links: LinkHeader,
    body: Vec<u8>,
}

impl ApiResponse {
    /// URL that produced this response
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn links(&self) -> &LinkHeader {
        &self.links
    }

    /// `rel="next"` link, if the server advertised one
    pub fn next(&self) -> Option<&Url> {
        self.links.next()
    }

    /// Decode and validate the body against an explicit schema
    pub fn json<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Validate,
    {
        let value: T = serde_json::from_slice(&self.body)?;
        value.validate()?;
        Ok(value)
    }
}
