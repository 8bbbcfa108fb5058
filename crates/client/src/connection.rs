//! HTTP connection to the storefront backend.
//!
//! Holds two reqwest clients: one with the request timeout for ordinary
//! calls, and one without it for long-lived event streams, since reqwest
//! applies the timeout to the whole body read.

use core::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::api::ErrorBody;
use crate::errors::RemoteError;

#[derive(Debug, Clone, Copy)]
enum RequestType {
    Get,
    Post,
}

#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    pub api_url: Url,
    client: Client,
    stream_client: Client,
    bearer: Option<String>,
}

impl ConnectionInfo {
    pub fn new(api_url: Url, timeout: Duration) -> Result<Self, RemoteError> {
        if api_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidBaseUrl(api_url));
        }

        let client = Client::builder().timeout(timeout).build()?;
        let stream_client = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            api_url,
            client,
            stream_client,
            bearer: None,
        })
    }

    /// Attaches a bearer token to every request. Storing and refreshing the
    /// token is the embedding application's job.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Builds `api_url/segment/segment/...`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.api_url.clone();

        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidBaseUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        self.request(RequestType::Get, url, None::<&()>).await
    }

    /// Posts `body` and decodes the answer, treating an empty body as
    /// `O::default()`.
    pub async fn post_or_default<I, O>(&self, url: Url, body: Option<&I>) -> Result<O, RemoteError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned + Default,
    {
        let response = self.send(RequestType::Post, url, body).await?;
        let bytes = response.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(O::default());
        }

        serde_json::from_slice(&bytes).map_err(Into::into)
    }

    /// Posts `body` and discards whatever the backend answers.
    pub async fn post_ignored<I>(&self, url: Url, body: Option<&I>) -> Result<(), RemoteError>
    where
        I: Serialize + Sync,
    {
        let _response = self.send(RequestType::Post, url, body).await?;
        Ok(())
    }

    /// Opens a `text/event-stream` response.
    pub async fn open_stream(&self, url: Url) -> Result<Response, RemoteError> {
        debug!(%url, "Opening event stream");

        let builder = self
            .stream_client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        check_status(self.authorize(builder).send().await?).await
    }

    async fn request<I, O>(
        &self,
        req_type: RequestType,
        url: Url,
        body: Option<&I>,
    ) -> Result<O, RemoteError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let response = self.send(req_type, url, body).await?;
        let bytes = response.bytes().await?;

        serde_json::from_slice(&bytes).map_err(Into::into)
    }

    async fn send<I>(
        &self,
        req_type: RequestType,
        url: Url,
        body: Option<&I>,
    ) -> Result<Response, RemoteError>
    where
        I: Serialize + Sync,
    {
        debug!(?req_type, %url, "Sending request");

        let mut builder = match req_type {
            RequestType::Get => self.client.get(url),
            RequestType::Post => self.client.post(url),
        };

        if let Some(body) = body {
            builder = builder.json(body);
        }

        check_status(self.authorize(builder).send().await?).await
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let reason = response
        .bytes()
        .await
        .ok()
        .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
        .and_then(|body| body.message);

    Err(RemoteError::rejected(status.as_u16(), reason))
}
