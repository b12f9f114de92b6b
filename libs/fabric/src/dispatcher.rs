use std::sync::Arc;

use courier_core::outcome::UNEXPECTED_ERROR;
use courier_core::{Outcome, ServiceTarget};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::codec::{Codec, JsonCodec};
use crate::config::ClientConfig;
use crate::decoder::ResultDecoder;
use crate::error::Result;
use crate::request::{Method, Request, SERVICE_KEY_HEADER};
use crate::transport::{HttpTransport, Transport};

/// Single-shot request/response client for `service/action` endpoints
///
/// Combines a shared transport handle and a codec. Every call returns an
/// [`Outcome`]; transport and encoding failures become
/// [`Outcome::TransportError`] instead of errors. Calls take `&self` and may
/// run concurrently. Nothing is retried or cached.
pub struct Dispatcher<C> {
    base_url: String,
    transport: Arc<dyn Transport>,
    decoder: ResultDecoder<C>,
}

impl<C: Clone> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
            decoder: self.decoder.clone(),
        }
    }
}

impl Dispatcher<JsonCodec> {
    /// Create a JSON-over-HTTP dispatcher from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(base_url, Arc::new(transport), JsonCodec))
    }
}

impl<C: Codec> Dispatcher<C> {
    /// Create a dispatcher from an existing transport
    ///
    /// Trailing slashes on `base_url` are dropped.
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>, codec: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            decoder: ResultDecoder::new(codec),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encode `body` and `POST` it to `{base}/{service}/{action}`
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(method = "POST", service = %target.service(), action = %target.action())
    )]
    pub async fn post<B, R>(&self, target: &ServiceTarget, body: &B) -> Outcome<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let codec = self.decoder.codec();
        let bytes = match codec.encode(body) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to encode request body");
                return Outcome::transport_error([UNEXPECTED_ERROR.to_string(), err.to_string()]);
            }
        };

        let request = self
            .request(Method::Post, target)
            .header("content-type", codec.content_type())
            .body(bytes);
        self.dispatch(request).await
    }

    /// `GET` `{base}/{service}/{action}` with optional query parameters
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(method = "GET", service = %target.service(), action = %target.action())
    )]
    pub async fn get<R, I, K, V>(&self, target: &ServiceTarget, query: I) -> Outcome<R>
    where
        R: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.request(Method::Get, target).query(query);
        self.dispatch(request).await
    }

    fn request(&self, method: Method, target: &ServiceTarget) -> Request {
        let request = Request::new(method, target.url(&self.base_url))
            .header("accept", self.decoder.codec().content_type());
        match target.service_key() {
            Some(key) => request.header(SERVICE_KEY_HEADER, key),
            None => request,
        }
    }

    async fn dispatch<R: DeserializeOwned>(&self, request: Request) -> Outcome<R> {
        debug!(url = %request.url, "sending request");
        match self.transport.send(request).await {
            Ok(response) => {
                let outcome = self.decoder.decode(&response);
                debug!(status = response.status, outcome = %outcome.kind(), "response decoded");
                outcome
            }
            Err(err) => {
                warn!(error = %err, "transport failure");
                Outcome::transport_error([UNEXPECTED_ERROR.to_string(), err.to_string()])
            }
        }
    }
}
