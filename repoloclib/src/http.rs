//! Blocking HTTP transport used by discovery and archive downloads.
//!
//! Providers talk to the network only through the [`HttpClient`] trait, so
//! pagination and acquisition logic can be driven by scripted responses.

use std::io::{Read, Write};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use thiserror::Error;

pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Archive downloads of large repositories take far longer than an API page.
pub(crate) const HTTP_DOWNLOAD_TIMEOUT_SECS: u64 = 30 * 60;
/// Upper bound for a single API response body.
pub(crate) const MAX_API_BODY_SIZE: u64 = 32 * 1024 * 1024;

const USER_AGENT: &str = concat!("repoloc/", env!("CARGO_PKG_VERSION"));

/// Transport-level failure (DNS, TLS, connection reset, timeout, oversized body).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// How a request authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: Basic base64(user:password)`
    Basic { user: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer(***)"),
            Auth::Basic { user, .. } => write!(f, "Basic({}:***)", user),
        }
    }
}

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub auth: Auth,
    pub accept: Option<&'static str>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, auth: Auth) -> Self {
        Self {
            url: url.into(),
            auth,
            accept: None,
        }
    }

    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }
}

/// A fully received response.
///
/// Responses returned by [`HttpClient::download`] carry an empty `body`; the
/// payload went to the caller's writer instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A response with a JSON content type.
    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, body).with_header("Content-Type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking GET transport.
pub trait HttpClient {
    /// Perform a request and buffer the whole body.
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Perform a request and stream the body into `sink` when the status is 200.
    /// For any other status nothing is written.
    fn download(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production client over `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client with connect and request timeouts.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn prepare(&self, request: &HttpRequest) -> RequestBuilder {
        let mut builder = self.client.get(&request.url);
        builder = match &request.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic { user, password } => builder.basic_auth(user, Some(password)),
        };
        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        builder
    }
}

fn collect_headers(response: &reqwest::blocking::Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Transport errors from reqwest mention the URL, which may embed credentials.
fn describe(error: reqwest::Error) -> TransportError {
    TransportError(error.without_url().to_string())
}

impl HttpClient for ReqwestClient {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.prepare(request).send().map_err(describe)?;
        let status = response.status().as_u16();
        let headers = collect_headers(&response);

        if let Some(length) = response.content_length() {
            if length > MAX_API_BODY_SIZE {
                return Err(TransportError(format!(
                    "response of {length} bytes exceeds maximum of {MAX_API_BODY_SIZE} bytes"
                )));
            }
        }

        let mut body = Vec::new();
        response
            .take(MAX_API_BODY_SIZE + 1)
            .read_to_end(&mut body)
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        if body.len() as u64 > MAX_API_BODY_SIZE {
            return Err(TransportError(format!(
                "response body exceeds maximum of {MAX_API_BODY_SIZE} bytes"
            )));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn download(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, TransportError> {
        let mut response = self
            .prepare(request)
            .timeout(Duration::from_secs(HTTP_DOWNLOAD_TIMEOUT_SECS))
            .send()
            .map_err(describe)?;
        let status = response.status().as_u16();
        let headers = collect_headers(&response);

        if status == 200 {
            std::io::copy(&mut response, sink)
                .map_err(|e| TransportError(format!("failed to stream download: {e}")))?;
        }

        Ok(HttpResponse {
            status,
            headers,
            body: Vec::new(),
        })
    }
}
