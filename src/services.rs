//! Outgoing request plumbing shared by both connectors: a thin request
//! description, a builder, and the single send path over reqwest.
//!
//! Each gateway operation is one blocking round trip from the caller's point
//! of view. No retries; a failed call surfaces as a [`GatewayError`] and the
//! caller decides whether to run the whole flow again. Timeouts are not
//! enforced locally (a "timeout" additional-config field is forwarded to the
//! gateway as a hint only).

use std::time::Instant;

use bytes::Bytes;
use error_stack::{report, ResultExt};

use crate::errors::{CustomResult, GatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Body of an outgoing request. Connectors pre-serialize their payloads, so
/// the transport only ever sees finished text. DPS speaks XML on both API
/// styles, so that is the only body shape this wire carries.
#[derive(Clone)]
pub enum RequestContent {
    /// An XML document, sent as `text/xml`.
    Xml(String),
}

impl std::fmt::Debug for RequestContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Xml(_) => "XmlRequestBody",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestContent>,
}

impl Request {
    /// One-line description of the outgoing call for error diagnostics.
    /// Bodies are included as-is, so callers must mask credentials before
    /// building the request body they want diagnosed.
    pub fn diagnostic_string(&self) -> String {
        let body = match &self.body {
            Some(RequestContent::Xml(xml)) => xml.clone(),
            None => String::new(),
        };
        format!("{} {} {}", self.method, self.url, body)
    }
}

#[derive(Debug, Default)]
pub struct RequestBuilder {
    url: String,
    method: Option<Method>,
    headers: Vec<(String, String)>,
    body: Option<RequestContent>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, header: &str, value: &str) -> Self {
        self.headers.push((header.to_string(), value.to_string()));
        self
    }

    pub fn set_body(mut self, body: RequestContent) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request {
        Request {
            url: self.url,
            method: self.method.unwrap_or(Method::Get),
            headers: self.headers,
            body: self.body,
        }
    }
}

/// A completed gateway reply: HTTP status plus the raw body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub body: Bytes,
}

impl Response {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and reads the full reply. Network failures map onto the
/// [`GatewayError`] taxonomy; any HTTP status is returned to the caller,
/// since DPS signals outcomes in the body rather than the status line.
pub async fn call_gateway(
    client: &reqwest::Client,
    request: Request,
) -> CustomResult<Response, GatewayError> {
    let url = reqwest::Url::parse(&request.url).map_err(|error| {
        report!(GatewayError::RequestNotSent {
            reason: format!("invalid gateway url: {error}"),
        })
    })?;

    let start = Instant::now();

    let mut builder = match request.method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
    };
    for (header, value) in &request.headers {
        builder = builder.header(header, value);
    }
    builder = match request.body {
        Some(RequestContent::Xml(body)) => builder
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body),
        None => builder,
    };

    let response = builder.send().await.map_err(|error| {
        if error.is_timeout() {
            report!(GatewayError::Timeout)
        } else {
            report!(GatewayError::RequestNotSent {
                reason: error.to_string(),
            })
        }
    })?;

    let status_code = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .change_context(GatewayError::ResponseReadFailed)?;

    tracing::info!(
        latency_ms = start.elapsed().as_millis() as u64,
        status_code,
        "outgoing gateway call completed"
    );

    Ok(Response { status_code, body })
}
