//! ResolvedOperation → HTTP request dispatch
//!
//! Builds a blocking reqwest request from a resolved operation, sends it,
//! and runs the operation's bound response parser on the body text.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;

use crate::error::DispatchError;
use crate::resolve::ResolvedOperation;

/// Basic-auth credentials passed through to the transport as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Send a resolved operation and parse the response.
pub fn dispatch(
    client: &Client,
    base_url: &str,
    credentials: Option<&Credentials>,
    op: &ResolvedOperation,
) -> Result<Value, DispatchError> {
    let req = build_request(client, base_url, credentials, op)?;
    let text = send_request(req)?;

    match op.response.parser {
        Some(parse) => parse(&text).map_err(DispatchError::Parse),
        None => Ok(Value::String(text)),
    }
}

/// Build the HTTP request for a resolved operation without sending it.
pub fn build_request(
    client: &Client,
    base_url: &str,
    credentials: Option<&Credentials>,
    op: &ResolvedOperation,
) -> Result<RequestBuilder, DispatchError> {
    let request = &op.request;
    let method: Method = request
        .method
        .to_uppercase()
        .parse()
        .map_err(|_| DispatchError::UnsupportedMethod {
            method: request.method.clone(),
        })?;
    let url = build_url(base_url, &request.location);

    tracing::debug!(
        operation = %op.name,
        %method,
        %url,
        params = ?request.params,
        "dispatching request"
    );

    let mut req = client.request(method, &url);

    if let Some(credentials) = credentials {
        req = req.basic_auth(&credentials.username, Some(&credentials.password));
    }
    if !request.params.is_empty() {
        req = req.query(&request.params);
    }
    if let Some(body) = &request.body {
        req = req
            .header(CONTENT_TYPE, body.content_type.as_str())
            .body(body.value.clone());
    }

    Ok(req)
}

fn build_url(base_url: &str, location: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        location.trim_start_matches('/')
    )
}

fn send_request(req: RequestBuilder) -> Result<String, DispatchError> {
    let resp = req.send().map_err(DispatchError::RequestFailed)?;
    let status = resp.status();
    let text = resp.text().map_err(DispatchError::ResponseRead)?;

    tracing::debug!(%status, bytes = text.len(), "response received");

    if !status.is_success() {
        return Err(DispatchError::HttpError { status, body: text });
    }
    Ok(text)
}
