//! HTTP transport for the management API.
//!
//! One blocking client per invocation. Every request carries Basic auth,
//! a single timeout covers the whole exchange, and nothing is retried.

use crate::catalog::Method;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::request::Request;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Certificate, Identity};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A 2xx answer from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Full URL the request went to.
    pub url: String,
    pub body: String,
}

impl Response {
    /// Parse the body as JSON. Empty bodies (201/204) yield `None`.
    pub fn json(&self) -> Result<Option<Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| Error::InvalidResponse {
                url: self.url.clone(),
                message: e.to_string(),
            })
    }
}

/// Blocking client bound to one resolved config.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    api_root: String,
    authorization: String,
    timeout: u64,
}

impl Transport {
    /// Build the client, loading any TLS material the config names.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent(concat!("rmqadmin/", env!("CARGO_PKG_VERSION")));

        if config.ssl {
            if config.ssl_disable_hostname_verification {
                log::debug!("TLS hostname verification disabled");
                builder = builder.danger_accept_invalid_hostnames(true);
            }
            if config.ssl_insecure {
                log::debug!("TLS certificate verification disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
            if let Some(ca) = &config.ssl_ca_cert_file {
                builder = builder.add_root_certificate(load_ca_bundle(ca)?);
            }
            if let Some(identity) =
                load_identity(config.ssl_cert_file.as_deref(), config.ssl_key_file.as_deref())?
            {
                builder = builder.identity(identity);
            }
        }

        let client = builder.build().map_err(|e| Error::Transport {
            url: config.api_root(),
            message: error_chain(&e),
        })?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            authorization: basic_auth_header(&config.username, &config.password),
            timeout: config.request_timeout,
        })
    }

    /// Full URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        url_for(&self.api_root, path)
    }

    /// Send one request and classify the answer.
    pub fn send(&self, request: &Request) -> Result<Response> {
        let url = self.url_for(&request.path);
        log::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(http_method(request.method), &url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, &self.authorization);
        if let Some(body) = request.body.as_ref().filter(|b| !b.is_empty()) {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.clone());
        }

        let response = builder.send().map_err(|e| self.classify(&url, &e))?;
        let status = response.status();
        let body = response.text().map_err(|e| self.classify(&url, &e))?;
        log::debug!("{} {} -> {}", request.method, request.path, status.as_u16());

        if status.is_success() {
            Ok(Response {
                status: status.as_u16(),
                url,
                body,
            })
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                method: request.method.to_string(),
                path: request.path.clone(),
                message: api_error_message(&body, status.canonical_reason()),
            })
        }
    }

    fn classify(&self, url: &str, err: &reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                seconds: self.timeout,
            }
        } else {
            Error::Transport {
                url: url.to_string(),
                message: error_chain(err),
            }
        }
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// `Authorization` header value for HTTP Basic auth.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Join an API root and a request path.
pub fn url_for(api_root: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{api_root}{path}")
    } else {
        format!("{api_root}/{path}")
    }
}

/// Message for a non-2xx answer.
///
/// The broker answers errors with `{"error": ..., "reason": ...}`. When the
/// body is not such an object the raw body is used, and an empty body falls
/// back to the status text.
pub fn api_error_message(body: &str, status_text: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let text = |key: &str| match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_) | Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        match (text("error"), text("reason")) {
            (Some(error), Some(reason)) if error != reason => {
                return format!("{error}: {reason}");
            }
            (Some(message), _) | (None, Some(message)) => return message,
            (None, None) => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status_text.unwrap_or("request failed").to_string()
    } else {
        body.to_string()
    }
}

fn load_ca_bundle(path: &Path) -> Result<Certificate> {
    let pem = fs::read(path).map_err(|e| Error::tls(path, e))?;
    Certificate::from_pem(&pem).map_err(|e| Error::tls(path, error_chain(&e)))
}

/// Client identity from a PEM certificate and an optional separate key file.
fn load_identity(cert: Option<&Path>, key: Option<&Path>) -> Result<Option<Identity>> {
    let Some(cert) = cert else {
        if let Some(key) = key {
            return Err(Error::tls(key, "a client key needs --ssl-cert-file as well"));
        }
        return Ok(None);
    };

    let mut pem = fs::read(cert).map_err(|e| Error::tls(cert, e))?;
    if let Some(key) = key {
        let key_pem = fs::read(key).map_err(|e| Error::tls(key, e))?;
        pem.push(b'\n');
        pem.extend_from_slice(&key_pem);
    }
    Identity::from_pem(&pem)
        .map(Some)
        .map_err(|e| Error::tls(key.unwrap_or(cert), error_chain(&e)))
}

/// Error text including every source, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
