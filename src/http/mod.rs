//! HTTP collaborator used to query the sensor endpoint.
//!
//! The accessory only depends on the [`HttpClient`] trait, so the transport
//! can be swapped out (tests use an in-memory fake, the binary uses
//! [`ReqwestClient`]).

mod client;

pub use client::{DEFAULT_REQUEST_TIMEOUT, ReqwestClient};

use crate::error::{Result, SensorError};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// `getUrl` as it appears in the accessory configuration.
///
/// Either a plain URL string or an object carrying request details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlProperty {
    Plain(String),
    Detailed(UrlObject),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlObject {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// A validated request description.
#[derive(Debug, Clone)]
pub struct UrlSpec {
    pub url: Url,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl UrlSpec {
    /// Simple GET request for the given URL.
    pub fn get(url: &str) -> Result<Self> {
        Ok(Self {
            url: parse_url(url)?,
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        })
    }
}

impl TryFrom<&UrlProperty> for UrlSpec {
    type Error = SensorError;

    fn try_from(property: &UrlProperty) -> Result<Self> {
        match property {
            UrlProperty::Plain(url) => UrlSpec::get(url),
            UrlProperty::Detailed(object) => {
                let method = match &object.method {
                    Some(m) => Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|_| {
                        SensorError::Configuration(format!("Unsupported http method: {}", m))
                    })?,
                    None => Method::GET,
                };

                Ok(Self {
                    url: parse_url(&object.url)?,
                    method,
                    headers: object.headers.clone(),
                    body: object.body.clone(),
                    timeout: object.timeout.map(Duration::from_millis),
                })
            }
        }
    }
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| SensorError::Configuration(format!("Invalid url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SensorError::Configuration(format!(
            "URL must use http or https, got: {}",
            other
        ))),
    }
}

/// Response of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Returns true for 2xx status codes.
pub fn is_http_success_code(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Transport used by the accessory to query the sensor.
///
/// Implementations report network level failures as
/// [`SensorError::Transport`]; any received response (whatever its status)
/// is returned as `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, spec: &UrlSpec) -> Result<HttpResponse>;
}
