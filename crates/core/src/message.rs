//! Request and response model passed between the host, the proxy, the
//! network and the cache store.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// How the client issued a request.
///
/// Only [`RequestMode::Navigate`] changes proxy behaviour; the others are
/// carried so pass-through requests reach the network as issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// A request issued by a client context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl ProxyRequest {
    /// Build a request, upper-casing the method and dropping the URL fragment.
    pub fn new(method: &str, mut url: Url, mode: RequestMode) -> Self {
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url, mode, headers: Vec::new() }
    }

    /// Sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::NoCors)
    }

    /// Top-level document GET.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A response, either fetched, cached, or synthesized.
///
/// Cloning is cheap: the body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// URL the response was fetched from, if any.
    pub url: Option<String>,
}

impl ProxyResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
            url: None,
        }
    }

    /// Synthetic `503 Service Unavailable` plain-text response.
    pub fn placeholder(text: &str) -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::copy_from_slice(text.as_bytes()),
            url: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in the 200..=299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Which resolution path produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Fetched from the network origin by the proxy.
    Network,
    /// Served from the generation's store.
    Cache,
    /// Cached fallback document served for a failed navigation.
    Fallback,
    /// Synthesized offline/error response.
    Placeholder,
    /// Not intercepted; forwarded to the network untouched.
    Passthrough,
    /// No active worker controls the client.
    Uncontrolled,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Placeholder => "placeholder",
            ResponseSource::Passthrough => "passthrough",
            ResponseSource::Uncontrolled => "uncontrolled",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_normalizes_method_and_fragment() {
        let url = Url::parse("https://Example.com/admin/index.html#top").unwrap();
        let req = ProxyRequest::new("get", url, RequestMode::Navigate);
        assert_eq!(req.method, "GET");
        assert_eq!(req.url.as_str(), "https://example.com/admin/index.html");
        assert!(req.is_get());
        assert!(req.is_navigation());
    }

    #[test]
    fn test_request_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("no-cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("document".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_response_ok_range() {
        assert!(ProxyResponse::new(200, "a").ok());
        assert!(ProxyResponse::new(204, "").ok());
        assert!(!ProxyResponse::new(304, "").ok());
        assert!(!ProxyResponse::new(404, "").ok());
    }

    #[test]
    fn test_placeholder_is_not_ok() {
        let resp = ProxyResponse::placeholder("Offline");
        assert!(!resp.ok());
        assert_eq!(resp.text(), "Offline");
        assert_eq!(resp.content_type(), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = ProxyResponse::new(200, "").with_header("Content-Type", "text/html");
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_response_source_serializes_snake_case() {
        let json = serde_json::to_string(&ResponseSource::Passthrough).unwrap();
        assert_eq!(json, "\"passthrough\"");
    }
}
