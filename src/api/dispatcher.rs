//! Request dispatcher.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::TransportOptions;
use crate::error::{Result, TetheredError};
use crate::hooks::{tags, HookRegistry};

/// HTTP methods the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    /// Payload goes in the query string rather than the body.
    fn sends_query(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Outcome of one API call.
///
/// After a call either `status` is set (the server answered) or `error` is
/// set and `data` is absent (nothing usable came back). `success` is true for
/// any status below 400.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Decoded JSON body, absent when the body was empty or not JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestResult {
    /// Classify a server answer.
    pub fn from_response(status: u16, body: &str) -> Self {
        let data = if body.is_empty() {
            None
        } else {
            match serde_json::from_str(body) {
                Ok(data) => Some(data),
                Err(err) => {
                    debug!(status, error = %err, "Response body is not JSON");
                    None
                }
            }
        };

        Self {
            success: status < 400,
            status: Some(status),
            data,
            error: None,
        }
    }

    /// A call that produced no server answer.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            status: None,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// What is about to be sent, as seen by `request` listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestInfo {
    /// Full target URL, query string included
    pub url: String,
    /// Endpoint path relative to the versioned API root
    pub endpoint: String,
    pub payload: Option<Value>,
}

/// Issues calls against the API on behalf of a client.
///
/// A connection is set up for each call and released when the call returns,
/// whatever its outcome.
pub struct Dispatcher<'a> {
    transport: &'a TransportOptions,
    hooks: &'a HookRegistry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(transport: &'a TransportOptions, hooks: &'a HookRegistry) -> Self {
        Self { transport, hooks }
    }

    pub fn get(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.request(endpoint, data, Method::Get)
    }

    pub fn post(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.request(endpoint, data, Method::Post)
    }

    pub fn delete(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.request(endpoint, data, Method::Delete)
    }

    /// Call `endpoint` and classify the outcome.
    ///
    /// GET and DELETE send `data` as a query string, POST sends it as a JSON
    /// body. The outgoing request passes through the `request.curlhandle`
    /// modifiers, `request` fires just before sending and `request.complete`
    /// fires with the result.
    pub fn request(&self, endpoint: &str, data: Option<Value>, method: Method) -> RequestResult {
        let endpoint = endpoint.trim();

        let result = if endpoint.is_empty() {
            RequestResult::failed(TetheredError::invalid_request("Endpoint is empty"))
        } else {
            self.send(endpoint, data, method).unwrap_or_else(|err| {
                warn!(%method, endpoint, error = %err, "Request failed");
                RequestResult::failed(err)
            })
        };

        self.hooks.trigger(tags::REQUEST_COMPLETE, &result);
        result
    }

    fn send(&self, endpoint: &str, data: Option<Value>, method: Method) -> Result<RequestResult> {
        let data = data.filter(|value| !value.is_null());
        let url = self.endpoint_url(endpoint, data.as_ref(), method)?;

        let mut client = Client::builder()
            .timeout(Duration::from_secs(self.transport.timeout_secs))
            .user_agent(self.transport.user_agent.as_str());
        if !self.transport.system_proxy {
            client = client.no_proxy();
        }
        let client = client.build()?;

        let mut builder = client.request(method.into(), url.clone());
        if !method.sends_query() {
            if let Some(payload) = &data {
                builder = builder.json(payload);
            }
        }
        let builder = panic::catch_unwind(AssertUnwindSafe(|| {
            self.hooks.apply_modifiers(tags::REQUEST_HANDLE, builder)
        }))
        .map_err(|_| TetheredError::invalid_request("request handle modifier failed"))?;

        self.hooks.trigger(
            tags::REQUEST,
            &RequestInfo {
                url: url.to_string(),
                endpoint: endpoint.to_string(),
                payload: data,
            },
        );

        debug!(%method, %url, "Sending request");
        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_else(|err| {
            debug!(status, error = %err, "Failed to read response body");
            String::new()
        });

        Ok(RequestResult::from_response(status, &body))
    }

    fn endpoint_url(&self, endpoint: &str, data: Option<&Value>, method: Method) -> Result<Url> {
        let base = self.transport.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/v{}/{endpoint}", crate::API_VERSION))?;

        if method.sends_query() {
            if let Some(data) = data {
                append_query(&mut url, data);
            }
        }

        Ok(url)
    }
}

/// Encode a payload onto the URL the way form-style query strings expect:
/// booleans as `1`/`0`, nulls dropped, nested values as JSON.
fn append_query(url: &mut Url, data: &Value) {
    match data {
        Value::Null => {}
        Value::Object(fields) => {
            if fields.is_empty() {
                return;
            }
            let mut pairs = url.query_pairs_mut();
            for (key, value) in fields {
                let encoded = match value {
                    Value::Null => continue,
                    Value::String(text) => text.clone(),
                    Value::Bool(flag) => (if *flag { "1" } else { "0" }).to_string(),
                    other => other.to_string(),
                };
                pairs.append_pair(key, &encoded);
            }
        }
        Value::String(raw) if raw.is_empty() => {}
        Value::String(raw) => url.set_query(Some(raw)),
        other => url.set_query(Some(&other.to_string())),
    }
}
