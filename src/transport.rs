//! HTTP transport seam.
//!
//! The rest of the crate talks to the MoltArena API through the [`Transport`]
//! trait; [`HttpTransport`] is the blocking `ureq` implementation. The
//! dividing line matches the retry policy: a delivered response (any HTTP
//! status, parseable body or not) is a success here, and only
//! connection-level failures (timeout, DNS, reset) become [`TransportError`].

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One HTTP call to make against the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn with_bearer(mut self, api_key: &str) -> Self {
        self.bearer = Some(api_key.to_string());
        self
    }
}

/// A delivered response. `body` is `Value::Null` when the payload was not
/// valid JSON; consumers treat that as "no payload".
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Connection-level failure: the request never produced a response.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: String,
    pub message: String,
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Blocking `ureq` transport bound to one API base URL.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut call = match request.method {
            Method::Get => self.agent.get(&url),
            Method::Post => self.agent.post(&url),
        };
        if let Some(key) = &request.bearer {
            call = call.set("Authorization", &format!("Bearer {key}"));
        }

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        match result {
            Ok(response) => Ok(into_api_response(response)),
            // ureq reports 4xx/5xx as errors, but the response was delivered;
            // status interpretation belongs to the caller, not the retry loop.
            Err(ureq::Error::Status(_, response)) => Ok(into_api_response(response)),
            Err(ureq::Error::Transport(transport)) => Err(TransportError {
                kind: format!("{:?}", transport.kind()),
                message: transport.to_string(),
            }),
        }
    }
}

fn into_api_response(response: ureq::Response) -> ApiResponse {
    let status = response.status();
    let body = response.into_json().unwrap_or(Value::Null);
    ApiResponse { status, body }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: pops one outcome per call and records every
    /// request it sees.
    #[derive(Default)]
    pub struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        outcomes: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    }

    impl MockTransport {
        pub fn scripted(
            outcomes: Vec<Result<ApiResponse, TransportError>>,
        ) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                outcomes: Mutex::new(outcomes.into()),
            }
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(TransportError {
                    kind: "MockExhausted".to_string(),
                    message: "script ran out of responses".to_string(),
                })
            })
        }
    }

    pub fn ok(status: u16, body: Value) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse { status, body })
    }

    pub fn conn_refused() -> Result<ApiResponse, TransportError> {
        Err(TransportError {
            kind: "ConnectionFailed".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builders_set_method_and_auth() {
        let get = ApiRequest::get("/agents/me").with_bearer("k-123");
        assert_eq!(get.method, Method::Get);
        assert_eq!(get.path, "/agents/me");
        assert_eq!(get.bearer.as_deref(), Some("k-123"));
        assert!(get.body.is_none());

        let post = ApiRequest::post("/battles", json!({"rounds": 5}));
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.body, Some(json!({"rounds": 5})));
    }

    #[test]
    fn delivered_responses_parse_json_bodies() {
        let raw = ureq::Response::new(200, "OK", r#"{"success": true}"#).unwrap();
        let api = into_api_response(raw);
        assert_eq!(api.status, 200);
        assert_eq!(api.body["success"], json!(true));
    }

    #[test]
    fn unparseable_bodies_become_null_not_errors() {
        let raw = ureq::Response::new(502, "Bad Gateway", "<html>upstream</html>").unwrap();
        let api = into_api_response(raw);
        assert_eq!(api.status, 502);
        assert!(api.body.is_null());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let transport = HttpTransport::new(
            "https://moltarena.example/api/",
            Duration::from_secs(5),
        );
        assert_eq!(transport.base_url, "https://moltarena.example/api");
    }
}
