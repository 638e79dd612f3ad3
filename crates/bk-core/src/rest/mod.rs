//! HTTP transport to the registry.

mod endpoint;
mod wire;

use std::rc::Rc;
use std::time::Duration;

use ciborium::Value;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::api::{Call, Operation, RemoteApi, Reply, Session};
use crate::config::Config;
use crate::error::{ApiError, ErrorKind};
use crate::io::UserIo;
use crate::net;

use endpoint::{build_url, endpoint, url_params, AuthMode, Method};
use wire::{MessageLevel, ServerMessage, CBOR_CONTENT_TYPE};

const API_VERSION: &str = "v1";
/// Server-info probes must not hold up a command.
pub const SERVER_INFO_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) const ANONYMOUS_ID_HEADER: &str = "X-Client-Anonymous-Id";
pub(crate) const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Executes [`Call`]s against `<server>/v1`.
pub struct RestClient {
    base: String,
    http: Client,
    token: Option<String>,
    fingerprint: String,
    user: Option<String>,
    io: Rc<dyn UserIo>,
}

enum Payload {
    Cbor(Value),
    Text(String),
}

impl Payload {
    fn describe(&self) -> String {
        match self {
            Self::Cbor(value) => wire::describe(value),
            Self::Text(text) => text.trim().to_string(),
        }
    }
}

impl RestClient {
    pub fn new(config: &Config, io: Rc<dyn UserIo>) -> Result<Self, ApiError> {
        let http = net::build_http_client(config.network())?;
        Ok(Self::with_client(config.server_url(), http, io))
    }

    pub fn with_client(server: &Url, http: Client, io: Rc<dyn UserIo>) -> Self {
        let base = format!("{}/{API_VERSION}", server.as_str().trim_end_matches('/'));
        debug!(%base, "registry client ready");
        Self {
            base,
            http,
            token: None,
            fingerprint: String::new(),
            user: None,
            io,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn send(&self, call: &Call<'_>) -> Result<Response, ApiError> {
        let operation = call.operation();
        let endpoint = endpoint(operation);
        let url = build_url(&self.base, endpoint.pattern, &url_params(call))?;
        let mut request = match endpoint.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
        };
        request = request
            .header(ANONYMOUS_ID_HEADER, self.fingerprint.as_str())
            .header(CLIENT_ID_HEADER, self.user.as_deref().unwrap_or(""));
        request = match (endpoint.auth, call) {
            (AuthMode::Basic, Call::Authenticate { user, password }) => {
                request.basic_auth(user, Some(password))
            }
            (AuthMode::Token, _) => match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
            (AuthMode::Basic, _) => request,
        };
        if let Some(body) = wire::request_body(call)? {
            request = request.header(CONTENT_TYPE, CBOR_CONTENT_TYPE).body(body);
        }
        if operation == Operation::GetServerInfo {
            request = request.timeout(SERVER_INFO_TIMEOUT);
        }
        debug!(%operation, authenticated = self.token.is_some(), "remote call");
        request.send().map_err(|err| transport_error(operation, &err))
    }

    fn forward(&self, messages: &[ServerMessage]) {
        for message in messages {
            match message.level {
                MessageLevel::Info => self.io.info(&message.text),
                MessageLevel::Warn => self.io.warn(&message.text),
                MessageLevel::Error => self.io.error(&message.text),
            }
        }
    }
}

fn transport_error(operation: Operation, err: &reqwest::Error) -> ApiError {
    debug!(%operation, error = %err, "transport failure");
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ApiError::connectivity()
    } else {
        ApiError::new(ErrorKind::Service, format!("{operation} failed: {err}"))
    }
}

impl RemoteApi for RestClient {
    fn invoke(&mut self, call: &Call<'_>) -> Result<Reply, ApiError> {
        let operation = call.operation();
        let response = self.send(call)?;
        let status = response.status().as_u16();
        let is_cbor = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(CBOR_CONTENT_TYPE));
        let bytes = response
            .bytes()
            .map_err(|err| transport_error(operation, &err))?;
        let payload = if is_cbor {
            let envelope = wire::decode_envelope(&bytes)?;
            self.forward(&envelope.info);
            Payload::Cbor(envelope.value.unwrap_or(Value::Null))
        } else {
            Payload::Text(String::from_utf8_lossy(&bytes).into_owned())
        };

        if let Some(kind) = ErrorKind::from_status(status) {
            debug!(%operation, status, ?kind, "remote call rejected");
            let detail = payload.describe();
            let message = if detail.is_empty() {
                format!("{operation} failed with HTTP {status}")
            } else {
                detail
            };
            return Err(ApiError::new(kind, message));
        }

        match payload {
            Payload::Cbor(value) => wire::decode_reply(operation, &value),
            Payload::Text(text) => match operation {
                Operation::RequireAuth => Ok(Reply::Unit),
                Operation::Authenticate => Ok(Reply::Token(text.trim().to_string())),
                _ => Err(ApiError::new(
                    ErrorKind::Service,
                    format!("error handling server response to {operation}: not CBOR"),
                )),
            },
        }
    }
}

impl Session for RestClient {
    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn set_identity(&mut self, fingerprint: &str, user: Option<&str>) {
        fingerprint.clone_into(&mut self.fingerprint);
        self.user = user.map(ToOwned::to_owned);
    }
}
