use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::error::{GarakError, RawResponse, Result};

const USER_AGENT: &str = concat!("garak-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Single-shot HTTP access to the service. Never retries; non-2xx statuses become [`GarakError`]s.
pub struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
    verify_ssl: bool,
    session: Mutex<Option<Client>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, credentials: Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|err| {
                GarakError::invalid_configuration(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout: config.timeout,
            verify_ssl: config.verify_ssl,
            session: Mutex::new(Some(http)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    /// Join `path` onto the base URL. Query strings in `path` are kept as-is.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Drop the pooled HTTP session. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        match self.session.lock() {
            Ok(mut guard) => guard.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.session.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn session(&self) -> Result<Client> {
        let guard = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .clone()
            .ok_or_else(|| GarakError::invalid_configuration("client has been closed"))
    }

    /// Issue one request and return the response if its status is 2xx.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        customize: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let url = self.build_url(path);
        let http = self.session()?;
        debug!(%method, %url, key = %self.credentials.key_prefix(), "sending request");

        let request = customize(
            http.request(method.clone(), &url)
                .headers(self.credentials.auth_headers()),
        );
        let response = request.send().await.map_err(|err| {
            let reason = if err.is_timeout() {
                "timed out"
            } else if err.is_connect() {
                "could not connect"
            } else {
                "failed"
            };
            GarakError::network(format!("{method} {url} {reason}: {err}"), Some(err))
        })?;

        let status = response.status();
        debug!(%method, %url, status = status.as_u16(), "received response");
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response.headers().get(RETRY_AFTER).cloned();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(%url, status = status.as_u16(), error = %err, "could not read error body");
                String::new()
            }
        };
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%url, retry_after = ?retry_after, "rate limited by service");
        }
        Err(map_error_status(status, retry_after.as_ref(), &body))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, |req| req).await?;
        read_json(response).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(Method::GET, path, |req| req.query(query)).await?;
        read_json(response).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(Method::POST, path, |req| req.json(body)).await?;
        read_json(response).await
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(Method::PATCH, path, |req| req.json(body)).await?;
        read_json(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::DELETE, path, |req| req).await?;
        read_json(response).await
    }

    /// Raw body of a successful GET, for binary report downloads.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.send(Method::GET, path, |req| req).await?;
        let bytes = response.bytes().await.map_err(|err| {
            GarakError::network(format!("failed to read response body: {err}"), Some(err))
        })?;
        trace!(len = bytes.len(), "downloaded body");
        Ok(bytes.to_vec())
    }
}

/// Decode a 2xx body into `T`. Shape mismatches become [`GarakError::ScanValidation`].
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|err| {
        GarakError::network(format!("failed to read response body: {err}"), Some(err))
    })?;
    trace!(status, len = body.len(), "decoding response body");
    decode_body(status, &body)
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| {
        GarakError::scan_validation(format!("unexpected response shape: {err}"))
            .with_response(RawResponse::new(status, body))
    })
}

/// Translate a non-2xx status and its body into the matching error variant.
pub(crate) fn map_error_status(
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
    body: &str,
) -> GarakError {
    let code = status.as_u16();
    let payload: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        payload
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(|value| value.as_str())
            .map(str::to_string)
    };
    let detail = field("message")
        .or_else(|| field("detail"))
        .or_else(|| field("error"));
    let error_code = field("error_code").or_else(|| field("error"));

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GarakError::authentication(match detail {
            Some(detail) => format!("Authentication failed: {detail}"),
            None => format!("Authentication failed (HTTP {code})"),
        }),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            GarakError::rate_limit(
                match detail {
                    Some(detail) => format!("Rate limit exceeded: {detail}"),
                    None => "Rate limit exceeded".to_string(),
                },
                retry_after,
            )
        }
        _ => GarakError::api(
            detail.unwrap_or_else(|| format!("API request failed with status {code}")),
            Some(code),
            error_code,
        ),
    };
    err.with_response(RawResponse::new(code, body))
}
