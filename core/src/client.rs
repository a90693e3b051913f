//! Connection parameters and the shared request helper.
//!
//! # Design
//! `Client` holds the normalized endpoint, project and token, and is never
//! mutated after construction. Every `Launch` borrows it to build URLs and to
//! run requests through `Client::execute`, which attaches the token, calls the
//! transport and wraps transport failures. `check_status` turns a response
//! with the wrong status into `RpError::UnexpectedStatus`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Result, RpError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Activity, PageRequest};

/// ReportPortal client bound to one project.
#[derive(Clone)]
pub struct Client {
    endpoint: String,
    project: String,
    token: String,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client for `endpoint`, normalizing it to
    /// `<scheme>://<host>[/path]/api/v<N>`. No I/O happens here.
    pub fn new(endpoint: &str, project: &str, token: &str, api_version: i32) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint, api_version),
            project: project.to_string(),
            token: token.to_string(),
            transport: Arc::new(UreqTransport::default()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            &config.endpoint,
            &config.project,
            &config.token,
            config.api_version,
        )
        .with_transport(UreqTransport::new(config.timeout()))
    }

    /// Replace the transport used to execute requests.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `{endpoint}/{project}/launch`
    pub(crate) fn launch_url(&self) -> String {
        format!("{}/{}/launch", self.endpoint, self.project)
    }

    pub fn build_check_connect(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, format!("{}/user", self.endpoint))
    }

    pub fn parse_check_connect(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, 200)
    }

    /// Verify the endpoint is reachable and the token is accepted.
    pub fn check_connect(&self) -> Result<()> {
        let response = self.execute(self.build_check_connect())?;
        self.parse_check_connect(response)
    }

    pub fn build_activity(&self, page: PageRequest) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Get,
            format!(
                "{}/{}/activity?page.page={}&page.size={}",
                self.endpoint, self.project, page.page, page.size
            ),
        )
    }

    pub fn parse_activity(&self, response: HttpResponse) -> Result<Activity> {
        let url = format!("{}/{}/activity", self.endpoint, self.project);
        check_status(&response, 200)?;
        decode(&url, &response)
    }

    /// Fetch one page of the project's activity log.
    pub fn activity(&self, page: PageRequest) -> Result<Activity> {
        let response = self.execute(self.build_activity(page))?;
        self.parse_activity(response)
    }

    /// Attach the token and run `request` through the transport. Any status
    /// is returned as data; interpreting it is left to the `parse_*` methods.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        let response = self
            .transport
            .execute(request.with_bearer(&self.token))
            .map_err(|source| RpError::Transport {
                method,
                url: url.clone(),
                source,
            })?;

        debug!(%method, %url, status = response.status, "received response");
        Ok(response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Strip a trailing slash, default the scheme to https and append the API
/// version segment unless one is already present.
pub fn normalize_endpoint(endpoint: &str, api_version: i32) -> String {
    let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint);

    let mut normalized = String::with_capacity(endpoint.len() + 16);
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        normalized.push_str("https://");
    }
    normalized.push_str(endpoint);

    if !endpoint.contains("/api/v") {
        normalized.push_str(&format!("/api/v{}", api_version.max(1)));
    }
    normalized
}

/// Map any status other than `expected` to `RpError::UnexpectedStatus`.
pub(crate) fn check_status(response: &HttpResponse, expected: u16) -> Result<()> {
    if response.status == expected {
        return Ok(());
    }
    warn!(status = response.status, expected, "unexpected response status");
    Err(RpError::UnexpectedStatus {
        status: response.status,
        line: response.status_line(),
        body: response.body.clone(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|source| RpError::Deserialize {
        url: url.to_string(),
        source,
    })
}
