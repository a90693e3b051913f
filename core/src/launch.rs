//! Launch lifecycle: start, update, stop/finish, delete.
//!
//! # Design
//! A `Launch` borrows its `Client` and carries the server-assigned `id` once
//! `start` succeeds. Each operation is split like the rest of the crate into
//! a `build_*` method producing an `HttpRequest` and a `parse_*` method
//! consuming the `HttpResponse`; the plain methods (`start`, `stop`, ...)
//! run both through `Client::execute`. Local state only changes after a
//! successful round trip.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::client::{check_status, decode, Client};
use crate::error::{Result, RpError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Action, FinishLaunch, LaunchCreated, LaunchStatus, Mode, StartLaunch, UpdateLaunch};

/// Expected status of `start`.
const CREATED: u16 = 201;
/// Expected status of every other launch operation.
const OK: u16 = 200;

/// One test-run report.
#[derive(Debug, Clone)]
pub struct Launch<'c> {
    client: &'c Client,
    pub id: String,
    pub name: String,
    pub description: String,
    pub mode: Mode,
    pub tags: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl<'c> Launch<'c> {
    pub fn new(
        client: &'c Client,
        name: &str,
        description: &str,
        mode: Mode,
        tags: Vec<String>,
    ) -> Self {
        Self {
            client,
            id: String::new(),
            name: name.to_string(),
            description: description.to_string(),
            mode,
            tags,
            start_time: None,
        }
    }

    /// Attach to a launch that already exists on the server.
    pub fn with_id(client: &'c Client, id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::new(client, "", "", Mode::default(), Vec::new())
        }
    }

    pub fn is_started(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn build_start(&self, start_time: DateTime<Utc>) -> Result<HttpRequest> {
        let body = StartLaunch {
            name: self.name.clone(),
            description: self.description.clone(),
            start_time,
            mode: self.mode,
            tags: self.tags.clone(),
        };
        json_request(HttpMethod::Post, self.client.launch_url(), Some(&body))
    }

    /// Returns the id assigned by the server.
    pub fn parse_start(&self, response: HttpResponse) -> Result<String> {
        check_status(&response, CREATED)?;
        let created: LaunchCreated = decode(&self.client.launch_url(), &response)?;
        Ok(created.id)
    }

    /// Create the launch on the server and record its id and start time.
    pub fn start(&mut self) -> Result<()> {
        let start_time = Utc::now();
        let response = self.client.execute(self.build_start(start_time)?)?;
        let id = self.parse_start(response)?;

        info!(launch_id = %id, name = %self.name, "launch started");
        self.id = id;
        self.start_time = Some(start_time);
        Ok(())
    }

    pub fn build_update(&self, changes: &UpdateLaunch) -> Result<HttpRequest> {
        let url = format!("{}/update", self.url()?);
        json_request(HttpMethod::Put, url, Some(changes))
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, OK)
    }

    /// Change description, mode or tags on the server. Fields left as `None`
    /// are not sent. The local copy is not modified.
    pub fn update(&self, changes: &UpdateLaunch) -> Result<()> {
        let response = self.client.execute(self.build_update(changes)?)?;
        self.parse_update(response)
    }

    pub fn build_terminate(
        &self,
        action: Action,
        status: LaunchStatus,
        end_time: DateTime<Utc>,
    ) -> Result<HttpRequest> {
        let url = format!("{}/{}", self.url()?, action);
        json_request(HttpMethod::Put, url, Some(&FinishLaunch { status, end_time }))
    }

    pub fn parse_terminate(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, OK)
    }

    /// Force-stop a running launch.
    pub fn stop(&self, status: LaunchStatus) -> Result<()> {
        self.terminate(Action::Stop, status)
    }

    /// Complete a launch normally.
    pub fn finish(&self, status: LaunchStatus) -> Result<()> {
        self.terminate(Action::Finish, status)
    }

    fn terminate(&self, action: Action, status: LaunchStatus) -> Result<()> {
        let request = self.build_terminate(action, status, Utc::now())?;
        let response = self.client.execute(request)?;
        self.parse_terminate(response)?;
        info!(launch_id = %self.id, %action, ?status, "launch terminated");
        Ok(())
    }

    pub fn build_delete(&self) -> Result<HttpRequest> {
        json_request::<()>(HttpMethod::Delete, self.url()?, None)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<()> {
        check_status(&response, OK)
    }

    /// Remove the launch from the server. The in-memory value stays usable.
    pub fn delete(&self) -> Result<()> {
        let response = self.client.execute(self.build_delete()?)?;
        self.parse_delete(response)?;
        info!(launch_id = %self.id, "launch deleted");
        Ok(())
    }

    /// `{endpoint}/{project}/launch/{id}`; fails if the launch has no id yet.
    fn url(&self) -> Result<String> {
        if !self.is_started() {
            return Err(RpError::LaunchNotStarted);
        }
        Ok(format!("{}/{}", self.client.launch_url(), self.id))
    }
}

fn json_request<T: Serialize>(method: HttpMethod, url: String, body: Option<&T>) -> Result<HttpRequest> {
    let body = body
        .map(serde_json::to_string)
        .transpose()
        .map_err(|source| RpError::Serialize {
            url: url.clone(),
            source,
        })?;
    Ok(HttpRequest::json(method, url, body))
}
