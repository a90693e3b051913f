//! Synchronous ReportPortal client core.
//!
//! # Overview
//! Models a launch (one test-run report) and drives it through its lifecycle
//! against the ReportPortal REST API: start, update, stop or finish, delete.
//! Also exposes the connectivity check and the project activity log.
//!
//! # Design
//! - `Client` holds the normalized endpoint, project and token and is shared
//!   read-only by every `Launch` built from it.
//! - Each operation is split into `build_*` (produces request data) and
//!   `parse_*` (consumes response data). The convenience methods run the
//!   round trip through a `Transport`, ureq by default.
//! - Every operation accepts exactly one status code. Anything else fails
//!   with `failed with status <status line>`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod launch;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Result, RpError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use launch::Launch;
pub use transport::{Transport, UreqTransport};
pub use types::{
    Action, Activity, ActivityEntry, FieldChange, FinishLaunch, LaunchCreated, LaunchStatus,
    LogLevel, Mode, Page, PageRequest, StartLaunch, UpdateLaunch,
};
