//! Client core for the Apigee Edge management API.

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod resources;
pub mod response;
pub mod runtime;

pub use auth::{Credential, EdgeAuth};
pub use client::{EdgeClient, RequestSummary};
pub use config::EdgeClientOptions;
pub use error::{ApiError, EdgeError, Result};
pub use request::{ListOptions, Payload};
pub use response::{Envelope, RawResponse, Target};
