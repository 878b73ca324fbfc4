use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    auth::EdgeAuth, client::EdgeClient, config::EdgeClientOptions, runtime::Runtime,
};

/// Connection settings gathered from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub mgmt_url: Option<String>,
    pub org: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub netrc: Option<PathBuf>,
    pub debug: bool,
    pub retries: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Connection {
    pub fn options(&self) -> EdgeClientOptions {
        let mut options = EdgeClientOptions::new(self.org.clone()).debug(self.debug);
        if let Some(url) = &self.mgmt_url {
            options = options.mgmt_url(url.clone());
        }
        if let Some(retries) = self.retries {
            options = options.max_retries(retries);
        }
        if let Some(timeout) = self.timeout {
            options = options.timeout(timeout);
        }

        let auth = EdgeAuth {
            netrc_path: self.netrc.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            access_token: self.token.clone(),
        };
        if auth != EdgeAuth::default() {
            options = options.auth(auth);
        }
        options
    }
}

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub client: EdgeClient,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, connection: &Connection) -> Result<Self> {
        debug!("Connecting to organization {:?}", connection.org);
        let client = EdgeClient::with_runtime(connection.options(), &runtime)?;
        Ok(Self { runtime, client })
    }
}
