use anyhow::{Context, Result};
use log::debug;
use reqwest::Method;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{
    request::{ListOptions, Payload, add_options},
    response::Target,
    runtime::Runtime,
};

use super::config::Config;
use super::print_body;

/// Where a `post`/`put` body comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BodySource {
    #[default]
    Empty,
    /// A file holding a JSON document.
    Json(PathBuf),
    /// A file sent byte for byte.
    Raw(PathBuf),
}

impl BodySource {
    fn load<R: Runtime>(&self, runtime: &R) -> Result<Payload> {
        match self {
            BodySource::Empty => Ok(Payload::None),
            BodySource::Json(path) => {
                let bytes = runtime.read(path)?;
                let value: serde_json::Value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("{} is not valid JSON", path.display()))?;
                Ok(Payload::Json(value))
            }
            BodySource::Raw(path) => Ok(Payload::raw(runtime.read(path)?)),
        }
    }
}

/// `GET` a path and print the answer, or save it to `output`.
#[tracing::instrument(skip(config, out))]
pub async fn get<R: Runtime>(
    config: &Config<R>,
    path: &str,
    expand: bool,
    output: Option<&Path>,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let path = if expand {
        add_options(path, Some(&ListOptions { expand }))?
    } else {
        path.to_string()
    };

    if let Some(file) = output {
        let mut writer = config.runtime.create_file(file)?;
        config
            .client
            .perform(Method::GET, &path, Payload::None, Target::Stream(&mut *writer))
            .await?;
        debug!("Saved {} to {}", path, file.display());
        return Ok(());
    }

    let mut body = Vec::new();
    config
        .client
        .perform(Method::GET, &path, Payload::None, Target::stream(&mut body))
        .await?;
    print_body(out, &body)
}

#[tracing::instrument(skip(config, out))]
pub async fn delete<R: Runtime>(
    config: &Config<R>,
    path: &str,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let mut body = Vec::new();
    config
        .client
        .perform(Method::DELETE, path, Payload::None, Target::stream(&mut body))
        .await?;
    print_body(out, &body)
}

/// Sends a body with `method` and prints the answer.
#[tracing::instrument(skip(config, out))]
pub async fn send<R: Runtime>(
    config: &Config<R>,
    method: Method,
    path: &str,
    source: &BodySource,
    content_type: Option<&str>,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let payload = source.load(&config.runtime)?;
    let request = config.client.build(method, path, payload, content_type)?;
    let raw = config.client.execute(request).await?;

    let mut body = Vec::new();
    config.client.classify(raw, Target::stream(&mut body)).await?;
    print_body(out, &body)
}
