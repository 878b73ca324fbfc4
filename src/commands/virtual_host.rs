use anyhow::Result;
use std::io::Write;

use crate::runtime::Runtime;

use super::config::Config;

#[tracing::instrument(skip(config, out))]
pub async fn list<R: Runtime>(config: &Config<R>, env: &str, out: &mut (dyn Write + Send)) -> Result<()> {
    for name in config.client.virtual_hosts().list(env).await? {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

#[tracing::instrument(skip(config, out))]
pub async fn get<R: Runtime>(
    config: &Config<R>,
    env: &str,
    name: &str,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let host = config.client.virtual_hosts().get(env, name).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&host)?)?;
    Ok(())
}

#[tracing::instrument(skip(config, out))]
pub async fn delete<R: Runtime>(
    config: &Config<R>,
    env: &str,
    name: &str,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    config.client.virtual_hosts().delete(env, name).await?;
    writeln!(out, "Deleted virtual host {} from {}", name, env)?;
    Ok(())
}
