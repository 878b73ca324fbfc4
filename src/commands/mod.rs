use anyhow::Result;
use std::io::Write;

pub mod config;
mod request;
pub mod virtual_host;

pub use config::{Config, Connection};
pub use request::{BodySource, delete, get, send};

/// Prints a response body: JSON pretty-printed, anything else as is.
pub(crate) fn print_body(out: &mut (dyn Write + Send), body: &[u8]) -> Result<()> {
    if body.is_empty() {
        return Ok(());
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
        Err(_) => {
            out.write_all(body)?;
            if !body.ends_with(b"\n") {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
