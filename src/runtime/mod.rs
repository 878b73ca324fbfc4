//! Runtime abstraction for system operations.
//!
//! The client only touches the host system to locate and read the credential
//! store, and the command-line front end to read payload files and write
//! downloads. Going through this trait lets tests substitute a mock.
//!
//! # Structure
//!
//! - `env` - Environment variables and home directory lookup
//! - `fs` - File reads and file creation

mod env;
mod fs;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;
    fn home_dir(&self) -> Option<PathBuf>;

    // File System
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_impl(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }
}
