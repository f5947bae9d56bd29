//! Per-invocation credential loading

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::CredentialsConfig;
use crate::error::Result;
use crate::models::ServiceAccountCredentials;

/// Supplies service-account credentials to an invocation.
///
/// `Ok(None)` means no credentials are configured; `Err` means they are
/// configured but unusable.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Load the credentials
    async fn load(&self) -> Result<Option<ServiceAccountCredentials>>;
}

/// Service-account JSON held in an environment variable
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Read credentials from `var`
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialSource for EnvCredentials {
    async fn load(&self) -> Result<Option<ServiceAccountCredentials>> {
        match std::env::var(&self.var) {
            Ok(raw) if !raw.trim().is_empty() => ServiceAccountCredentials::from_json(&raw).map(Some),
            _ => Ok(None),
        }
    }
}

/// Service-account JSON key file
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    /// Read credentials from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialSource for FileCredentials {
    async fn load(&self) -> Result<Option<ServiceAccountCredentials>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => ServiceAccountCredentials::from_json(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Credentials supplied directly by the caller
#[async_trait]
impl CredentialSource for Option<ServiceAccountCredentials> {
    async fn load(&self) -> Result<Option<ServiceAccountCredentials>> {
        if let Some(credentials) = self {
            credentials.validate()?;
        }
        Ok(self.clone())
    }
}

#[async_trait]
impl CredentialSource for CredentialsConfig {
    async fn load(&self) -> Result<Option<ServiceAccountCredentials>> {
        match &self.file {
            Some(path) => FileCredentials::new(path).load().await,
            None => EnvCredentials::new(&self.env_var).load().await,
        }
    }
}
