//! Explicit worker configuration.

use swcache_core::{AppConfig, Error};
use url::Url;

use crate::fetch::resolve;

/// Everything the offline worker needs to know about its deployment.
///
/// Built once from [`AppConfig`] (or by hand in tests) so several
/// configurations can run side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name of the current cache store.
    pub version_id: String,
    /// Scope URL; its origin is the worker's own origin.
    pub scope: Url,
    /// Absolute URLs cached at install, in order.
    pub asset_manifest: Vec<Url>,
    /// Shell page served to offline navigations.
    pub offline_fallback: Url,
    /// Ignore requests to other origins.
    pub origin_restriction: bool,
    /// Path extensions served network-first.
    pub network_first_extensions: Vec<String>,
}

impl WorkerConfig {
    /// Build a configuration, resolving manifest entries and the fallback against `scope`.
    ///
    /// Origin restriction starts enabled and no extension is network-first.
    pub fn new(
        version_id: impl Into<String>, scope: Url, manifest: &[&str], offline_fallback: &str,
    ) -> Result<Self, Error> {
        let asset_manifest = manifest
            .iter()
            .map(|entry| resolve(&scope, entry).map_err(|e| Error::InvalidUrl(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let offline_fallback = resolve(&scope, offline_fallback).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            version_id: version_id.into(),
            scope,
            asset_manifest,
            offline_fallback,
            origin_restriction: true,
            network_first_extensions: Vec::new(),
        })
    }

    /// Build the worker configuration described by the application config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let scope_str = config.scope();
        let scope = Url::parse(&scope_str).map_err(|e| Error::InvalidUrl(format!("{scope_str}: {e}")))?;
        let manifest: Vec<&str> = config.asset_manifest.iter().map(String::as_str).collect();

        Ok(Self::new(config.version_id.clone(), scope, &manifest, &config.offline_fallback)?
            .with_origin_restriction(config.origin_restriction)
            .with_network_first(config.network_first_extensions.iter().cloned()))
    }

    pub fn with_origin_restriction(mut self, enabled: bool) -> Self {
        self.origin_restriction = enabled;
        self
    }

    pub fn with_network_first(mut self, extensions: impl IntoIterator<Item = String>) -> Self {
        self.network_first_extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }
}
