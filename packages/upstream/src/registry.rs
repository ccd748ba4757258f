//! Compile-time registry of upstream service configurations.
//!
//! Each upstream is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`],
//! [`enabled_services`] and [`find_service`]. The base URL of any service
//! can be overridden at runtime with `CIVIC_FEED_<ID>_BASE_URL`.

use std::time::Duration;

use civic_feed_message_models::Dialect;
use serde::Deserialize;

/// An upstream service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamService {
    /// Unique identifier (e.g., `"oboapp"`, `"updates"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Payload rules the service follows.
    pub dialect: Dialect,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Whether this service is exposed.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a fetched sources list stays fresh.
    #[serde(default = "default_sources_ttl_secs")]
    pub sources_ttl_secs: u64,
    /// Endpoint paths relative to `base_url`.
    pub endpoints: Endpoints,
}

/// Endpoint paths of an upstream service.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    /// Message list (`{messages: [...]}`).
    pub messages: String,
    /// Single message lookup (`{message: {...}}`), if supported.
    pub message_by_id: Option<String>,
    /// Sources list (`{sources: [...]}`).
    pub sources: String,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_sources_ttl_secs() -> u64 {
    300
}

impl UpstreamService {
    /// Name of the environment variable that overrides `base_url`.
    #[must_use]
    pub fn base_url_env_var(&self) -> String {
        format!(
            "CIVIC_FEED_{}_BASE_URL",
            self.id.to_ascii_uppercase().replace('-', "_")
        )
    }

    /// The effective base URL: the environment override if set, otherwise
    /// the configured one. Trailing slashes are removed.
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        let base = std::env::var(self.base_url_env_var())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.base_url.clone());
        base.trim().trim_end_matches('/').to_string()
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Freshness window of the cached sources list.
    #[must_use]
    pub const fn sources_ttl(&self) -> Duration {
        Duration::from_secs(self.sources_ttl_secs)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("oboapp", include_str!("../services/oboapp.toml")),
    ("updates", include_str!("../services/updates.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all upstream service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<UpstreamService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse upstream service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, in registry order.
#[must_use]
pub fn enabled_services() -> Vec<UpstreamService> {
    all_services().into_iter().filter(|s| s.enabled).collect()
}

/// Finds an enabled service by id (case-insensitive).
#[must_use]
pub fn find_service(id: &str) -> Option<UpstreamService> {
    enabled_services()
        .into_iter()
        .find(|s| s.id.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(!svc.base_url.is_empty(), "Service {} has empty base_url", svc.id);
            assert!(
                !svc.endpoints.messages.is_empty(),
                "Service {} has no messages endpoint",
                svc.id
            );
            assert!(svc.timeout_secs > 0, "Service {} has zero timeout", svc.id);
        }
    }

    #[test]
    fn each_dialect_is_served() {
        let dialects: BTreeSet<Dialect> = all_services().iter().map(|s| s.dialect).collect();
        for dialect in Dialect::all() {
            assert!(dialects.contains(dialect), "No service for {dialect}");
        }
    }

    #[test]
    fn only_updates_has_lookup_by_id() {
        let updates = find_service("updates").unwrap();
        assert_eq!(
            updates.endpoints.message_by_id.as_deref(),
            Some("updates/by-id")
        );
        let oboapp = find_service("OboApp").unwrap();
        assert!(oboapp.endpoints.message_by_id.is_none());
        assert!(find_service("payload").is_none());
    }

    #[test]
    fn env_var_name_is_derived_from_id() {
        let svc = find_service("oboapp").unwrap();
        assert_eq!(svc.base_url_env_var(), "CIVIC_FEED_OBOAPP_BASE_URL");
    }
}
