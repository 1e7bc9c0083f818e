use std::env;
use std::path::PathBuf;

use rowguard_core::{AppError, AppResult, GuardName};
use rowguard_domain::{
    DEFAULT_EXCLUDED_RECORD_TYPES, HierarchyScopePolicy, RecordType, ScopeFallback,
};

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub guard: GuardName,
    pub catalog_path: Option<PathBuf>,
    pub teams_enabled: bool,
    pub scope_policy: HierarchyScopePolicy,
    pub cache_ttl_seconds: u32,
    pub cache_key_prefix: String,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = optional("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let guard = optional("RBAC_DEFAULT_GUARD")
            .map(GuardName::new)
            .transpose()?
            .unwrap_or_default();
        let teams_enabled = optional("RBAC_TEAMS_ENABLED")
            .map(|value| parse_bool("RBAC_TEAMS_ENABLED", value.as_str()))
            .transpose()?
            .unwrap_or(false);

        let excluded = match optional("HIERARCHY_SCOPE_EXCLUDED") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(RecordType::new)
                .collect::<AppResult<Vec<_>>>()?,
            None => DEFAULT_EXCLUDED_RECORD_TYPES
                .iter()
                .map(|name| RecordType::new(*name))
                .collect::<AppResult<Vec<_>>>()?,
        };
        let fallback = optional("HIERARCHY_SCOPE_FALLBACK")
            .map(|value| value.parse::<ScopeFallback>())
            .transpose()?
            .unwrap_or_default();

        let cache_ttl_seconds = optional("QUERY_CACHE_TTL_SECONDS")
            .map(|value| {
                value.parse::<u32>().map_err(|error| {
                    AppError::Validation(format!(
                        "invalid QUERY_CACHE_TTL_SECONDS value '{value}': {error}"
                    ))
                })
            })
            .transpose()?
            .unwrap_or(300);

        Ok(Self {
            database_url,
            redis_url: optional("REDIS_URL"),
            guard,
            catalog_path: optional("RBAC_CATALOG_PATH").map(PathBuf::from),
            teams_enabled,
            scope_policy: HierarchyScopePolicy::new(excluded, fallback),
            cache_ttl_seconds,
            cache_key_prefix: optional("QUERY_CACHE_KEY_PREFIX")
                .unwrap_or_else(|| "rowguard".to_owned()),
        })
    }
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "invalid {name} value '{value}': expected true or false"
        ))),
    }
}
