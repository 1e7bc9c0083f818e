//! Rowguard operational command line.

#![forbid(unsafe_code)]

mod catalog;
mod command;
mod config;

use std::sync::Arc;

use rowguard_application::{
    AuthorizationService, HierarchyScopeService, QueryCache, QueryCacheService,
    ReconciliationService, ScopedRecordService,
};
use rowguard_core::{AppError, AppResult};
use rowguard_domain::Principal;
use rowguard_infrastructure::{
    InMemoryQueryCache, PostgresAuditRepository, PostgresAuthorizationRepository,
    PostgresCatalogRepository, PostgresDescendantResolver, PostgresScopedRecordRepository,
    RedisQueryCache,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::load_catalog;
use crate::command::Command;
use crate::config::CliConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = Command::parse(std::env::args().skip(1))?;
    let config = CliConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let cache = build_cache(&config)?;

    match command {
        Command::Migrate => {
            info!("database migrations applied successfully");
            Ok(())
        }
        Command::Plan => {
            let catalog = load_catalog(config.catalog_path.as_deref())?;
            let plan = reconciliation_service(&pool, &config, cache)
                .plan(&catalog)
                .await?;
            print_json(&plan)
        }
        Command::Reconcile => {
            let catalog = load_catalog(config.catalog_path.as_deref())?;
            let report = reconciliation_service(&pool, &config, cache)
                .reconcile(&catalog)
                .await?;
            print_json(&report)
        }
        Command::Check {
            user_id,
            permission,
            team_id,
        } => {
            let mut principal = Principal::new(user_id, config.guard.clone());
            if let Some(team_id) = team_id {
                if !config.teams_enabled {
                    return Err(AppError::Validation(
                        "a team id requires RBAC_TEAMS_ENABLED=true".to_owned(),
                    ));
                }
                principal = principal.with_team(team_id);
            }

            let authorization = AuthorizationService::new(
                Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
                cache,
            );
            let decision = authorization
                .decide(Some(&principal), permission.as_str())
                .await?;
            info!(user_id = %user_id, decision = decision.as_str(), "permission checked");
            println!("{}", if decision.is_granted() { "granted" } else { "denied" });
            Ok(())
        }
        Command::Records {
            user_id,
            record_type,
        } => {
            let principal = user_id.map(|user_id| Principal::new(user_id, config.guard.clone()));
            let scope = HierarchyScopeService::new(
                config.scope_policy.clone(),
                Arc::new(PostgresDescendantResolver::new(pool.clone())),
            );
            let records = ScopedRecordService::new(
                scope,
                Arc::new(PostgresScopedRecordRepository::new(pool.clone())),
                cache,
            )
            .list(principal.as_ref(), &record_type)
            .await?;
            print_json(&records)
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_cache(config: &CliConfig) -> AppResult<QueryCacheService> {
    let cache: Arc<dyn QueryCache> = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL '{redis_url}': {error}"))
            })?;
            Arc::new(RedisQueryCache::new(
                client,
                config.cache_key_prefix.as_str(),
            ))
        }
        None => Arc::new(InMemoryQueryCache::new()),
    };

    Ok(QueryCacheService::new(cache, config.cache_ttl_seconds))
}

fn reconciliation_service(
    pool: &PgPool,
    config: &CliConfig,
    cache: QueryCacheService,
) -> ReconciliationService {
    ReconciliationService::new(
        Arc::new(PostgresCatalogRepository::new(pool.clone())),
        Arc::new(PostgresAuditRepository::new(pool.clone())),
        cache,
        config.guard.clone(),
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
