//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_query_cache;
mod in_memory_rbac_store;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_catalog_repository;
mod postgres_descendant_resolver;
mod postgres_rows;
mod postgres_scoped_record_repository;
mod postgres_security_admin_repository;
mod redis_query_cache;

pub use in_memory_audit_repository::{InMemoryAuditRepository, RecordedAuditEvent};
pub use in_memory_query_cache::InMemoryQueryCache;
pub use in_memory_rbac_store::InMemoryRbacStore;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_catalog_repository::PostgresCatalogRepository;
pub use postgres_descendant_resolver::PostgresDescendantResolver;
pub use postgres_scoped_record_repository::PostgresScopedRecordRepository;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
pub use redis_query_cache::RedisQueryCache;

