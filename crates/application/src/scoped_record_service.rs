use std::sync::Arc;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{Principal, RecordId, RecordType, ScopedRecord};
use serde_json::Value;
use tracing::info;

use crate::query_cache_service::record_type_tag;
use crate::{HierarchyScopeService, QueryCacheService, ScopedRecordRepository};

/// Application service for business records read through the hierarchy scope.
#[derive(Clone)]
pub struct ScopedRecordService {
    scope: HierarchyScopeService,
    repository: Arc<dyn ScopedRecordRepository>,
    cache: QueryCacheService,
}

impl ScopedRecordService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        scope: HierarchyScopeService,
        repository: Arc<dyn ScopedRecordRepository>,
        cache: QueryCacheService,
    ) -> Self {
        Self {
            scope,
            repository,
            cache,
        }
    }

    /// Lists the records of one type visible to the principal.
    ///
    /// Results are cached per record type and row filter.
    pub async fn list(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
    ) -> AppResult<Vec<ScopedRecord>> {
        let filter = self.scope.filter_for(principal, record_type).await?;
        let key = format!("records:{record_type}:list:{}", filter.cache_fragment());
        let tags = [record_type_tag(record_type)];

        self.cache
            .cached(
                key.as_str(),
                self.cache.default_ttl_seconds(),
                &tags,
                || self.repository.list_records(record_type, &filter),
            )
            .await
    }

    /// Finds one record visible to the principal.
    pub async fn find(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
        record_id: RecordId,
    ) -> AppResult<ScopedRecord> {
        let filter = self.scope.filter_for(principal, record_type).await?;

        self.repository
            .find_record(record_type, record_id, &filter)
            .await?
            .ok_or_else(|| not_found(record_type, record_id))
    }

    /// Creates a record owned by the principal.
    pub async fn create(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
        data: Value,
    ) -> AppResult<ScopedRecord> {
        let Some(principal) = principal else {
            return Err(AppError::Unauthorized(format!(
                "authentication is required to create '{record_type}' records"
            )));
        };
        if !data.is_object() {
            return Err(AppError::Validation(
                "record data must be a JSON object".to_owned(),
            ));
        }

        let record = self
            .repository
            .create_record(record_type, principal.id(), data)
            .await?;
        self.cache.invalidate(&[record_type_tag(record_type)]).await;

        info!(
            record_type = %record_type,
            record_id = %record.record_id(),
            created_by = %principal.id(),
            "scoped record created"
        );

        Ok(record)
    }

    /// Deletes one record visible to the principal.
    pub async fn delete(
        &self,
        principal: Option<&Principal>,
        record_type: &RecordType,
        record_id: RecordId,
    ) -> AppResult<()> {
        let filter = self.scope.filter_for(principal, record_type).await?;

        if !self
            .repository
            .delete_record(record_type, record_id, &filter)
            .await?
        {
            return Err(not_found(record_type, record_id));
        }
        self.cache.invalidate(&[record_type_tag(record_type)]).await;

        Ok(())
    }
}

fn not_found(record_type: &RecordType, record_id: RecordId) -> AppError {
    AppError::NotFound(format!(
        "{record_type} record '{record_id}' does not exist or is outside your scope"
    ))
}
