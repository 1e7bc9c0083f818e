use std::collections::BTreeSet;

use async_trait::async_trait;
use rowguard_core::AppResult;
use rowguard_domain::{RecordId, RecordType, RowFilter, ScopedRecord, UserId};
use serde_json::Value;

/// Port resolving the organizational hierarchy below a principal.
#[async_trait]
pub trait DescendantResolver: Send + Sync {
    /// Returns every principal id transitively created by `user_id`.
    ///
    /// An id the store does not know has no descendants. `None` means the
    /// resolver cannot walk a hierarchy for this kind of principal at all.
    async fn descendant_ids(&self, user_id: UserId) -> AppResult<Option<BTreeSet<UserId>>>;
}

/// Repository port for scoped business records.
///
/// Every read takes the row filter produced by the hierarchy scope.
#[async_trait]
pub trait ScopedRecordRepository: Send + Sync {
    /// Lists records of one type visible through the filter.
    async fn list_records(
        &self,
        record_type: &RecordType,
        filter: &RowFilter,
    ) -> AppResult<Vec<ScopedRecord>>;

    /// Finds one record visible through the filter.
    async fn find_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<Option<ScopedRecord>>;

    /// Inserts a record owned by `created_by`.
    async fn create_record(
        &self,
        record_type: &RecordType,
        created_by: UserId,
        data: Value,
    ) -> AppResult<ScopedRecord>;

    /// Deletes one record visible through the filter. Returns `false` when no
    /// visible row matched.
    async fn delete_record(
        &self,
        record_type: &RecordType,
        record_id: RecordId,
        filter: &RowFilter,
    ) -> AppResult<bool>;
}
