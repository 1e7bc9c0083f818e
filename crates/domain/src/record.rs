use rowguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RecordId, RecordType, UserId};

/// Business row owned by the principal that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedRecord {
    record_id: RecordId,
    record_type: RecordType,
    created_by: Option<UserId>,
    data: Value,
}

impl ScopedRecord {
    /// Creates a validated record projection.
    pub fn new(
        record_id: RecordId,
        record_type: RecordType,
        created_by: Option<UserId>,
        data: Value,
    ) -> AppResult<Self> {
        if !data.is_object() {
            return Err(AppError::Validation(
                "record data must be a JSON object".to_owned(),
            ));
        }

        Ok(Self {
            record_id,
            record_type,
            created_by,
            data,
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Returns the principal that created the row, if recorded.
    #[must_use]
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Returns the record JSON object.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }
}
