use super::*;

pub(super) fn matches(record: &ScopedRecord, record_type: &RecordType, filter: &RowFilter) -> bool {
    record.record_type() == record_type && filter.allows(record.created_by())
}

pub(super) fn visible<'a>(
    state: &'a RbacState,
    record_type: &'a RecordType,
    filter: &'a RowFilter,
) -> impl Iterator<Item = &'a ScopedRecord> {
    state
        .records
        .iter()
        .filter(move |record| matches(record, record_type, filter))
}
