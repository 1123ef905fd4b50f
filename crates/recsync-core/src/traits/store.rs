//! Record store trait.

use async_trait::async_trait;

use crate::Result;
use crate::filter::SearchFilter;
use crate::record::{Record, RecordKey, StoredRecord};
use crate::types::{CustomerId, RecordId, RecordType};

/// A scoped, paginated read of one record type.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub customer_id: CustomerId,
    pub record_type: RecordType,
    pub filter: Option<SearchFilter>,
    /// Number of matching records to skip.
    pub offset: u64,
    /// Maximum number of records to return.
    pub limit: usize,
}

/// One page of a list query, ordered by [`StoredRecord::seq`].
#[derive(Debug, Clone)]
pub struct ListPage {
    pub records: Vec<StoredRecord>,

    /// Whether records exist past this page.
    pub has_more: bool,
}

/// Typed access to the record collection.
///
/// Implementations must guarantee at most one document per [`RecordKey`],
/// even under concurrent upserts, and must never return a record whose
/// customer differs from the one asked for.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under an exact key.
    async fn find(&self, key: &RecordKey) -> Result<Option<StoredRecord>>;

    /// Fetch a customer's record by id, whatever its type.
    async fn find_one(&self, customer_id: &CustomerId, id: &RecordId)
    -> Result<Option<StoredRecord>>;

    /// Insert or replace the record for its key.
    ///
    /// `updatedTime` is stamped with the current instant when the record
    /// does not carry one.
    async fn upsert(&self, record: Record) -> Result<StoredRecord>;

    /// Page through one customer's records of one type.
    async fn list(&self, query: &ListQuery) -> Result<ListPage>;

    /// Remove the record for a key. Returns whether a record existed.
    async fn delete(&self, key: &RecordKey) -> Result<bool>;
}
