//! Paginated reads of the local mirror.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use recsync_core::error::InvalidInputError;
use recsync_core::{
    CustomerId, Error, ListQuery, RecordId, RecordStore, RecordType, Result, SearchFilter,
    StoredRecord,
};

/// One page of list results.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPage {
    pub records: Vec<StoredRecord>,
    /// Offset of the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Serves customer-scoped list and lookup requests.
pub struct QueryService<S: ?Sized> {
    store: Arc<S>,
    page_size: usize,
}

impl<S: ?Sized> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            page_size: self.page_size,
        }
    }
}

impl<S> QueryService<S>
where
    S: RecordStore + ?Sized,
{
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// List one type of the customer's records.
    ///
    /// `cursor` is the decimal offset returned by the previous page. A blank
    /// `search` returns the full scoped set.
    #[instrument(skip(self), fields(customer = %customer_id))]
    pub async fn list(
        &self,
        customer_id: &CustomerId,
        record_type: &RecordType,
        cursor: Option<&str>,
        search: Option<&str>,
    ) -> Result<QueryPage> {
        let offset = parse_cursor(cursor)?;

        let page = self
            .store
            .list(&ListQuery {
                customer_id: customer_id.clone(),
                record_type: record_type.clone(),
                filter: SearchFilter::parse(search),
                offset,
                limit: self.page_size,
            })
            .await?;

        let cursor = page
            .has_more
            .then(|| (offset + page.records.len() as u64).to_string());

        Ok(QueryPage {
            records: page.records,
            cursor,
        })
    }

    /// Fetch one of the customer's records by id.
    #[instrument(skip(self), fields(customer = %customer_id))]
    pub async fn get(&self, customer_id: &CustomerId, id: &RecordId) -> Result<StoredRecord> {
        self.store
            .find_one(customer_id, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("{}/{}", customer_id, id)))
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<u64> {
    match cursor.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(0),
        Some(c) => c.parse().map_err(|_| {
            Error::from(InvalidInputError::Cursor {
                value: c.to_string(),
            })
        }),
    }
}
