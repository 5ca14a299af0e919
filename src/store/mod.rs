pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use serde::Serialize;

use crate::error::StoreResult;
use crate::model::Post;
use crate::query::{Filter, FindOpts, GroupRow, GroupSpec, UpdateSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
}

/// Narrow interface of the document store the report generator runs against.
///
/// One implementation speaks to MongoDB, one evaluates the same typed
/// vocabulary in process for offline runs and tests.
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    async fn find(&self, filter: &Filter, opts: FindOpts) -> StoreResult<Vec<Post>>;

    /// Returns the generated id of the new document, hex encoded.
    async fn insert_one(&self, post: &Post) -> StoreResult<String>;

    async fn update_many(
        &self,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateSummary>;

    /// Returns the number of documents removed.
    async fn delete_many(&self, filter: &Filter) -> StoreResult<u64>;

    async fn aggregate(&self, spec: &GroupSpec) -> StoreResult<Vec<GroupRow>>;
}
