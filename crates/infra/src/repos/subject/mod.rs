mod inmemory;
mod mongo;

pub use inmemory::InMemorySubjectRepo;
pub use mongo::MongoSubjectRepo;

use crate::repos::shared::repo::DeleteResult;
use obligations_domain::{Subject, ID};

/// Read access to the subscriptions or compliances owned by the surrounding
/// CRUD application
#[async_trait::async_trait]
pub trait ISubjectRepo: Send + Sync {
    async fn insert(&self, subject: &Subject) -> anyhow::Result<()>;
    /// `None` if no subject with this id exists within the tenant
    async fn find_one(&self, subject_id: &ID, tenant_id: &str) -> anyhow::Result<Option<Subject>>;
    async fn delete(&self, subject_id: &ID) -> anyhow::Result<DeleteResult>;
}
