use crate::domain::entities::{Assignment, LineItem, User};
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

/// Read and persist the assignment graph (assignment, line item, user).
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn find_assignment(&self, id: &str) -> DomainResult<Option<Assignment>>;

    async fn find_line_item(&self, id: &str) -> DomainResult<Option<LineItem>>;

    async fn find_user(&self, id: &str) -> DomainResult<Option<User>>;

    /// Insert or update a single assignment outside of any unit of work.
    async fn save_assignment(&self, assignment: &Assignment) -> DomainResult<()>;

    /// Writes `assignment` only if the stored row still has the state and
    /// attempt count of `expected`. Returns false when another writer got
    /// there first; nothing is written in that case.
    async fn compare_and_save(
        &self,
        expected: &Assignment,
        assignment: &Assignment,
    ) -> DomainResult<bool>;

    /// Open a transactional unit of work. Nothing written through it is
    /// visible until `commit`.
    async fn begin(&self) -> DomainResult<Box<dyn AssignmentUnitOfWork>>;
}

#[async_trait]
pub trait AssignmentUnitOfWork: Send {
    async fn find_user_by_username(&mut self, username: &str) -> DomainResult<Option<User>>;

    async fn find_line_item_by_slug(&mut self, slug: &str) -> DomainResult<Option<LineItem>>;

    /// Assignments of a user, oldest update first.
    async fn find_user_assignments(&mut self, user_id: &str) -> DomainResult<Vec<Assignment>>;

    async fn persist(&mut self, assignment: &Assignment) -> DomainResult<()>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;

    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}
