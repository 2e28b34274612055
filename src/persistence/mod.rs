// ============================================================================
// Persistence - Repositories for Orders and Users
// ============================================================================
//
// Repositories own identity and versioning:
// - `save` on an unsaved entity assigns a UUID v7 and version 0
// - `save` on a stored entity succeeds only if the versions match, then bumps
//   the version (optimistic locking)
//
// Two backends: in-memory (default, tests) and PostgreSQL (sqlx).
//
// ============================================================================

mod errors;
mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use crate::domain::user::User;

pub use errors::RepositoryError;
pub use memory::{InMemoryOrderRepository, InMemoryUserRepository};
pub use postgres::{connect, PgOrderRepository, PgUserRepository};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(u64::from(self.size.max(1)))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts or updates; returns the order as stored (id and version set).
    async fn save(&self, order: Order) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError>;

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, RepositoryError>;

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Deletes only while the stored version still equals `expected_version`;
    /// otherwise `VersionConflict`. Check and delete are one atomic step.
    async fn delete_versioned(&self, id: Uuid, expected_version: i64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, RepositoryError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Duplicate line items violate the storage uniqueness constraint.
pub(crate) fn check_unique_line_items(order: &Order) -> Result<(), RepositoryError> {
    let items = order.line_items();
    for (index, item) in items.iter().enumerate() {
        if items[..index].contains(item) {
            return Err(RepositoryError::Constraint(format!(
                "duplicate line item '{}' at position {}",
                item.name(),
                index
            )));
        }
    }
    Ok(())
}
