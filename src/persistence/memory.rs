use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{check_unique_line_items, OrderRepository, Page, PageRequest, RepositoryError, UserRepository};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::user::User;

// ============================================================================
// In-Memory Repositories
// ============================================================================
//
// BTreeMap keyed by UUID v7, so iteration order is creation order.
// The write lock is held across the version check and the store.
//
// ============================================================================

/// Identity and versioning shared by both in-memory repositories.
trait Versioned: Clone {
    fn id(&self) -> Option<Uuid>;
    fn version(&self) -> i64;
    fn assign_identity(&mut self, id: Uuid, version: i64);
    fn set_version(&mut self, version: i64);
}

impl Versioned for Order {
    fn id(&self) -> Option<Uuid> {
        Order::id(self)
    }

    fn version(&self) -> i64 {
        Order::version(self)
    }

    fn assign_identity(&mut self, id: Uuid, version: i64) {
        Order::assign_identity(self, id, version)
    }

    fn set_version(&mut self, version: i64) {
        Order::set_version(self, version)
    }
}

impl Versioned for User {
    fn id(&self) -> Option<Uuid> {
        User::id(self)
    }

    fn version(&self) -> i64 {
        User::version(self)
    }

    fn assign_identity(&mut self, id: Uuid, version: i64) {
        User::assign_identity(self, id, version)
    }

    fn set_version(&mut self, version: i64) {
        User::set_version(self, version)
    }
}

struct Table<T> {
    rows: Arc<RwLock<BTreeMap<Uuid, T>>>,
}

impl<T: Versioned> Table<T> {
    fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    async fn save(&self, mut entity: T) -> Result<T, RepositoryError> {
        let mut rows = self.rows.write().await;

        match entity.id() {
            None => {
                let id = Uuid::now_v7();
                entity.assign_identity(id, 0);
                rows.insert(id, entity.clone());
            }
            Some(id) => {
                let stored = rows.get(&id).ok_or(RepositoryError::NotFound(id))?;
                if stored.version() != entity.version() {
                    return Err(RepositoryError::VersionConflict {
                        expected: entity.version(),
                        actual: stored.version(),
                    });
                }
                entity.set_version(entity.version() + 1);
                rows.insert(id, entity.clone());
            }
        }

        Ok(entity)
    }

    async fn find_by_id(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn find_all(&self, request: PageRequest) -> Page<T> {
        let rows = self.rows.read().await;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content = rows
            .values()
            .skip(offset)
            .take(request.size as usize)
            .cloned()
            .collect();
        Page::new(content, request, rows.len() as u64)
    }

    async fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .await
            .values()
            .filter(|entity| predicate(entity))
            .cloned()
            .collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn delete_versioned(&self, id: Uuid, expected: i64) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;

        let actual = rows.get(&id).ok_or(RepositoryError::NotFound(id))?.version();
        if actual != expected {
            return Err(RepositoryError::VersionConflict { expected, actual });
        }
        rows.remove(&id);
        Ok(())
    }
}

pub struct InMemoryOrderRepository {
    orders: Table<Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self { orders: Table::new() }
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, RepositoryError> {
        check_unique_line_items(&order)?;
        let saved = self.orders.save(order).await?;

        tracing::debug!(
            order_id = ?saved.id(),
            version = saved.version(),
            status = %saved.status(),
            "Saved order"
        );

        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.find_by_id(id).await)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, RepositoryError> {
        Ok(self.orders.find_all(page).await)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders.filter(|order| order.status() == status).await)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.orders.delete(id).await
    }

    async fn delete_versioned(&self, id: Uuid, expected_version: i64) -> Result<(), RepositoryError> {
        self.orders.delete_versioned(id, expected_version).await
    }
}

pub struct InMemoryUserRepository {
    users: Table<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self { users: Table::new() }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: User) -> Result<User, RepositoryError> {
        self.users.save(user).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.find_by_id(id).await)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, RepositoryError> {
        Ok(self.users.find_all(page).await)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.users.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{LineItem, Milk, Size};
    use std::num::NonZeroU32;

    fn latte() -> LineItem {
        LineItem::new("Latte", NonZeroU32::new(1).unwrap(), Milk::Whole, Size::Medium)
    }

    #[tokio::test]
    async fn test_save_assigns_identity() {
        let repo = InMemoryOrderRepository::new();

        let saved = repo.save(Order::with_items(vec![latte()])).await.unwrap();
        let id = saved.id().expect("id assigned");
        assert_eq!(saved.version(), 0);

        let loaded = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemoryOrderRepository::new();
        let mut order = repo.save(Order::default()).await.unwrap();

        order.mark_paid().unwrap();
        let order = repo.save(order).await.unwrap();

        assert_eq!(order.version(), 1);
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        let saved = repo.save(Order::default()).await.unwrap();

        let mut first = saved.clone();
        let mut second = saved;
        first.mark_paid().unwrap();
        second.mark_paid().unwrap();

        repo.save(first).await.unwrap();
        let err = repo.save(second).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::VersionConflict { expected: 0, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_line_items_violate_constraint() {
        let repo = InMemoryOrderRepository::new();

        let err = repo
            .save(Order::with_items(vec![latte(), latte()]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let repo = InMemoryOrderRepository::new();
        let first = repo.save(Order::default()).await.unwrap();
        let mut second = repo.save(Order::default()).await.unwrap();
        second.mark_paid().unwrap();
        let second = repo.save(second).await.unwrap();

        let expected = repo.find_by_status(OrderStatus::PaymentExpected).await.unwrap();
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].id(), first.id());

        let paid = repo.find_by_status(OrderStatus::Paid).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id(), second.id());

        assert!(repo.find_by_status(OrderStatus::Taken).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_all_pages_in_creation_order() {
        let repo = InMemoryOrderRepository::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(repo.save(Order::default()).await.unwrap().id());
        }

        let page = repo.find_all(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages(), 3);
        let page_ids: Vec<_> = page.content.iter().map(Order::id).collect();
        assert_eq!(page_ids, ids[2..4].to_vec());

        let beyond = repo.find_all(PageRequest::new(9, 2)).await.unwrap();
        assert!(beyond.content.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryOrderRepository::new();
        let id = repo.save(Order::default()).await.unwrap().id().unwrap();

        repo.delete_by_id(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_by_id(id).await,
            Err(RepositoryError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_versioned_delete_keeps_newer_order() {
        let repo = InMemoryOrderRepository::new();
        let mut order = repo.save(Order::default()).await.unwrap();
        let id = order.id().unwrap();

        order.mark_paid().unwrap();
        repo.save(order).await.unwrap();

        assert!(matches!(
            repo.delete_versioned(id, 0).await,
            Err(RepositoryError::VersionConflict { expected: 0, actual: 1 })
        ));
        assert!(repo.find_by_id(id).await.unwrap().is_some());

        repo.delete_versioned(id, 1).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_versioned(id, 1).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_of_deleted_order_is_not_found() {
        let repo = InMemoryOrderRepository::new();
        let mut order = repo.save(Order::default()).await.unwrap();
        repo.delete_by_id(order.id().unwrap()).await.unwrap();

        order.mark_paid().unwrap();
        assert!(matches!(repo.save(order).await, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_user_repository() {
        let repo = InMemoryUserRepository::new();
        let mut user = repo.save(User::new("alice", "pw").unwrap()).await.unwrap();
        assert_eq!(user.version(), 0);

        user.set_password("changed");
        let user = repo.save(user).await.unwrap();
        assert_eq!(user.version(), 1);

        let page = repo.find_all(PageRequest::new(0, 20)).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].password(), "changed");
    }
}
