use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::{
    normalize_email, Cents, OperationType, Statement, StatementId, User, UserId,
};

use super::{StatementsRepository, StorageError, StorageResult, UsersRepository};

fn read<T>(lock: &RwLock<T>) -> StorageResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned").into())
}

fn write<T>(lock: &RwLock<T>) -> StorageResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| anyhow::anyhow!("in-memory store lock poisoned").into())
}

#[derive(Default)]
struct UserTable {
    arena: Vec<Option<User>>,
    by_id: HashMap<UserId, usize>,
    by_email: HashMap<String, usize>,
}

impl UserTable {
    fn get(&self, slot: Option<&usize>) -> Option<User> {
        slot.and_then(|&i| self.arena[i].clone())
    }
}

/// In-memory user store: an arena of records indexed by id and email.
/// Deleted users leave a tombstone so indexes never shift.
#[derive(Default)]
pub struct InMemoryUsersRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn create(&self, name: &str, email: &str, password_hash: &str) -> StorageResult<User> {
        let mut table = write(&self.table)?;

        let email = normalize_email(email);
        if table.by_email.contains_key(&email) {
            return Err(StorageError::DuplicateEmail(email));
        }

        let user = User::new(name, email, password_hash);
        let slot = table.arena.len();
        table.arena.push(Some(user.clone()));
        table.by_id.insert(user.id, slot);
        table.by_email.insert(user.email.clone(), slot);
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let table = read(&self.table)?;
        Ok(table.get(table.by_email.get(&normalize_email(email))))
    }

    async fn find_by_id(&self, id: UserId) -> StorageResult<Option<User>> {
        let table = read(&self.table)?;
        Ok(table.get(table.by_id.get(&id)))
    }

    async fn delete(&self, id: UserId) -> StorageResult<bool> {
        let mut table = write(&self.table)?;

        let Some(slot) = table.by_id.remove(&id) else {
            return Ok(false);
        };
        if let Some(user) = table.arena[slot].take() {
            table.by_email.remove(&user.email);
        }
        Ok(true)
    }

    async fn list(&self) -> StorageResult<Vec<User>> {
        let table = read(&self.table)?;
        Ok(table.arena.iter().flatten().cloned().collect())
    }
}

#[derive(Default)]
struct StatementTable {
    arena: Vec<Statement>,
    by_id: HashMap<StatementId, usize>,
    by_user: HashMap<UserId, Vec<usize>>,
}

/// In-memory append-only statement store.
#[derive(Default)]
pub struct InMemoryStatementsRepository {
    table: RwLock<StatementTable>,
}

impl InMemoryStatementsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatementsRepository for InMemoryStatementsRepository {
    async fn create(
        &self,
        user_id: UserId,
        kind: OperationType,
        amount_cents: Cents,
        description: &str,
    ) -> StorageResult<Statement> {
        let statement = Statement::new(user_id, kind, amount_cents, description);

        let mut table = write(&self.table)?;
        let slot = table.arena.len();
        table.arena.push(statement.clone());
        table.by_id.insert(statement.id, slot);
        table.by_user.entry(user_id).or_default().push(slot);
        Ok(statement)
    }

    async fn find_by_id(&self, id: StatementId) -> StorageResult<Option<Statement>> {
        let table = read(&self.table)?;
        Ok(table.by_id.get(&id).map(|&i| table.arena[i].clone()))
    }

    async fn list_by_user(&self, user_id: UserId) -> StorageResult<Vec<Statement>> {
        let table = read(&self.table)?;
        Ok(table
            .by_user
            .get(&user_id)
            .map(|slots| slots.iter().map(|&i| table.arena[i].clone()).collect())
            .unwrap_or_default())
    }
}
