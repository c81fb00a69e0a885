//! Todo items with two-phase deletion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hearth_types::{require_non_empty, AccountId, Actor, IdSequence, TodoId, TodoItem};

use crate::codec::{LoadStatus, SnapshotFile, SnapshotState};
use crate::durable::DurableStore;
use crate::error::{PersistResult, StoreError, StoreResult};
use crate::flush::FlushTrigger;
use crate::policy::todo_access;
use crate::traits::{AccountDirectory, Flush};

const ENTITY: &str = "todo";

/// Persisted todos collection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TodosState {
    todos: Vec<TodoItem>,
    next_id: IdSequence,
}

impl TodosState {
    /// Items in creation order, including soft-deleted ones.
    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    /// The id the next created item receives.
    pub fn next_id(&self) -> u64 {
        self.next_id.peek()
    }

    /// Index of `id`, checked against the actor's rights.
    fn authorized_index(&self, actor: &Actor, id: TodoId) -> StoreResult<usize> {
        let index = self
            .todos
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id.get()))?;
        if !todo_access(actor, &self.todos[index]).is_allowed() {
            return Err(StoreError::forbidden(ENTITY, id.get()));
        }
        Ok(index)
    }

    fn visible<'a>(&'a self, actor: &'a Actor) -> impl Iterator<Item = &'a TodoItem> + 'a {
        self.todos
            .iter()
            .filter(move |t| todo_access(actor, t).is_allowed())
    }
}

impl SnapshotState for TodosState {
    const KIND: &'static str = "todos";

    fn reconcile(&mut self) {
        for todo in &self.todos {
            self.next_id.observe(todo.id.get());
        }
    }
}

/// Todo store.
///
/// Non-administrators see and mutate only their own items; administrators
/// see and mutate everyone's. Hard deletion is permitted only on items that
/// were marked deleted first.
pub struct TodoStore {
    store: DurableStore<TodosState>,
    directory: Arc<dyn AccountDirectory>,
}

impl TodoStore {
    pub fn open(file: SnapshotFile, directory: Arc<dyn AccountDirectory>) -> (Self, LoadStatus) {
        let (store, status) = DurableStore::open(file);
        (Self { store, directory }, status)
    }

    pub fn in_memory(directory: Arc<dyn AccountDirectory>) -> Self {
        Self {
            store: DurableStore::in_memory(TodosState::default()),
            directory,
        }
    }

    /// Create an open item owned by `owner`.
    pub fn create(&self, owner: AccountId, title: &str) -> StoreResult<TodoItem> {
        require_non_empty("title", title)?;
        let owner_name = self.directory.display_name_or_unknown(owner);

        let item = self.store.mutate(|s| {
            let id = TodoId::new(s.next_id.allocate()?);
            let item = TodoItem::new(id, owner, owner_name, title);
            s.todos.push(item.clone());
            Ok(item)
        })?;
        debug!(todo = %item.id, owner = %owner, "todo created");
        Ok(item)
    }

    /// Items visible to `actor`, in creation order. Soft-deleted items are
    /// included only when `include_deleted` is set.
    pub fn list(&self, actor: &Actor, include_deleted: bool) -> Vec<TodoItem> {
        self.store.read(|s| {
            s.visible(actor)
                .filter(|t| include_deleted || !t.deleted)
                .cloned()
                .collect()
        })
    }

    /// Soft-deleted items visible to `actor`.
    pub fn list_archived(&self, actor: &Actor) -> Vec<TodoItem> {
        self.store
            .read(|s| s.visible(actor).filter(|t| t.deleted).cloned().collect())
    }

    pub fn get(&self, actor: &Actor, id: TodoId) -> StoreResult<TodoItem> {
        self.store
            .read(|s| s.authorized_index(actor, id).map(|i| s.todos[i].clone()))
    }

    /// Flip the completed flag.
    pub fn toggle(&self, actor: &Actor, id: TodoId) -> StoreResult<TodoItem> {
        self.store.mutate(|s| {
            let i = s.authorized_index(actor, id)?;
            s.todos[i].toggle();
            Ok(s.todos[i].clone())
        })
    }

    /// Soft delete: sets both the deleted and completed flags.
    pub fn mark_deleted(&self, actor: &Actor, id: TodoId) -> StoreResult<TodoItem> {
        self.store.mutate(|s| {
            let i = s.authorized_index(actor, id)?;
            s.todos[i].mark_deleted();
            Ok(s.todos[i].clone())
        })
    }

    /// Remove a soft-deleted item, returning it. Remaining items keep their
    /// relative order.
    pub fn delete(&self, actor: &Actor, id: TodoId) -> StoreResult<TodoItem> {
        let removed = self.store.mutate(|s| {
            let i = s.authorized_index(actor, id)?;
            if !s.todos[i].deleted {
                return Err(StoreError::InvalidState {
                    entity: ENTITY,
                    id: id.get(),
                });
            }
            Ok(s.todos.remove(i))
        })?;
        debug!(todo = %removed.id, actor = %actor.account_id, "todo removed");
        Ok(removed)
    }

    /// Total items, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.store.read(|s| s.todos.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot_path(&self) -> Option<&std::path::Path> {
        self.store.snapshot_path()
    }
}

impl Flush for TodoStore {
    fn label(&self) -> &'static str {
        TodosState::KIND
    }

    fn flush(&self) -> PersistResult<()> {
        self.store.flush()
    }

    fn flush_trigger(&self) -> FlushTrigger {
        self.store.trigger().clone()
    }
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;
    use std::collections::HashMap;

    struct Names(HashMap<AccountId, String>);

    impl AccountDirectory for Names {
        fn display_name(&self, id: AccountId) -> Option<String> {
            self.0.get(&id).cloned()
        }
    }

    fn directory() -> Arc<dyn AccountDirectory> {
        Arc::new(Names(HashMap::from([
            (AccountId::new(1), "admin".to_string()),
            (AccountId::new(2), "alice".to_string()),
            (AccountId::new(3), "bob".to_string()),
        ])))
    }

    fn admin() -> Actor {
        Actor::admin(AccountId::new(1), "admin")
    }
    fn alice() -> Actor {
        Actor::member(AccountId::new(2), "alice")
    }
    fn bob() -> Actor {
        Actor::member(AccountId::new(3), "bob")
    }

    #[test]
    fn create_denormalizes_owner_name() {
        let store = TodoStore::in_memory(directory());
        let t = store.create(AccountId::new(2), "buy milk").unwrap();
        assert_eq!(t.id, TodoId::new(1));
        assert_eq!(t.owner_name, "alice");
        assert!(!t.completed && !t.deleted);

        let orphan = store.create(AccountId::new(42), "lost").unwrap();
        assert_eq!(orphan.owner_name, "unknown");
    }

    #[test]
    fn blank_title_is_rejected() {
        let store = TodoStore::in_memory(directory());
        let err = store.create(AccountId::new(2), "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.is_empty());
    }

    #[test]
    fn toggle_owner_admin_and_stranger() {
        let store = TodoStore::in_memory(directory());
        let t1 = store.create(alice().account_id, "T1").unwrap();

        let err = store.toggle(&bob(), t1.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let toggled = store.toggle(&admin(), t1.id).unwrap();
        assert!(toggled.completed);

        let toggled = store.toggle(&alice(), t1.id).unwrap();
        assert!(!toggled.completed);
    }

    #[test]
    fn missing_item_is_not_found() {
        let store = TodoStore::in_memory(directory());
        assert_eq!(
            store.toggle(&alice(), TodoId::new(9)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.get(&admin(), TodoId::new(9)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn hard_delete_requires_soft_delete() {
        let store = TodoStore::in_memory(directory());
        let t = store.create(alice().account_id, "x").unwrap();

        let err = store.delete(&alice(), t.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.len(), 1);

        let marked = store.mark_deleted(&alice(), t.id).unwrap();
        assert!(marked.deleted && marked.completed);

        let removed = store.delete(&alice(), t.id).unwrap();
        assert_eq!(removed.id, t.id);
        assert!(store.is_empty());
        assert_eq!(
            store.delete(&alice(), t.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn stranger_cannot_delete() {
        let store = TodoStore::in_memory(directory());
        let t = store.create(alice().account_id, "x").unwrap();
        store.mark_deleted(&alice(), t.id).unwrap();
        assert_eq!(
            store.delete(&bob(), t.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert!(store.delete(&admin(), t.id).is_ok());
    }

    #[test]
    fn listing_views() {
        let store = TodoStore::in_memory(directory());
        let a1 = store.create(alice().account_id, "a1").unwrap();
        let a2 = store.create(alice().account_id, "a2").unwrap();
        let b1 = store.create(bob().account_id, "b1").unwrap();
        store.mark_deleted(&alice(), a1.id).unwrap();

        let ids = |v: Vec<TodoItem>| v.into_iter().map(|t| t.id).collect::<Vec<_>>();

        assert_eq!(ids(store.list(&alice(), false)), vec![a2.id]);
        assert_eq!(ids(store.list(&alice(), true)), vec![a1.id, a2.id]);
        assert_eq!(ids(store.list_archived(&alice())), vec![a1.id]);
        assert_eq!(ids(store.list(&bob(), true)), vec![b1.id]);
        assert_eq!(ids(store.list(&admin(), false)), vec![a2.id, b1.id]);
        assert_eq!(ids(store.list_archived(&bob())), Vec::<TodoId>::new());
    }

    #[test]
    fn returned_items_are_copies() {
        let store = TodoStore::in_memory(directory());
        let t = store.create(alice().account_id, "x").unwrap();
        let mut copy = store.get(&alice(), t.id).unwrap();
        copy.title = "changed".into();
        assert_eq!(store.get(&alice(), t.id).unwrap().title, "x");
    }

    #[test]
    fn delete_preserves_order() {
        let store = TodoStore::in_memory(directory());
        let ids: Vec<_> = (0..4)
            .map(|i| store.create(alice().account_id, &format!("t{i}")).unwrap().id)
            .collect();
        store.mark_deleted(&alice(), ids[1]).unwrap();
        store.delete(&alice(), ids[1]).unwrap();
        let remaining: Vec<_> = store.list(&alice(), true).into_iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn reload_resumes_counter() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("todos.json"));

        let (store, _) = TodoStore::open(file.clone(), directory());
        let t1 = store.create(alice().account_id, "one").unwrap();
        let t2 = store.create(alice().account_id, "two").unwrap();
        store.mark_deleted(&alice(), t2.id).unwrap();
        store.delete(&alice(), t2.id).unwrap();
        store.flush().unwrap();

        let (reopened, status) = TodoStore::open(file, directory());
        assert!(matches!(status, LoadStatus::Loaded { .. }));
        assert_eq!(reopened.list(&alice(), true), vec![t1]);
        // The id of the removed item is never reused.
        let t3 = reopened.create(alice().account_id, "three").unwrap();
        assert_eq!(t3.id, TodoId::new(3));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Create), (0usize..16).prop_map(Op::Remove)]
    }

    proptest! {
        #[test]
        fn ids_strictly_increase_and_never_repeat(ops in proptest::collection::vec(op(), 1..64)) {
            let store = TodoStore::in_memory(directory());
            let mut issued: Vec<TodoId> = Vec::new();
            for op in ops {
                match op {
                    Op::Create => {
                        let t = store.create(alice().account_id, "x").unwrap();
                        if let Some(last) = issued.last() {
                            prop_assert!(t.id > *last);
                        }
                        issued.push(t.id);
                    }
                    Op::Remove(n) => {
                        let live = store.list(&alice(), true);
                        if !live.is_empty() {
                            let target = live[n % live.len()].id;
                            store.mark_deleted(&alice(), target).unwrap();
                            store.delete(&alice(), target).unwrap();
                        }
                    }
                }
            }
        }
    }
}
