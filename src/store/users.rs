//! The per-process user store.
//!
//! A `UserStore` is a plain owned collection. Each worker holds exactly one and
//! shares it between request handlers and the replication applier behind a
//! single lock, so every operation below runs to completion without another
//! task observing a half-applied state.

use uuid::Uuid;

use crate::store::user::{NewUser, User, UserPatch};

/// Insertion-ordered collection of users with unique ids.
///
/// Lookups are linear. The dataset is small and is shipped whole to every
/// worker on each mutation, so ordering and cheap snapshots matter more than
/// indexed access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all users in insertion order.
    pub fn all(&self) -> &[User] {
        &self.users
    }

    /// Looks up a user by id.
    pub fn get(&self, id: &Uuid) -> Option<&User> {
        self.users.iter().find(|user| user.id == *id)
    }

    /// Stores a new user under a freshly generated id and returns it.
    pub fn insert(&mut self, new_user: NewUser) -> User {
        let mut id = Uuid::new_v4();
        while self.get(&id).is_some() {
            id = Uuid::new_v4();
        }

        let user = new_user.into_user(id);
        self.users.push(user.clone());
        user
    }

    /// Applies `patch` to the user with the given id.
    ///
    /// Returns the updated record, or `None` if no such user exists.
    pub fn update(&mut self, id: &Uuid, patch: UserPatch) -> Option<User> {
        let user = self.users.iter_mut().find(|user| user.id == *id)?;
        user.apply(patch);
        Some(user.clone())
    }

    /// Removes the user with the given id, preserving the order of the rest.
    pub fn remove(&mut self, id: &Uuid) -> Option<User> {
        let index = self.users.iter().position(|user| user.id == *id)?;
        Some(self.users.remove(index))
    }

    /// Copies out the complete collection for replication.
    pub fn snapshot(&self) -> Vec<User> {
        self.users.clone()
    }

    /// Replaces the entire contents with `users`. This is an overwrite, not a merge.
    pub fn replace_all(&mut self, users: Vec<User>) {
        self.users = users;
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if the store holds no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn new_user(name: &str, age: i64) -> NewUser {
        NewUser {
            username: name.to_string(),
            age: Number::from(age),
            hobbies: vec![],
        }
    }

    #[test]
    fn test_store_creation() {
        let store = UserStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = UserStore::new();
        let user = store.insert(new_user("Bob", 54));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&user.id), Some(&user));
        assert_eq!(user.id.get_version_num(), 4);
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut store = UserStore::new();
        let a = store.insert(new_user("A", 1));
        let b = store.insert(new_user("B", 2));
        let c = store.insert(new_user("C", 3));

        let ids: Vec<_> = store.all().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_update_existing() {
        let mut store = UserStore::new();
        let user = store.insert(new_user("Bob", 54));

        let updated = store
            .update(
                &user.id,
                UserPatch {
                    age: Some(Number::from(55)),
                    ..UserPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.username, "Bob");
        assert_eq!(updated.age, Number::from(55));
        assert_eq!(store.get(&user.id), Some(&updated));
    }

    #[test]
    fn test_update_missing() {
        let mut store = UserStore::new();
        assert!(store.update(&Uuid::new_v4(), UserPatch::default()).is_none());
    }

    #[test]
    fn test_remove() {
        let mut store = UserStore::new();
        let a = store.insert(new_user("A", 1));
        let b = store.insert(new_user("B", 2));
        let c = store.insert(new_user("C", 3));

        assert_eq!(store.remove(&b.id), Some(b.clone()));
        assert_eq!(store.remove(&b.id), None);

        let ids: Vec<_> = store.all().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn test_replace_all_overwrites() {
        let mut local = UserStore::new();
        local.insert(new_user("Local", 1));

        let mut remote = UserStore::new();
        remote.insert(new_user("Remote", 2));

        local.replace_all(remote.snapshot());
        assert_eq!(local, remote);
        assert_eq!(local.all()[0].username, "Remote");
    }

    #[test]
    fn test_replace_all_is_idempotent() {
        let mut source = UserStore::new();
        source.insert(new_user("A", 1));
        source.insert(new_user("B", 2));
        let snapshot = source.snapshot();

        let mut replica = UserStore::new();
        replica.replace_all(snapshot.clone());
        let once = replica.clone();
        replica.replace_all(snapshot);

        assert_eq!(replica, once);
    }

    #[test]
    fn test_replace_all_with_empty_clears() {
        let mut store = UserStore::new();
        store.insert(new_user("A", 1));
        store.replace_all(Vec::new());
        assert!(store.is_empty());
    }
}
