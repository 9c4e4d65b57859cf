use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::utils::Result;


const MODULE: &str = "STORE";

pub const STORE_POISONED_ERROR: &str = "user store poisoned";


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub role: Role,
}

/// In-memory credential and role maps keyed by username.
///
/// Both maps always hold the same set of usernames.
#[derive(Debug, Default)]
pub struct UserStore {
    passwords: BTreeMap<String, String>,
    roles: BTreeMap<String, Role>,
}

pub type SharedStore = Arc<Mutex<UserStore>>;

impl UserStore {
    pub fn new() -> UserStore {
        UserStore::default()
    }

    /// Store with the two built-in accounts
    pub fn seeded() -> UserStore {
        let mut store = UserStore::new();
        store.upsert("admin", "adminpass", Role::Admin);
        store.upsert("user", "userpass", Role::User);
        store
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.passwords.get(username).map_or(false, |p| p == password)
    }

    /// Insert the user or replace its password and role
    pub fn upsert(&mut self, username: &str, password: &str, role: Role) {
        self.passwords.insert(username.to_string(), password.to_string());
        self.roles.insert(username.to_string(), role);
    }

    /// Returns false when the user does not exist
    pub fn remove(&mut self, username: &str) -> bool {
        let existed = self.passwords.remove(username).is_some();
        self.roles.remove(username);
        existed
    }

    pub fn contains(&self, username: &str) -> bool {
        self.passwords.contains_key(username)
    }

    pub fn role(&self, username: &str) -> Option<Role> {
        self.roles.get(username).copied()
    }

    /// Users ordered by name
    pub fn list(&self) -> Vec<User> {
        self.roles.iter().map(|(name, role)| User { username: name.clone(), role: *role }).collect()
    }

    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// Both maps hold exactly the same usernames
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        self.passwords.keys().eq(self.roles.keys())
    }
}

pub fn lock(store: &SharedStore) -> Result<MutexGuard<'_, UserStore>> {
    store.lock().map_err(|e| {
        error!("[{}] Lock failed: {}", MODULE, e);
        STORE_POISONED_ERROR
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_accounts_authenticate_only_with_their_password() {
        let store = UserStore::seeded();
        assert!(store.authenticate("admin", "adminpass"));
        assert!(store.authenticate("user", "userpass"));
        for wrong in ["", "wrong", "userpass", "ADMINPASS", "adminpass "] {
            assert!(!store.authenticate("admin", wrong), "admin accepted `{}`", wrong);
        }
        assert!(!store.authenticate("nobody", "adminpass"));
        assert_eq!(store.role("admin"), Some(Role::Admin));
        assert_eq!(store.role("user"), Some(Role::User));
    }

    #[test]
    fn upsert_replaces_password_and_role() {
        let mut store = UserStore::seeded();
        store.upsert("admin", "new", Role::User);
        assert!(!store.authenticate("admin", "adminpass"));
        assert!(store.authenticate("admin", "new"));
        assert_eq!(store.role("admin"), Some(Role::User));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_clears_both_maps() {
        let mut store = UserStore::seeded();
        assert!(store.remove("user"));
        assert!(!store.contains("user"));
        assert_eq!(store.role("user"), None);
        assert!(!store.authenticate("user", "userpass"));
        assert!(!store.remove("user"));
        assert_eq!(store.list(), vec![User { username: "admin".to_string(), role: Role::Admin }]);
    }

    #[test]
    fn list_is_sorted_by_username() {
        let mut store = UserStore::new();
        assert_eq!(store.len(), 0);
        store.upsert("zed", "1", Role::User);
        store.upsert("bob", "2", Role::User);
        let names: Vec<String> = store.list().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["bob", "zed"]);
    }

    #[test]
    fn shared_store_locks() {
        let shared = UserStore::seeded().shared();
        lock(&shared).unwrap().upsert("bob", "x", Role::User);
        assert!(lock(&shared).unwrap().authenticate("bob", "x"));
        assert!(lock(&shared).unwrap().is_consistent());
    }
}
