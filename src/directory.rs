//! Process-wide user directory and authorized-identity store.
//!
//! One explicit handle, created at startup and passed by `Arc` into the
//! authorization gate, the Teams strategy, and the card synthesizer.
//! Per-key updates are atomic under the lock; writers win in order.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use crate::bus::BotUser;

#[derive(Default)]
struct Inner {
    users: HashMap<String, BotUser>,
    /// tenant id → authorized object ids.
    authorized: HashMap<String, BTreeSet<String>>,
}

/// In-memory directory of known users and authorized identities.
#[derive(Default)]
pub struct UserDirectory {
    inner: RwLock<Inner>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a user record, keyed by channel id.
    ///
    /// Fields the incoming record doesn't know (name, tenant, object
    /// id) keep their previous values, so a sparse activity can't
    /// erase what an earlier, richer one established.
    pub fn upsert_user(&self, user: BotUser) -> BotUser {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        let merged = match inner.users.get(&user.id) {
            Some(existing) => BotUser {
                id: user.id.clone(),
                name: user.name.or_else(|| existing.name.clone()),
                tenant_id: user.tenant_id.or_else(|| existing.tenant_id.clone()),
                object_id: user.object_id.or_else(|| existing.object_id.clone()),
            },
            None => user,
        };
        inner.users.insert(merged.id.clone(), merged.clone());
        merged
    }

    pub fn get(&self, id: &str) -> Option<BotUser> {
        self.inner
            .read()
            .expect("directory lock poisoned")
            .users
            .get(id)
            .cloned()
    }

    /// Look a user up by id, falling back to display name.
    pub fn resolve(&self, key: &str) -> Option<BotUser> {
        let inner = self.inner.read().expect("directory lock poisoned");
        if let Some(user) = inner.users.get(key) {
            return Some(user.clone());
        }
        inner
            .users
            .values()
            .find(|u| u.name.as_deref() == Some(key))
            .cloned()
    }

    /// Seed the authorized set for `tenant`, once. Later calls for a
    /// tenant that already has a set are ignored.
    pub fn seed_admins(&self, tenant: &str, object_ids: &[String]) -> bool {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        if inner.authorized.contains_key(tenant) {
            return false;
        }
        inner
            .authorized
            .insert(tenant.to_string(), object_ids.iter().cloned().collect());
        true
    }

    /// Add one identity to a tenant's authorized set.
    pub fn authorize(&self, tenant: &str, object_id: &str) {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        inner
            .authorized
            .entry(tenant.to_string())
            .or_default()
            .insert(object_id.to_string());
    }

    /// Whether `object_id` is authorized for any tenant.
    pub fn is_authorized(&self, object_id: &str) -> bool {
        self.inner
            .read()
            .expect("directory lock poisoned")
            .authorized
            .values()
            .any(|set| set.contains(object_id))
    }

    /// All authorized object ids, de-duplicated and sorted.
    pub fn admin_object_ids(&self) -> Vec<String> {
        let inner = self.inner.read().expect("directory lock poisoned");
        let mut ids: BTreeSet<&String> = BTreeSet::new();
        for set in inner.authorized.values() {
            ids.extend(set.iter());
        }
        ids.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> BotUser {
        BotUser {
            id: id.to_string(),
            name: Some(format!("name-{id}")),
            tenant_id: None,
            object_id: None,
        }
    }

    #[test]
    fn upsert_merges_sparse_updates() {
        let dir = UserDirectory::new();
        dir.upsert_user(BotUser {
            object_id: Some("obj1".into()),
            tenant_id: Some("t1".into()),
            ..user("u1")
        });
        // A later activity without the object id must not erase it.
        let merged = dir.upsert_user(BotUser {
            id: "u1".into(),
            name: Some("Alice".into()),
            tenant_id: None,
            object_id: None,
        });
        assert_eq!(merged.name.as_deref(), Some("Alice"));
        assert_eq!(merged.object_id.as_deref(), Some("obj1"));
        assert_eq!(merged.tenant_id.as_deref(), Some("t1"));
    }

    #[test]
    fn resolve_falls_back_to_name() {
        let dir = UserDirectory::new();
        dir.upsert_user(user("u1"));
        assert_eq!(dir.resolve("u1").unwrap().id, "u1");
        assert_eq!(dir.resolve("name-u1").unwrap().id, "u1");
        assert!(dir.resolve("nobody").is_none());
    }

    #[test]
    fn seed_is_first_writer_only() {
        let dir = UserDirectory::new();
        assert!(dir.seed_admins("t1", &["a".into(), "b".into()]));
        assert!(!dir.seed_admins("t1", &["c".into()]));
        assert!(dir.is_authorized("a"));
        assert!(!dir.is_authorized("c"));
    }

    #[test]
    fn admin_ids_span_tenants_sorted() {
        let dir = UserDirectory::new();
        dir.seed_admins("t1", &["b".into()]);
        dir.authorize("t2", "a");
        dir.authorize("t2", "b");
        assert_eq!(dir.admin_object_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
