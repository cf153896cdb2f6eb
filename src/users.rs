//! Uid to user-name resolution with a per-sampler cache.

use ahash::AHashMap as HashMap;
use nix::unistd::{Uid, User};
use std::sync::Arc;
use tracing::debug;

/// Cache of user names keyed by uid. Entities hold clones of the shared
/// name; lookups that fail are cached as well.
#[derive(Debug, Default)]
pub struct UsersTable {
    names: HashMap<u32, Option<Arc<str>>>,
}

impl UsersTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a name without touching the system user database.
    pub fn insert(&mut self, uid: u32, name: &str) {
        self.names.insert(uid, Some(Arc::from(name)));
    }

    /// Shared reference to the user name for `uid`.
    pub fn get_ref(&mut self, uid: u32) -> Option<Arc<str>> {
        self.names
            .entry(uid)
            .or_insert_with(|| lookup_user_name(uid))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn lookup_user_name(uid: u32) -> Option<Arc<str>> {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Some(Arc::from(user.name.as_str())),
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to look up user for uid {}: {}", uid, e);
            None
        }
    }
}
