//! Privileged session registry
//!
//! A connected client becomes privileged by presenting the operator
//! password once. Credentials are compared as SHA-256 digests; privileged
//! status lasts until the client disconnects.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

fn digest(credential: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    hasher.finalize().into()
}

pub struct SessionRegistry {
    /// Digest of the operator password; privileged login disabled when `None`
    password_digest: Option<[u8; 32]>,
    privileged: RwLock<HashSet<Uuid>>,
}

impl SessionRegistry {
    pub fn new(admin_password: Option<&str>) -> Self {
        Self {
            password_digest: admin_password.map(digest),
            privileged: RwLock::new(HashSet::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password_digest.is_some()
    }

    /// Mark `client` privileged if `credential` matches
    pub fn authenticate(&self, client: Uuid, credential: &str) -> bool {
        let Some(expected) = &self.password_digest else {
            warn!(%client, "Privileged login attempted but no admin password is configured");
            return false;
        };

        if digest(credential) != *expected {
            warn!(%client, "Privileged login failed");
            return false;
        }

        self.privileged
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client);
        info!(%client, "Client authenticated as privileged");
        true
    }

    pub fn is_privileged(&self, client: Uuid) -> bool {
        self.privileged
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&client)
    }

    pub fn remove(&self, client: Uuid) {
        self.privileged
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&client);
    }
}
