//! Cached mapping of every known user identity.

use std::collections::HashMap;

use pulse_shared::{Identity, UserId};

#[derive(Debug, Default, Clone)]
pub struct Directory {
    identities: HashMap<UserId, Identity>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole directory with a fresh listing.
    pub fn replace_all(&mut self, identities: Vec<Identity>) {
        self.identities = identities
            .into_iter()
            .map(|identity| (identity.id.clone(), identity))
            .collect();
    }

    pub fn upsert(&mut self, identity: Identity) {
        self.identities.insert(identity.id.clone(), identity);
    }

    pub fn get(&self, id: &UserId) -> Option<&Identity> {
        self.identities.get(id)
    }

    pub fn display_name(&self, id: &UserId) -> Option<&str> {
        self.get(id).map(|identity| identity.display_name.as_str())
    }

    /// Every identity, ordered by display name.
    pub fn list_all(&self) -> Vec<Identity> {
        let mut all: Vec<Identity> = self.identities.values().cloned().collect();
        all.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn clear(&mut self) {
        self.identities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_drops_stale_entries() {
        let mut directory = Directory::new();
        let old = Identity::generate("Old");
        directory.upsert(old.clone());

        let ada = Identity::generate("ada");
        let bob = Identity::generate("Bob");
        directory.replace_all(vec![bob.clone(), ada.clone()]);

        assert!(directory.get(&old.id).is_none());
        assert_eq!(directory.list_all(), vec![ada.clone(), bob]);
        assert_eq!(directory.display_name(&ada.id), Some("ada"));
    }
}
