//! CRUD operations for [`Identity`] records.

use pulse_shared::{Identity, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{on_read, on_write, Result};

impl Database {
    /// Register an identity. Fails with `Conflict` if the id is taken.
    pub fn insert_identity(&self, identity: &Identity) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO identities (id, display_name, avatar_ref) VALUES (?1, ?2, ?3)",
                params![identity.id.as_str(), identity.display_name, identity.avatar_ref],
            )
            .map_err(on_write)?;
        Ok(())
    }

    pub fn get_identity(&self, id: &UserId) -> Result<Identity> {
        self.conn()
            .query_row(
                "SELECT id, display_name, avatar_ref FROM identities WHERE id = ?1",
                params![id.as_str()],
                row_to_identity,
            )
            .map_err(on_read)
    }

    /// All identities, ordered by display name.
    pub fn list_identities(&self) -> Result<Vec<Identity>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, display_name, avatar_ref
             FROM identities
             ORDER BY display_name COLLATE NOCASE ASC, id ASC",
        )?;
        let rows = stmt.query_map([], row_to_identity)?;

        let mut identities = Vec::new();
        for row in rows {
            identities.push(row?);
        }
        Ok(identities)
    }
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    let id: String = row.get(0)?;
    Ok(Identity {
        id: UserId(id),
        display_name: row.get(1)?,
        avatar_ref: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn insert_then_list_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        let zed = Identity::generate("zed");
        let ada = Identity::generate("Ada");
        db.insert_identity(&zed).unwrap();
        db.insert_identity(&ada).unwrap();

        let all = db.list_identities().unwrap();
        assert_eq!(all, vec![ada.clone(), zed]);
        assert_eq!(db.get_identity(&ada.id).unwrap(), ada);
    }

    #[test]
    fn duplicate_id_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        let id = Identity::generate("Ada");
        db.insert_identity(&id).unwrap();
        assert!(matches!(db.insert_identity(&id), Err(StoreError::Conflict)));
    }

    #[test]
    fn missing_identity_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_identity(&UserId::from("usr-nobody")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
