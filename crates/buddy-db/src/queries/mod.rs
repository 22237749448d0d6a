mod groups;
mod invites;
mod notifications;
mod requests;
mod search;
mod tools;
mod users;

pub use invites::AcceptInvite;

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn seed_user(db: &Database, id: &str, email: &str, name: &str) {
        db.create_user(id, email, "argon2-hash", name).unwrap();
    }

    pub fn seed_tool(db: &Database, id: &str, owner_id: &str, name: &str) {
        db.create_tool(id, owner_id, name, None, 1, None, None, None, None)
            .unwrap();
    }
}
