use crate::Database;
use crate::models::{PreferencesRow, ProfileRow, UserRow};
use crate::queries::OptionalExt;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Create the auth row and its profile together.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            tx.execute(
                "INSERT INTO profiles (user_id, display_name) VALUES (?1, ?2)",
                (id, display_name),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, email, password, created_at FROM users WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.user_id, u.email, p.display_name, p.bio, p.avatar_path, p.created_at
                 FROM profiles p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.user_id = ?1",
            )?;
            let row = stmt
                .query_row([user_id], |row| {
                    Ok(ProfileRow {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        bio: row.get(3)?,
                        avatar_path: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Partial update: absent fields keep their current value.
    pub fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar_path: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET
                     display_name = COALESCE(?2, display_name),
                     bio          = COALESCE(?3, bio),
                     avatar_path  = COALESCE(?4, avatar_path)
                 WHERE user_id = ?1",
                rusqlite::params![user_id, display_name, bio, avatar_path],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Preferences --

    /// Insert default preferences if missing, then read back.
    pub fn get_or_create_preferences(&self, user_id: &str) -> Result<PreferencesRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_preferences (user_id) VALUES (?1)",
                [user_id],
            )?;
            let row = conn.query_row(
                "SELECT user_id, email_notifications, overdue_reminders, created_at
                 FROM user_preferences WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(PreferencesRow {
                        user_id: row.get(0)?,
                        email_notifications: row.get(1)?,
                        overdue_reminders: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )?;
            Ok(row)
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, password, created_at FROM users WHERE email = ?1")?;

    let row = stmt
        .query_row([email], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}
