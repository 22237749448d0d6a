use crate::Database;
use crate::models::{GroupRow, MemberRow};
use crate::queries::OptionalExt;
use anyhow::Result;
use tracing::warn;

impl Database {
    /// Create a group and its creator-admin membership.
    ///
    /// The two inserts are not wrapped in a transaction; if the membership
    /// insert fails the group row is removed best-effort so no orphan group
    /// lingers.
    pub fn create_group(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        is_private: bool,
        created_by: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO groups (id, name, description, is_private, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, description, is_private, created_by],
            )?;

            let member = conn.execute(
                "INSERT INTO group_members (group_id, user_id, role) VALUES (?1, ?2, 'admin')",
                (id, created_by),
            );

            if let Err(e) = member {
                warn!("Creator membership insert failed for group {}: {}", id, e);
                if let Err(e) = conn.execute("DELETE FROM groups WHERE id = ?1", [id]) {
                    warn!("Orphan group cleanup failed for {}: {}", id, e);
                }
                return Err(e.into());
            }

            Ok(())
        })
    }

    pub fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.description, g.is_private, g.created_by, g.created_at,
                        (SELECT COUNT(*) FROM group_members c WHERE c.group_id = g.id),
                        gm.role
                 FROM groups g
                 JOIN group_members gm ON gm.group_id = g.id AND gm.user_id = ?1
                 ORDER BY g.name",
            )?;

            let rows = stmt
                .query_map([user_id], map_group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Fetch one group, with the viewer's role if they are a member.
    pub fn get_group(&self, group_id: &str, viewer_id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.description, g.is_private, g.created_by, g.created_at,
                        (SELECT COUNT(*) FROM group_members c WHERE c.group_id = g.id),
                        (SELECT role FROM group_members m
                          WHERE m.group_id = g.id AND m.user_id = ?2)
                 FROM groups g
                 WHERE g.id = ?1",
            )?;

            let row = stmt
                .query_row((group_id, viewer_id), map_group_row)
                .optional()?;

            Ok(row)
        })
    }

    pub fn list_members(&self, group_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT gm.user_id, p.display_name, gm.role, gm.joined_at
                 FROM group_members gm
                 JOIN profiles p ON p.user_id = gm.user_id
                 WHERE gm.group_id = ?1
                 ORDER BY gm.joined_at",
            )?;

            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                        role: row.get(2)?,
                        joined_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// The caller's role in a group, None if not a member.
    pub fn get_member_role(&self, group_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let role = conn
                .query_row(
                    "SELECT role FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                    (group_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(role)
        })
    }

    /// Admin role or group creator counts as admin.
    pub fn is_group_admin(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let admin: bool = conn.query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM group_members
                      WHERE group_id = ?1 AND user_id = ?2 AND role = 'admin'
                 ) OR EXISTS (
                     SELECT 1 FROM groups WHERE id = ?1 AND created_by = ?2
                 )",
                (group_id, user_id),
                |row| row.get(0),
            )?;
            Ok(admin)
        })
    }

    /// Insert a membership row; the UNIQUE key makes a duplicate accept a
    /// no-op. Returns true when a row was actually inserted.
    pub fn add_member(&self, group_id: &str, user_id: &str, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, role)
                 VALUES (?1, ?2, ?3)",
                (group_id, user_id, role),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn remove_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                (group_id, user_id),
            )?;
            Ok(removed == 1)
        })
    }

    pub fn set_member_role(&self, group_id: &str, user_id: &str, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE group_members SET role = ?3 WHERE group_id = ?1 AND user_id = ?2",
                (group_id, user_id, role),
            )?;
            Ok(changed == 1)
        })
    }

    /// Delete a group and its dependent rows.
    pub fn delete_group(&self, group_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM tool_group_visibility WHERE group_id = ?1",
                [group_id],
            )?;
            conn.execute("DELETE FROM group_invites WHERE group_id = ?1", [group_id])?;
            conn.execute("DELETE FROM group_members WHERE group_id = ?1", [group_id])?;
            conn.execute("DELETE FROM groups WHERE id = ?1", [group_id])?;
            Ok(())
        })
    }
}

fn map_group_row(row: &rusqlite::Row<'_>) -> std::result::Result<GroupRow, rusqlite::Error> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_private: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        member_count: row.get(6)?,
        my_role: row.get(7)?,
    })
}
