use crate::Database;
use crate::models::ToolRow;
use crate::queries::OptionalExt;
use anyhow::Result;

const TOOL_SELECT: &str = "SELECT t.id, t.owner_id, p.display_name, t.name, t.description,
        c.name, t.status, t.brand, t.power_source, t.condition, t.image_path, t.created_at
 FROM tools t
 JOIN profiles p ON p.user_id = t.owner_id
 JOIN tool_categories c ON c.id = t.category_id";

impl Database {
    pub fn get_category_id(&self, name: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM tool_categories WHERE name = ?1 COLLATE NOCASE",
                    [name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn list_categories(&self) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM tool_categories ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_tool(
        &self,
        id: &str,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        category_id: i64,
        brand: Option<&str>,
        power_source: Option<&str>,
        condition: Option<&str>,
        image_path: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tools (id, owner_id, name, description, category_id,
                                    brand, power_source, condition, image_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    owner_id,
                    name,
                    description,
                    category_id,
                    brand,
                    power_source,
                    condition,
                    image_path
                ],
            )?;
            Ok(())
        })
    }

    /// Partial update: absent fields keep their current value.
    #[allow(clippy::too_many_arguments)]
    pub fn update_tool(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        category_id: Option<i64>,
        status: Option<&str>,
        brand: Option<&str>,
        power_source: Option<&str>,
        condition: Option<&str>,
        image_path: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE tools SET
                     name         = COALESCE(?2, name),
                     description  = COALESCE(?3, description),
                     category_id  = COALESCE(?4, category_id),
                     status       = COALESCE(?5, status),
                     brand        = COALESCE(?6, brand),
                     power_source = COALESCE(?7, power_source),
                     condition    = COALESCE(?8, condition),
                     image_path   = COALESCE(?9, image_path)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    name,
                    description,
                    category_id,
                    status,
                    brand,
                    power_source,
                    condition,
                    image_path
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn set_tool_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE tools SET status = ?2 WHERE id = ?1",
                (id, status),
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_tool(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM tool_group_visibility WHERE tool_id = ?1", [id])?;
            let deleted = conn.execute("DELETE FROM tools WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }

    pub fn get_tool(&self, id: &str) -> Result<Option<ToolRow>> {
        self.with_conn(|conn| {
            let sql = format!("{TOOL_SELECT} WHERE t.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_tool_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_tools_by_owner(&self, owner_id: &str) -> Result<Vec<ToolRow>> {
        self.with_conn(|conn| {
            let sql = format!("{TOOL_SELECT} WHERE t.owner_id = ?1 ORDER BY t.name");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_tool_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Tools owned by members of the viewer's groups, excluding the viewer's
    /// own. A tool with visibility rows is only shown through those groups;
    /// one without is visible through any shared group.
    pub fn list_visible_tools(&self, viewer_id: &str) -> Result<Vec<ToolRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{TOOL_SELECT}
                 JOIN group_members gm_o ON gm_o.user_id = t.owner_id
                 JOIN group_members gm_v ON gm_v.group_id = gm_o.group_id
                                        AND gm_v.user_id = ?1
                 WHERE t.owner_id != ?1
                   AND (NOT EXISTS (SELECT 1 FROM tool_group_visibility v
                                     WHERE v.tool_id = t.id)
                        OR EXISTS (SELECT 1 FROM tool_group_visibility v
                                    WHERE v.tool_id = t.id
                                      AND v.group_id = gm_o.group_id))
                 GROUP BY t.id
                 ORDER BY t.name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([viewer_id], map_tool_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// True when the viewer can see the tool: they own it, or they share a
    /// group with the owner through which the tool is visible.
    pub fn tool_visible_to(&self, tool_id: &str, viewer_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let visible: bool = conn.query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM tools t WHERE t.id = ?1 AND t.owner_id = ?2
                 ) OR EXISTS (
                     SELECT 1 FROM tools t
                     JOIN group_members gm_o ON gm_o.user_id = t.owner_id
                     JOIN group_members gm_v ON gm_v.group_id = gm_o.group_id
                                            AND gm_v.user_id = ?2
                     WHERE t.id = ?1
                       AND (NOT EXISTS (SELECT 1 FROM tool_group_visibility v
                                         WHERE v.tool_id = t.id)
                            OR EXISTS (SELECT 1 FROM tool_group_visibility v
                                        WHERE v.tool_id = t.id
                                          AND v.group_id = gm_o.group_id))
                 )",
                (tool_id, viewer_id),
                |row| row.get(0),
            )?;
            Ok(visible)
        })
    }

    /// Replace the visibility group set for a tool.
    pub fn set_tool_visibility(&self, tool_id: &str, group_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM tool_group_visibility WHERE tool_id = ?1",
                [tool_id],
            )?;
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO tool_group_visibility (tool_id, group_id)
                 VALUES (?1, ?2)",
            )?;
            for group_id in group_ids {
                stmt.execute((tool_id, group_id))?;
            }
            Ok(())
        })
    }

    pub fn get_tool_visibility(&self, tool_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT group_id FROM tool_group_visibility WHERE tool_id = ?1")?;
            let rows = stmt
                .query_map([tool_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_tool_row(row: &rusqlite::Row<'_>) -> std::result::Result<ToolRow, rusqlite::Error> {
    Ok(ToolRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_name: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        status: row.get(6)?,
        brand: row.get(7)?,
        power_source: row.get(8)?,
        condition: row.get(9)?,
        image_path: row.get(10)?,
        created_at: row.get(11)?,
    })
}
