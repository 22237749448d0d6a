use crate::Database;
use crate::models::SearchRow;
use anyhow::Result;

impl Database {
    /// Substring search over tools owned by members of the viewer's groups,
    /// excluding the viewer's own tools and honoring per-group visibility.
    /// Owner/group/category names come back from the same query to avoid
    /// N+1 lookups. SQLite LIKE is case-insensitive for ASCII.
    pub fn search_tools(&self, viewer_id: &str, query: &str, limit: u32) -> Result<Vec<SearchRow>> {
        // The escape character itself must be escaped first
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.description, c.name, t.status,
                        t.owner_id, p.display_name,
                        GROUP_CONCAT(g.name, char(31))
                 FROM tools t
                 JOIN profiles p ON p.user_id = t.owner_id
                 JOIN tool_categories c ON c.id = t.category_id
                 JOIN group_members gm_o ON gm_o.user_id = t.owner_id
                 JOIN group_members gm_v ON gm_v.group_id = gm_o.group_id
                                        AND gm_v.user_id = ?1
                 JOIN groups g ON g.id = gm_o.group_id
                 WHERE t.owner_id != ?1
                   AND (NOT EXISTS (SELECT 1 FROM tool_group_visibility v
                                     WHERE v.tool_id = t.id)
                        OR EXISTS (SELECT 1 FROM tool_group_visibility v
                                    WHERE v.tool_id = t.id
                                      AND v.group_id = gm_o.group_id))
                   AND (t.name LIKE ?2 ESCAPE '\\'
                        OR t.description LIKE ?2 ESCAPE '\\'
                        OR c.name LIKE ?2 ESCAPE '\\')
                 GROUP BY t.id
                 ORDER BY t.name
                 LIMIT ?3",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![viewer_id, pattern, limit], |row| {
                    let group_names: Option<String> = row.get(7)?;
                    Ok(SearchRow {
                        tool_id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        category: row.get(3)?,
                        status: row.get(4)?,
                        owner_id: row.get(5)?,
                        owner_name: row.get(6)?,
                        // Unit separator: group names may contain commas
                        group_names: group_names
                            .unwrap_or_default()
                            .split('\u{1f}')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::testutil::{db, seed_tool, seed_user};

    fn setup() -> crate::Database {
        let db = db();
        seed_user(&db, "owner", "owner@example.com", "Olive Owner");
        seed_user(&db, "viewer", "viewer@example.com", "Vera Viewer");
        db.create_group("g1", "Smith, Sons & Co", None, false, "owner")
            .unwrap();
        db.add_member("g1", "viewer", "member").unwrap();
        db
    }

    #[test]
    fn like_wildcards_and_backslash_match_literally() {
        let db = setup();
        seed_tool(&db, "t1", "owner", "100% cotton rag");
        seed_tool(&db, "t2", "owner", "Rags, assorted");
        seed_tool(&db, "t3", "owner", "a\\b test jig");

        let hits = db.search_tools("viewer", "100%", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tool_id, "t1");

        let hits = db.search_tools("viewer", "a\\b", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tool_id, "t3");
    }

    #[test]
    fn group_names_with_commas_survive_aggregation() {
        let db = setup();
        seed_tool(&db, "t1", "owner", "Belt sander");

        let hits = db.search_tools("viewer", "sander", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].group_names, vec!["Smith, Sons & Co"]);
    }
}
