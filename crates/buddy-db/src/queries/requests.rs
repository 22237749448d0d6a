use crate::Database;
use crate::models::{HistoryRow, OverdueRow, RequestRow};
use crate::queries::OptionalExt;
use anyhow::Result;
use buddy_types::status::RequestStatus;

const REQUEST_SELECT: &str =
    "SELECT r.id, r.tool_id, t.name, r.borrower_id, pb.display_name,
        t.owner_id, po.display_name, r.status, r.start_date, r.end_date, r.message,
        r.picked_up_at, r.returned_at, r.return_notes, r.created_at
 FROM tool_requests r
 JOIN tools t ON t.id = r.tool_id
 JOIN profiles pb ON pb.user_id = r.borrower_id
 JOIN profiles po ON po.user_id = t.owner_id";

impl Database {
    pub fn create_request(
        &self,
        id: &str,
        tool_id: &str,
        borrower_id: &str,
        start_date: &str,
        end_date: &str,
        message: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tool_requests (id, tool_id, borrower_id, start_date, end_date, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, tool_id, borrower_id, start_date, end_date, message],
            )?;
            Ok(())
        })
    }

    pub fn get_request(&self, id: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| {
            let sql = format!("{REQUEST_SELECT} WHERE r.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_request_row).optional()?;
            Ok(row)
        })
    }

    /// Requests against tools the user owns.
    pub fn list_requests_incoming(&self, owner_id: &str) -> Result<Vec<RequestRow>> {
        self.with_conn(|conn| {
            let sql =
                format!("{REQUEST_SELECT} WHERE t.owner_id = ?1 ORDER BY r.created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Requests the user made as borrower.
    pub fn list_requests_outgoing(&self, borrower_id: &str) -> Result<Vec<RequestRow>> {
        self.with_conn(|conn| {
            let sql =
                format!("{REQUEST_SELECT} WHERE r.borrower_id = ?1 ORDER BY r.created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([borrower_id], map_request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Guarded single-row transition: the UPDATE only applies while the row
    /// is still in a state that may reach `to` per
    /// [`RequestStatus::sources_of`], so a concurrent second actor (or a
    /// double-click) finds zero affected rows and gets `false` back instead
    /// of silently overwriting.
    pub fn transition_request(&self, id: &str, to: RequestStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let (guard, from) = source_guard(to, 3);
            if from.is_empty() {
                // pending is set at creation, overdue only by the sweep
                return Ok(false);
            }
            let sql = format!(
                "UPDATE tool_requests SET status = ?2 WHERE id = ?1 AND status IN ({guard})"
            );

            let to_str = to.as_str();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&id, &to_str];
            for s in &from {
                params.push(s);
            }

            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed == 1)
        })
    }

    /// approved → picked_up, stamping picked_up_at in the same statement.
    pub fn confirm_pickup(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let (guard, from) = source_guard(RequestStatus::PickedUp, 2);
            let sql = format!(
                "UPDATE tool_requests
                 SET status = 'picked_up', picked_up_at = datetime('now')
                 WHERE id = ?1 AND status IN ({guard})"
            );

            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&id];
            for s in &from {
                params.push(s);
            }

            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed == 1)
        })
    }

    /// return_pending (or overdue) → returned, stamping returned_at and the
    /// owner's notes.
    pub fn confirm_return(&self, id: &str, notes: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let (guard, from) = source_guard(RequestStatus::Returned, 3);
            let sql = format!(
                "UPDATE tool_requests
                 SET status = 'returned', returned_at = datetime('now'), return_notes = ?2
                 WHERE id = ?1 AND status IN ({guard})"
            );

            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&id, &notes];
            for s in &from {
                params.push(s);
            }

            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed == 1)
        })
    }

    /// The mark_overdue_requests routine: flip every request whose end date
    /// has passed and which is not returned (and not already overdue).
    /// Returns the flipped rows so callers can notify both parties.
    pub fn mark_overdue(&self) -> Result<Vec<OverdueRow>> {
        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, t.name, r.borrower_id, t.owner_id
                 FROM tool_requests r
                 JOIN tools t ON t.id = r.tool_id
                 WHERE r.end_date < date('now')
                   AND r.status NOT IN ('returned', 'overdue')",
            )?;
            let due = stmt
                .query_map([], |row| {
                    Ok(OverdueRow {
                        request_id: row.get(0)?,
                        tool_name: row.get(1)?,
                        borrower_id: row.get(2)?,
                        owner_id: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            for row in &due {
                conn.execute(
                    "UPDATE tool_requests SET status = 'overdue'
                     WHERE id = ?1 AND status NOT IN ('returned', 'overdue')",
                    [&row.request_id],
                )?;
            }

            Ok(due)
        })
    }

    // -- History --

    pub fn insert_history(
        &self,
        id: &str,
        request_id: &str,
        actor_id: Option<&str>,
        event: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tool_history (id, request_id, actor_id, event, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, request_id, actor_id, event, notes],
            )?;
            Ok(())
        })
    }

    pub fn list_history(&self, request_id: &str) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, request_id, actor_id, event, notes, created_at
                 FROM tool_history
                 WHERE request_id = ?1
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([request_id], |row| {
                    Ok(HistoryRow {
                        id: row.get(0)?,
                        request_id: row.get(1)?,
                        actor_id: row.get(2)?,
                        event: row.get(3)?,
                        notes: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// IN-clause placeholders (numbered from `first`) and bind values for the
/// states allowed to transition into `to`.
fn source_guard(to: RequestStatus, first: usize) -> (String, Vec<&'static str>) {
    let from: Vec<&'static str> = RequestStatus::sources_of(to)
        .into_iter()
        .map(RequestStatus::as_str)
        .collect();
    let placeholders: Vec<String> = (first..first + from.len())
        .map(|i| format!("?{i}"))
        .collect();
    (placeholders.join(", "), from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil::{db, seed_tool, seed_user};
    use chrono::{Days, Utc};

    fn setup() -> crate::Database {
        let db = db();
        seed_user(&db, "owner", "owner@example.com", "Olive Owner");
        seed_user(&db, "borrower", "borrower@example.com", "Bram Borrower");
        seed_tool(&db, "drill", "owner", "Cordless Drill");
        db
    }

    fn seed_request(db: &crate::Database, id: &str, end_date: &str) {
        db.create_request(id, "drill", "borrower", "2026-01-01", end_date, None)
            .unwrap();
    }

    fn status_of(db: &crate::Database, id: &str) -> String {
        db.get_request(id).unwrap().unwrap().status
    }

    #[test]
    fn approve_from_pending_then_reject_second_approve() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        let first = db.transition_request("r1", RequestStatus::Approved).unwrap();
        assert!(first);
        assert_eq!(status_of(&db, "r1"), "approved");

        // Double-click / second tab: guard finds no pending row
        let second = db.transition_request("r1", RequestStatus::Approved).unwrap();
        assert!(!second);
        assert_eq!(status_of(&db, "r1"), "approved");
    }

    #[test]
    fn deny_rejected_once_approved() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        db.transition_request("r1", RequestStatus::Approved).unwrap();

        let denied = db.transition_request("r1", RequestStatus::Denied).unwrap();
        assert!(!denied);
        assert_eq!(status_of(&db, "r1"), "approved");
    }

    #[test]
    fn pickup_return_chain_enforces_order() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        // Pickup requires approved
        assert!(!db.confirm_pickup("r1").unwrap());

        db.transition_request("r1", RequestStatus::Approved).unwrap();
        assert!(db.confirm_pickup("r1").unwrap());

        let row = db.get_request("r1").unwrap().unwrap();
        assert_eq!(row.status, "picked_up");
        assert!(row.picked_up_at.is_some());

        // Return confirmation requires return_pending (or overdue)
        assert!(!db.confirm_return("r1", None).unwrap());

        assert!(
            db.transition_request("r1", RequestStatus::ReturnPending)
                .unwrap()
        );
        assert!(db.confirm_return("r1", Some("scratched handle")).unwrap());

        let row = db.get_request("r1").unwrap().unwrap();
        assert_eq!(row.status, "returned");
        assert!(row.returned_at.is_some());
        assert_eq!(row.return_notes.as_deref(), Some("scratched handle"));
    }

    #[test]
    fn cancel_allowed_from_pending_and_approved_only() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        db.transition_request("r1", RequestStatus::Approved).unwrap();
        db.confirm_pickup("r1").unwrap();

        let canceled = db.transition_request("r1", RequestStatus::Canceled).unwrap();
        assert!(!canceled);
        assert_eq!(status_of(&db, "r1"), "picked_up");
    }

    #[test]
    fn overdue_sweep_flips_past_due_unreturned() {
        let db = setup();
        let yesterday = (Utc::now().date_naive() - Days::new(1)).to_string();

        seed_request(&db, "past_pending", &yesterday);
        seed_request(&db, "future", "2099-01-01");
        seed_request(&db, "past_returned", &yesterday);

        // Walk past_returned to returned first
        db.transition_request("past_returned", RequestStatus::Approved)
            .unwrap();
        db.confirm_pickup("past_returned").unwrap();
        db.transition_request("past_returned", RequestStatus::ReturnPending)
            .unwrap();
        db.confirm_return("past_returned", None).unwrap();

        let flipped = db.mark_overdue().unwrap();
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].request_id, "past_pending");

        assert_eq!(status_of(&db, "past_pending"), "overdue");
        assert_eq!(status_of(&db, "future"), "pending");
        assert_eq!(status_of(&db, "past_returned"), "returned");

        // Idempotent: already-overdue rows are not flipped again
        assert!(db.mark_overdue().unwrap().is_empty());
    }

    #[test]
    fn overdue_request_can_be_returned_directly() {
        let db = setup();
        let yesterday = (Utc::now().date_naive() - Days::new(1)).to_string();
        seed_request(&db, "r1", &yesterday);

        db.transition_request("r1", RequestStatus::Approved).unwrap();
        db.confirm_pickup("r1").unwrap();
        db.mark_overdue().unwrap();
        assert_eq!(status_of(&db, "r1"), "overdue");

        // Owner confirms the late hand-back without a return_pending hop
        assert!(db.confirm_return("r1", Some("returned late")).unwrap());
        assert_eq!(status_of(&db, "r1"), "returned");
    }

    #[test]
    fn overdue_is_not_a_user_transition() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        assert!(!db.transition_request("r1", RequestStatus::Overdue).unwrap());
        assert_eq!(status_of(&db, "r1"), "pending");
    }

    #[test]
    fn history_is_ordered_per_request() {
        let db = setup();
        seed_request(&db, "r1", "2099-01-01");

        db.insert_history("h1", "r1", Some("borrower"), "requested", None)
            .unwrap();
        db.insert_history("h2", "r1", Some("owner"), "approved", None)
            .unwrap();

        let history = db.list_history("r1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event, "requested");
        assert_eq!(history[1].event, "approved");
    }
}

fn map_request_row(row: &rusqlite::Row<'_>) -> std::result::Result<RequestRow, rusqlite::Error> {
    Ok(RequestRow {
        id: row.get(0)?,
        tool_id: row.get(1)?,
        tool_name: row.get(2)?,
        borrower_id: row.get(3)?,
        borrower_name: row.get(4)?,
        owner_id: row.get(5)?,
        owner_name: row.get(6)?,
        status: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        message: row.get(10)?,
        picked_up_at: row.get(11)?,
        returned_at: row.get(12)?,
        return_notes: row.get(13)?,
        created_at: row.get(14)?,
    })
}
