use crate::Database;
use crate::models::InviteRow;
use crate::queries::OptionalExt;
use anyhow::Result;
use tracing::warn;

/// Outcome of an invite acceptance attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AcceptInvite {
    Joined { group_id: String },
    AlreadyMember,
    WrongEmail,
}

impl Database {
    /// Store an invite. `email` is the target address for a personal invite
    /// or '*' for a general link invite.
    pub fn create_invite(
        &self,
        code: &str,
        group_id: &str,
        email: &str,
        invited_by: &str,
        expires_at: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO group_invites (code, group_id, email, invited_by, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![code, group_id, email, invited_by, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn get_invite(&self, code: &str) -> Result<Option<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.code, i.group_id, g.name, i.email, i.invited_by, p.display_name,
                        i.expires_at, i.created_at
                 FROM group_invites i
                 JOIN groups g ON g.id = i.group_id
                 JOIN profiles p ON p.user_id = i.invited_by
                 WHERE i.code = ?1",
            )?;

            let row = stmt
                .query_row([code], |row| {
                    Ok(InviteRow {
                        code: row.get(0)?,
                        group_id: row.get(1)?,
                        group_name: row.get(2)?,
                        email: row.get(3)?,
                        invited_by: row.get(4)?,
                        inviter_name: row.get(5)?,
                        expires_at: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    pub fn delete_invite(&self, code: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM group_invites WHERE code = ?1", [code])?;
            Ok(deleted == 1)
        })
    }

    /// Accept an invite: verify the caller may use it, insert a `member`
    /// membership row, then consume the invite when it is personal. General
    /// ('*') invites are never deleted and stay reusable. The check-then-insert
    /// is best-effort, not atomic; the UNIQUE membership key backstops races.
    pub fn accept_invite(
        &self,
        invite: &InviteRow,
        user_id: &str,
        user_email: &str,
    ) -> Result<AcceptInvite> {
        if !invite.is_general() && !invite.email.eq_ignore_ascii_case(user_email) {
            return Ok(AcceptInvite::WrongEmail);
        }

        if self.get_member_role(&invite.group_id, user_id)?.is_some() {
            return Ok(AcceptInvite::AlreadyMember);
        }

        if !self.add_member(&invite.group_id, user_id, "member")? {
            // Raced with another acceptance of the same user
            return Ok(AcceptInvite::AlreadyMember);
        }

        if !invite.is_general() {
            if let Err(e) = self.delete_invite(&invite.code) {
                warn!("Failed to consume invite {}: {}", invite.code, e);
            }
        }

        Ok(AcceptInvite::Joined {
            group_id: invite.group_id.clone(),
        })
    }

    pub fn list_invites_for_group(&self, group_id: &str) -> Result<Vec<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.code, i.group_id, g.name, i.email, i.invited_by, p.display_name,
                        i.expires_at, i.created_at
                 FROM group_invites i
                 JOIN groups g ON g.id = i.group_id
                 JOIN profiles p ON p.user_id = i.invited_by
                 WHERE i.group_id = ?1
                 ORDER BY i.created_at DESC",
            )?;

            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(InviteRow {
                        code: row.get(0)?,
                        group_id: row.get(1)?,
                        group_name: row.get(2)?,
                        email: row.get(3)?,
                        invited_by: row.get(4)?,
                        inviter_name: row.get(5)?,
                        expires_at: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil::{db, seed_user};

    fn setup() -> crate::Database {
        let db = db();
        seed_user(&db, "creator", "creator@example.com", "Cleo Creator");
        seed_user(&db, "joiner", "joiner@example.com", "Jo Joiner");
        seed_user(&db, "other", "other@example.com", "Otto Other");
        db.create_group("g1", "Shed Collective", None, false, "creator")
            .unwrap();
        db
    }

    #[test]
    fn personal_invite_consumed_exactly_once() {
        let db = setup();
        db.create_invite("code-1", "g1", "joiner@example.com", "creator", None)
            .unwrap();

        let invite = db.get_invite("code-1").unwrap().unwrap();
        assert!(!invite.is_general());

        let outcome = db
            .accept_invite(&invite, "joiner", "joiner@example.com")
            .unwrap();
        assert_eq!(
            outcome,
            AcceptInvite::Joined {
                group_id: "g1".into()
            }
        );

        // Invite row is gone, exactly one membership was created
        assert!(db.get_invite("code-1").unwrap().is_none());
        assert_eq!(
            db.get_member_role("g1", "joiner").unwrap().as_deref(),
            Some("member")
        );
        assert_eq!(db.list_members("g1").unwrap().len(), 2); // creator + joiner
    }

    #[test]
    fn accepting_twice_does_not_duplicate_membership() {
        let db = setup();
        db.create_invite("code-1", "g1", "joiner@example.com", "creator", None)
            .unwrap();

        let invite = db.get_invite("code-1").unwrap().unwrap();
        db.accept_invite(&invite, "joiner", "joiner@example.com")
            .unwrap();

        // Second accept against the stale invite row (two-tabs scenario)
        let again = db
            .accept_invite(&invite, "joiner", "joiner@example.com")
            .unwrap();
        assert_eq!(again, AcceptInvite::AlreadyMember);
        assert_eq!(db.list_members("g1").unwrap().len(), 2);
    }

    #[test]
    fn personal_invite_rejects_other_email() {
        let db = setup();
        db.create_invite("code-1", "g1", "joiner@example.com", "creator", None)
            .unwrap();

        let invite = db.get_invite("code-1").unwrap().unwrap();
        let outcome = db
            .accept_invite(&invite, "other", "other@example.com")
            .unwrap();
        assert_eq!(outcome, AcceptInvite::WrongEmail);

        // Not consumed
        assert!(db.get_invite("code-1").unwrap().is_some());
        assert!(db.get_member_role("g1", "other").unwrap().is_none());
    }

    #[test]
    fn general_invite_stays_reusable() {
        let db = setup();
        db.create_invite("link-1", "g1", "*", "creator", None).unwrap();

        let invite = db.get_invite("link-1").unwrap().unwrap();
        assert!(invite.is_general());

        let first = db
            .accept_invite(&invite, "joiner", "joiner@example.com")
            .unwrap();
        assert_eq!(
            first,
            AcceptInvite::Joined {
                group_id: "g1".into()
            }
        );

        // Still present and usable by the next person
        let invite = db.get_invite("link-1").unwrap().unwrap();
        let second = db
            .accept_invite(&invite, "other", "other@example.com")
            .unwrap();
        assert_eq!(
            second,
            AcceptInvite::Joined {
                group_id: "g1".into()
            }
        );
        assert_eq!(db.list_members("g1").unwrap().len(), 3);
    }
}
