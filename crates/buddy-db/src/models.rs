//! Database row types — these map directly to SQLite rows.
//! Distinct from the buddy-types API models to keep the DB layer independent;
//! IDs and timestamps stay TEXT here and are parsed at the API boundary.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub created_at: String,
}

pub struct PreferencesRow {
    pub user_id: String,
    pub email_notifications: bool,
    pub overdue_reminders: bool,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub created_by: String,
    pub created_at: String,
    pub member_count: u32,
    pub my_role: Option<String>,
}

pub struct MemberRow {
    pub user_id: String,
    pub display_name: String,
    pub role: String,
    pub joined_at: String,
}

pub struct InviteRow {
    pub code: String,
    pub group_id: String,
    pub group_name: String,
    /// '*' means a general link invite.
    pub email: String,
    pub invited_by: String,
    pub inviter_name: String,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl InviteRow {
    pub fn is_general(&self) -> bool {
        self.email == "*"
    }
}

pub struct ToolRow {
    pub id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub brand: Option<String>,
    pub power_source: Option<String>,
    pub condition: Option<String>,
    pub image_path: Option<String>,
    pub created_at: String,
}

pub struct RequestRow {
    pub id: String,
    pub tool_id: String,
    pub tool_name: String,
    pub borrower_id: String,
    pub borrower_name: String,
    pub owner_id: String,
    pub owner_name: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub message: Option<String>,
    pub picked_up_at: Option<String>,
    pub returned_at: Option<String>,
    pub return_notes: Option<String>,
    pub created_at: String,
}

pub struct HistoryRow {
    pub id: String,
    pub request_id: String,
    pub actor_id: Option<String>,
    pub event: String,
    pub notes: Option<String>,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub request_id: Option<String>,
    pub group_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

pub struct SearchRow {
    pub tool_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub owner_id: String,
    pub owner_name: String,
    /// Names of the shared groups the tool is visible through.
    pub group_names: Vec<String>,
}

/// A request flipped to overdue by the sweep, with both parties to notify.
pub struct OverdueRow {
    pub request_id: String,
    pub tool_name: String,
    pub borrower_id: String,
    pub owner_id: String,
}
