//! Row → API model conversion. SQLite hands back TEXT ids and timestamps;
//! corrupt values are logged and replaced with defaults rather than failing
//! the whole response.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use buddy_db::models::{
    GroupRow, HistoryRow, InviteRow, MemberRow, NotificationRow, PreferencesRow, ProfileRow,
    RequestRow, SearchRow, ToolRow,
};
use buddy_types::api::SearchResult;
use buddy_types::models::{
    Group, GroupMember, HistoryEntry, Invite, Notification, Profile, Tool, ToolRequest,
    UserPreferences,
};
use buddy_types::status::{GroupRole, NotificationKind, RequestStatus, ToolStatus};

pub(crate) fn parse_uuid(value: &str, field: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(value: &str, field: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", field, value, e);
            DateTime::default()
        })
}

pub(crate) fn parse_date(value: &str, field: &str) -> NaiveDate {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, value, e);
        NaiveDate::default()
    })
}

fn parse_request_status(value: &str) -> RequestStatus {
    value.parse().unwrap_or_else(|e| {
        warn!("{}", e);
        RequestStatus::Pending
    })
}

fn parse_tool_status(value: &str) -> ToolStatus {
    value.parse().unwrap_or_else(|e| {
        warn!("{}", e);
        ToolStatus::Unavailable
    })
}

fn parse_role(value: &str) -> GroupRole {
    value.parse().unwrap_or_else(|e| {
        warn!("{}", e);
        GroupRole::Member
    })
}

fn parse_kind(value: &str) -> NotificationKind {
    match value {
        "request_created" => NotificationKind::RequestCreated,
        "request_approved" => NotificationKind::RequestApproved,
        "request_denied" => NotificationKind::RequestDenied,
        "request_canceled" => NotificationKind::RequestCanceled,
        "request_picked_up" => NotificationKind::RequestPickedUp,
        "return_initiated" => NotificationKind::ReturnInitiated,
        "return_confirmed" => NotificationKind::ReturnConfirmed,
        "request_overdue" => NotificationKind::RequestOverdue,
        "invite_accepted" => NotificationKind::InviteAccepted,
        other => {
            warn!("Unknown notification kind '{}'", other);
            NotificationKind::RequestCreated
        }
    }
}

pub(crate) fn profile_from_row(row: ProfileRow) -> Profile {
    Profile {
        user_id: parse_uuid(&row.user_id, "user_id"),
        email: row.email,
        display_name: row.display_name,
        bio: row.bio,
        avatar_path: row.avatar_path,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn preferences_from_row(row: PreferencesRow) -> UserPreferences {
    UserPreferences {
        user_id: parse_uuid(&row.user_id, "user_id"),
        email_notifications: row.email_notifications,
        overdue_reminders: row.overdue_reminders,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn group_from_row(row: GroupRow) -> Group {
    Group {
        id: parse_uuid(&row.id, "group id"),
        name: row.name,
        description: row.description,
        is_private: row.is_private,
        created_by: parse_uuid(&row.created_by, "created_by"),
        created_at: parse_ts(&row.created_at, "created_at"),
        member_count: row.member_count,
        my_role: row.my_role.as_deref().map(parse_role),
    }
}

pub(crate) fn member_from_row(row: MemberRow) -> GroupMember {
    GroupMember {
        user_id: parse_uuid(&row.user_id, "user_id"),
        display_name: row.display_name,
        role: parse_role(&row.role),
        joined_at: parse_ts(&row.joined_at, "joined_at"),
    }
}

pub(crate) fn invite_from_row(row: InviteRow) -> Invite {
    let email = if row.is_general() {
        None
    } else {
        Some(row.email.clone())
    };
    Invite {
        code: row.code,
        group_id: parse_uuid(&row.group_id, "group_id"),
        group_name: row.group_name,
        invited_by: parse_uuid(&row.invited_by, "invited_by"),
        inviter_name: row.inviter_name,
        email,
        expires_at: row.expires_at.as_deref().map(|v| parse_ts(v, "expires_at")),
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn tool_from_row(row: ToolRow) -> Tool {
    Tool {
        id: parse_uuid(&row.id, "tool id"),
        owner_id: parse_uuid(&row.owner_id, "owner_id"),
        owner_name: row.owner_name,
        name: row.name,
        description: row.description,
        category: row.category,
        status: parse_tool_status(&row.status),
        brand: row.brand,
        power_source: row.power_source,
        condition: row.condition,
        image_path: row.image_path,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn request_from_row(row: RequestRow) -> ToolRequest {
    ToolRequest {
        id: parse_uuid(&row.id, "request id"),
        tool_id: parse_uuid(&row.tool_id, "tool_id"),
        tool_name: row.tool_name,
        borrower_id: parse_uuid(&row.borrower_id, "borrower_id"),
        borrower_name: row.borrower_name,
        owner_id: parse_uuid(&row.owner_id, "owner_id"),
        owner_name: row.owner_name,
        status: parse_request_status(&row.status),
        start_date: parse_date(&row.start_date, "start_date"),
        end_date: parse_date(&row.end_date, "end_date"),
        message: row.message,
        picked_up_at: row
            .picked_up_at
            .as_deref()
            .map(|v| parse_ts(v, "picked_up_at")),
        returned_at: row
            .returned_at
            .as_deref()
            .map(|v| parse_ts(v, "returned_at")),
        return_notes: row.return_notes,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn history_from_row(row: HistoryRow) -> HistoryEntry {
    HistoryEntry {
        id: parse_uuid(&row.id, "history id"),
        request_id: parse_uuid(&row.request_id, "request_id"),
        actor_id: row.actor_id.as_deref().map(|v| parse_uuid(v, "actor_id")),
        event: row.event,
        notes: row.notes,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn notification_from_row(row: NotificationRow) -> Notification {
    Notification {
        id: parse_uuid(&row.id, "notification id"),
        kind: parse_kind(&row.kind),
        title: row.title,
        body: row.body,
        request_id: row
            .request_id
            .as_deref()
            .map(|v| parse_uuid(v, "request_id")),
        group_id: row.group_id.as_deref().map(|v| parse_uuid(v, "group_id")),
        read: row.is_read,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

pub(crate) fn search_from_row(row: SearchRow) -> SearchResult {
    SearchResult {
        tool_id: parse_uuid(&row.tool_id, "tool id"),
        name: row.name,
        description: row.description,
        category: row.category,
        status: parse_tool_status(&row.status),
        owner_id: parse_uuid(&row.owner_id, "owner_id"),
        owner_name: row.owner_name,
        group_names: row.group_names,
    }
}
