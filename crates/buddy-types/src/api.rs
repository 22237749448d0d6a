use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GroupMember, HistoryEntry, ToolRequest};
use crate::status::{GroupRole, ToolStatus};

// -- JWT Claims --

/// JWT claims validated by the auth middleware and injected as a request
/// extension. Canonical definition lives here in buddy-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub token: String,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeRoleRequest {
    pub role: GroupRole,
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    pub group: crate::models::Group,
    pub members: Vec<GroupMember>,
}

// -- Invites --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInviteRequest {
    /// Omit for a general (link) invite usable by anyone with the code.
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInviteResponse {
    pub code: String,
}

// -- Tools --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateToolRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub brand: Option<String>,
    pub power_source: Option<String>,
    pub condition: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateToolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<ToolStatus>,
    pub brand: Option<String>,
    pub power_source: Option<String>,
    pub condition: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetVisibilityRequest {
    /// Groups the tool is visible in. Empty means visible in all of the
    /// owner's groups.
    pub group_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBorrowRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmReturnRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    pub request: ToolRequest,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct MarkOverdueResponse {
    pub marked: usize,
}

// -- Search --

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub tool_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: ToolStatus,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub group_names: Vec<String>,
}

// -- Analysis proxies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeImageRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolAnalysis {
    pub tool_name: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailRequest {
    pub image_path: String,
    pub bucket: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThumbnailResponse {
    pub thumb: String,
    pub medium: String,
    pub full: String,
}
