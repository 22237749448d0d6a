use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle status of a borrow request.
///
/// User-driven transitions follow [`RequestStatus::next_states`]. The overdue
/// sweep is external to that table: any request whose end date has passed and
/// whose status is not `returned` can be flipped to `overdue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    PickedUp,
    ReturnPending,
    Returned,
    Canceled,
    Overdue,
}

impl RequestStatus {
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Approved,
        Self::Denied,
        Self::PickedUp,
        Self::ReturnPending,
        Self::Returned,
        Self::Canceled,
        Self::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::PickedUp => "picked_up",
            Self::ReturnPending => "return_pending",
            Self::Returned => "returned",
            Self::Canceled => "canceled",
            Self::Overdue => "overdue",
        }
    }

    /// States reachable from `self` through a user action.
    pub fn next_states(self) -> &'static [RequestStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Denied, Self::Canceled],
            Self::Approved => &[Self::PickedUp, Self::Canceled],
            Self::PickedUp => &[Self::ReturnPending],
            Self::ReturnPending => &[Self::Returned],
            // Overdue items can still be handed back.
            Self::Overdue => &[Self::ReturnPending, Self::Returned],
            Self::Denied | Self::Returned | Self::Canceled => &[],
        }
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self.next_states().contains(&next)
    }

    /// Inverse view of [`next_states`](Self::next_states): every state that
    /// may transition into `target` through a user action. Status guards in
    /// the database layer are built from this, so the table above stays the
    /// single source of truth. Empty for `pending` (set at creation) and
    /// `overdue` (set only by the sweep).
    pub fn sources_of(target: RequestStatus) -> Vec<RequestStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.next_states().contains(&target))
            .collect()
    }

    /// Terminal states never leave via a user action.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Returned | Self::Canceled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "denied" => Self::Denied,
            "picked_up" => Self::PickedUp,
            "return_pending" => Self::ReturnPending,
            "returned" => Self::Returned,
            "canceled" => Self::Canceled,
            "overdue" => Self::Overdue,
            other => {
                return Err(ParseStatusError {
                    kind: "request status",
                    value: other.to_string(),
                });
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Available,
    Borrowed,
    Unavailable,
    Damaged,
}

impl ToolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Borrowed => "borrowed",
            Self::Unavailable => "unavailable",
            Self::Damaged => "damaged",
        }
    }
}

impl FromStr for ToolStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "available" => Self::Available,
            "borrowed" => Self::Borrowed,
            "unavailable" => Self::Unavailable,
            "damaged" => Self::Damaged,
            other => {
                return Err(ParseStatusError {
                    kind: "tool status",
                    value: other.to_string(),
                });
            }
        })
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Member,
    Admin,
}

impl GroupRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for GroupRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "member" => Self::Member,
            "admin" => Self::Admin,
            other => {
                return Err(ParseStatusError {
                    kind: "group role",
                    value: other.to_string(),
                });
            }
        })
    }
}

/// Notification kinds, one per lifecycle event that alerts a counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestCreated,
    RequestApproved,
    RequestDenied,
    RequestCanceled,
    RequestPickedUp,
    ReturnInitiated,
    ReturnConfirmed,
    RequestOverdue,
    InviteAccepted,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::RequestApproved => "request_approved",
            Self::RequestDenied => "request_denied",
            Self::RequestCanceled => "request_canceled",
            Self::RequestPickedUp => "request_picked_up",
            Self::ReturnInitiated => "return_initiated",
            Self::ReturnConfirmed => "return_confirmed",
            Self::RequestOverdue => "request_overdue",
            Self::InviteAccepted => "invite_accepted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_and_deny_only_from_pending() {
        for from in [
            RequestStatus::Approved,
            RequestStatus::Denied,
            RequestStatus::PickedUp,
            RequestStatus::ReturnPending,
            RequestStatus::Returned,
            RequestStatus::Canceled,
            RequestStatus::Overdue,
        ] {
            assert!(!from.can_transition_to(RequestStatus::Approved), "{from}");
            assert!(!from.can_transition_to(RequestStatus::Denied), "{from}");
        }
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Denied));
    }

    #[test]
    fn pickup_return_chain() {
        assert!(RequestStatus::Approved.can_transition_to(RequestStatus::PickedUp));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::PickedUp));

        assert!(RequestStatus::PickedUp.can_transition_to(RequestStatus::ReturnPending));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::ReturnPending));

        assert!(RequestStatus::ReturnPending.can_transition_to(RequestStatus::Returned));
        assert!(!RequestStatus::PickedUp.can_transition_to(RequestStatus::Returned));
    }

    #[test]
    fn cancel_only_before_pickup() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Canceled));
        assert!(RequestStatus::Approved.can_transition_to(RequestStatus::Canceled));
        assert!(!RequestStatus::PickedUp.can_transition_to(RequestStatus::Canceled));
        assert!(!RequestStatus::Returned.can_transition_to(RequestStatus::Canceled));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [
            RequestStatus::Denied,
            RequestStatus::Returned,
            RequestStatus::Canceled,
        ] {
            assert!(s.is_terminal());
            assert!(s.next_states().is_empty());
        }
    }

    #[test]
    fn sources_invert_next_states() {
        assert_eq!(
            RequestStatus::sources_of(RequestStatus::Approved),
            vec![RequestStatus::Pending]
        );
        assert_eq!(
            RequestStatus::sources_of(RequestStatus::Canceled),
            vec![RequestStatus::Pending, RequestStatus::Approved]
        );
        assert_eq!(
            RequestStatus::sources_of(RequestStatus::ReturnPending),
            vec![RequestStatus::PickedUp, RequestStatus::Overdue]
        );
        // Overdue items can be confirmed returned without a return_pending hop
        assert_eq!(
            RequestStatus::sources_of(RequestStatus::Returned),
            vec![RequestStatus::ReturnPending, RequestStatus::Overdue]
        );

        // No user action creates pending or overdue rows
        assert!(RequestStatus::sources_of(RequestStatus::Pending).is_empty());
        assert!(RequestStatus::sources_of(RequestStatus::Overdue).is_empty());
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Denied,
            RequestStatus::PickedUp,
            RequestStatus::ReturnPending,
            RequestStatus::Returned,
            RequestStatus::Canceled,
            RequestStatus::Overdue,
        ] {
            assert_eq!(s.as_str().parse::<RequestStatus>().unwrap(), s);
        }
        assert!("shipped".parse::<RequestStatus>().is_err());
    }
}
