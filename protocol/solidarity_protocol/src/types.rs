//! # Types
//!
//! Roles, categories and the three status machines of the network.
//!
//! ## Status as a Finite-State Machine
//!
//! [`ItemStatus`] only moves forward:
//!
//! ```text
//! Available ──reserve──► Reserved ──approve delivery──► Delivered
//! ```
//!
//! [`RequestStatus`] resolves exactly once:
//!
//! ```text
//! Pending ──approve──► Approved
//!    │  └──reject───► Rejected
//!    └──edit/delete──► Pending
//! ```
//!
//! [`EventStatus`] is closed by its organization:
//!
//! ```text
//! Active ──► Finished
//!    └─────► Cancelled
//! ```
//!
//! `Delivered`, `Approved`, `Rejected`, `Finished` and `Cancelled` are terminal.
//!
//! Every enum is persisted as its lowercase name; [`TryFrom<String>`] is the
//! decoding side used when rows are read back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Role a user registers with. Immutable once the user exists.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Beneficiary,
    Organization,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Donor,
        Role::Beneficiary,
        Role::Organization,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::Beneficiary => "beneficiary",
            Self::Organization => "organization",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(Self::Donor),
            "beneficiary" => Ok(Self::Beneficiary),
            "organization" => Ok(Self::Organization),
            "admin" => Ok(Self::Admin),
            other => Err(ProtocolError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Kind of good, shared by items and aid requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Clothing,
    Food,
    Furniture,
    Electronics,
    Books,
    Toys,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "clothing",
            Self::Food => "food",
            Self::Furniture => "furniture",
            Self::Electronics => "electronics",
            Self::Books => "books",
            Self::Toys => "toys",
            Self::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clothing" => Ok(Self::Clothing),
            "food" => Ok(Self::Food),
            "furniture" => Ok(Self::Furniture),
            "electronics" => Ok(Self::Electronics),
            "books" => Ok(Self::Books),
            "toys" => Ok(Self::Toys),
            "other" => Ok(Self::Other),
            other => Err(ProtocolError::validation(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of a donated item.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Listed and claimable.
    Available,
    /// Claimed by a beneficiary; waiting for the donor to confirm delivery.
    Reserved,
    /// Handed over. Terminal.
    Delivered,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Delivered => "delivered",
        }
    }

    /// Whether an item in this status must carry a beneficiary reference.
    pub fn has_beneficiary(&self) -> bool {
        matches!(self, Self::Reserved | Self::Delivered)
    }

    /// The only status an item enters `self` from. `None` for the initial
    /// status.
    pub fn predecessor(&self) -> Option<ItemStatus> {
        match self {
            Self::Available => None,
            Self::Reserved => Some(Self::Available),
            Self::Delivered => Some(Self::Reserved),
        }
    }

    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        next.predecessor() == Some(*self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl FromStr for ItemStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "delivered" => Ok(Self::Delivered),
            other => Err(ProtocolError::validation(format!(
                "unknown item status '{other}'"
            ))),
        }
    }
}

/// How urgent an aid request is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Urgency {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ProtocolError::validation(format!(
                "unknown urgency '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of an aid request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a request in this status must carry an approver reference.
    pub fn has_approver(&self) -> bool {
        self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn predecessor(&self) -> Option<RequestStatus> {
        match self {
            Self::Pending => None,
            Self::Approved | Self::Rejected => Some(Self::Pending),
        }
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        next.predecessor() == Some(*self)
    }
}

impl FromStr for RequestStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ProtocolError::validation(format!(
                "unknown request status '{other}'"
            ))),
        }
    }
}

/// Outcome an organization or admin records on a pending request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    Approve,
    Reject,
}

impl Resolution {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

/// Lifecycle status of a fundraising event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Accepting pledges.
    Active,
    Finished,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn accepts_pledges(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Finished) | (Self::Active, Self::Cancelled)
        )
    }
}

impl FromStr for EventStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ProtocolError::validation(format!(
                "unknown event status '{other}'"
            ))),
        }
    }
}

// Decoding from stored TEXT columns.
macro_rules! impl_text_conversions {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ProtocolError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_text_conversions!(
    Role,
    Category,
    ItemStatus,
    Urgency,
    RequestStatus,
    EventStatus
);

/// The authenticated caller of an operation, as resolved by the identity layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn owns(&self, owner_id: i64) -> bool {
        self.id == owner_id
    }
}
