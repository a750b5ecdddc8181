//! # Role-based access control
//!
//! Every operation is gated through [`authorize`] against the declarative
//! table in [`Operation::allowed_roles`]. Ownership checks come
//! on top of the role gate and are expressed with [`require_owner`].
//!
//! | Operation                                   | Roles                        |
//! |---------------------------------------------|------------------------------|
//! | `CreateItem`, `UpdateItem`, `DeleteItem`, `ApproveDelivery` | donor, organization |
//! | `ReserveItem`                               | beneficiary                  |
//! | `CreateRequest`, `UpdateRequest`, `DeleteRequest` | beneficiary            |
//! | `ResolveRequest`, `ViewImpact`              | organization, admin          |
//! | `CreateEvent`, `UpdateEvent`, `DeleteEvent` | organization                 |
//! | `Donate`                                    | any role                     |
//! | `ViewStats`, `ViewReports`, `ListUsers`, `RegisterAdmin` | admin           |

use crate::errors::{ProtocolError, Result};
use crate::types::{Actor, Role};

/// Operations subject to the role gate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    CreateItem,
    UpdateItem,
    DeleteItem,
    ReserveItem,
    ApproveDelivery,
    CreateRequest,
    UpdateRequest,
    DeleteRequest,
    ResolveRequest,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    Donate,
    ViewStats,
    ViewReports,
    ViewImpact,
    ListUsers,
    RegisterAdmin,
}

const DONOR_SIDE: &[Role] = &[Role::Donor, Role::Organization];
const BENEFICIARY_ONLY: &[Role] = &[Role::Beneficiary];
const TRIAGE: &[Role] = &[Role::Organization, Role::Admin];
const ORGANIZATION_ONLY: &[Role] = &[Role::Organization];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const ANY_ROLE: &[Role] = &Role::ALL;

impl Operation {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::CreateItem | Self::UpdateItem | Self::DeleteItem | Self::ApproveDelivery => {
                DONOR_SIDE
            }
            Self::ReserveItem
            | Self::CreateRequest
            | Self::UpdateRequest
            | Self::DeleteRequest => BENEFICIARY_ONLY,
            Self::ResolveRequest | Self::ViewImpact => TRIAGE,
            Self::CreateEvent | Self::UpdateEvent | Self::DeleteEvent => ORGANIZATION_ONLY,
            Self::Donate => ANY_ROLE,
            Self::ViewStats | Self::ViewReports | Self::ListUsers | Self::RegisterAdmin => {
                ADMIN_ONLY
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::CreateItem => "create items",
            Self::UpdateItem => "edit items",
            Self::DeleteItem => "delete items",
            Self::ReserveItem => "request items",
            Self::ApproveDelivery => "approve deliveries",
            Self::CreateRequest => "create requests",
            Self::UpdateRequest => "edit requests",
            Self::DeleteRequest => "delete requests",
            Self::ResolveRequest => "approve or reject requests",
            Self::CreateEvent => "create events",
            Self::UpdateEvent => "edit events",
            Self::DeleteEvent => "delete events",
            Self::Donate => "donate to events",
            Self::ViewStats => "view statistics",
            Self::ViewReports => "generate reports",
            Self::ViewImpact => "generate impact reports",
            Self::ListUsers => "list users",
            Self::RegisterAdmin => "register administrators",
        }
    }
}

/// Return `true` if `role` may perform `op`.
pub fn is_allowed(role: Role, op: Operation) -> bool {
    op.allowed_roles().contains(&role)
}

/// Gate `op` on the actor's role.
pub fn authorize(actor: &Actor, op: Operation) -> Result<()> {
    if is_allowed(actor.role, op) {
        Ok(())
    } else {
        Err(ProtocolError::permission(format!(
            "role '{}' cannot {}",
            actor.role,
            op.describe()
        )))
    }
}

/// Require that `actor` is the recorded owner of an entity.
pub fn require_owner(actor: &Actor, owner_id: i64, entity: &str) -> Result<()> {
    if actor.owns(owner_id) {
        Ok(())
    } else {
        Err(ProtocolError::permission(format!(
            "only the owner of this {entity} can change it"
        )))
    }
}
