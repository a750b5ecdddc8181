//! # Solidarity Protocol
//!
//! Storage-free rules of the Solidarity donation network: who may do what,
//! which status transitions exist, what valid input looks like, and how a
//! pledge moves an event's running totals.
//!
//! | Concern            | Module          |
//! |--------------------|-----------------|
//! | Roles & statuses   | [`types`]       |
//! | Authorization      | [`rbac`]        |
//! | Input validation   | [`validation`]  |
//! | Pledge arithmetic  | [`pledge`]      |
//! | Money              | [`money`]       |
//! | Failure categories | [`errors`]      |
//!
//! ## Architecture
//!
//! The backend service owns persistence and transactions; it asks this crate
//! whether an operation is permitted and whether its input is well formed,
//! then performs the state change as one conditional write. Keeping the rules
//! here lets them be tested without a database.

pub mod errors;
pub mod money;
pub mod pledge;
pub mod rbac;
pub mod types;
pub mod validation;


pub use errors::{ProtocolError, Result};
pub use pledge::{Pledge, Totals};
pub use rbac::{authorize, require_owner, Operation};
pub use types::{
    Actor, Category, EventStatus, ItemStatus, RequestStatus, Resolution, Role, Urgency,
};
pub use validation::MAX_PENDING_REQUESTS;
