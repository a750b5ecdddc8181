//! # Solidarity API
//!
//! REST service for the Solidarity donation network. Donors list items,
//! beneficiaries reserve them or file aid requests, organizations triage
//! requests and run fundraising events, administrators read the aggregates.
//!
//! | Module       | Concern                                          |
//! |--------------|--------------------------------------------------|
//! | [`db`]       | SQLite pool and migrations                       |
//! | [`auth`]     | Bearer tokens and the authenticated-caller extractor |
//! | [`items`]    | Item allocation: reserve, deliver                |
//! | [`requests`] | Aid request admission cap and triage             |
//! | [`events`]   | Event pledges and running totals                 |
//! | [`users`]    | Registration, profiles, admin bootstrap          |
//! | [`reports`]  | Aggregate reporting                              |
//! | [`api`]      | HTTP routes and the response envelope            |
//!
//! Business rules (roles, transitions, validation) live in
//! `solidarity_protocol`; this crate applies them to stored state.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod items;
pub mod models;
pub mod reports;
pub mod requests;
pub mod users;

#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_requests;
#[cfg(test)]
mod test_support;
