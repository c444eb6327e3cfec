//! Types and helpers shared between the approval-notify client and anything
//! that speaks the approval-count API.

pub mod api;
pub mod domain;

pub use domain::{ApprovalCounts, UserId};
