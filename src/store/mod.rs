//! In-memory user storage.
//!
//! This module contains the `User` record and its input shapes, plus the
//! per-process `UserStore` that every worker owns a replica of.

pub mod user;
pub mod users;

pub use user::{NewUser, User, UserPatch, parse_user_id};
pub use users::UserStore;
