//! Integration tests grouped by concern.

mod admin;
mod assignments;
mod entities;
mod hierarchy;
