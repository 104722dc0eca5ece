//! Advent-calendar promotional platform: users open daily doors within a
//! configured season window, submit a text or file response to each day's
//! task, and accumulate capped personal and global points that unlock
//! threshold rewards. Admins review submissions and adjust ledgers.
//!
//! The crate splits into a pure layer ([`calendar`], [`submission`],
//! [`config`]) and a PostgreSQL storage layer ([`db`]) that owns all state
//! transitions; [`server`] exposes both over a JSON API.

pub mod calendar;
pub mod config;
pub mod db;
pub mod server;
pub mod submission;
