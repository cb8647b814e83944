//! Core logic of the invite tracker.
//!
//! This crate knows nothing about Discord itself. It holds the per-guild [`InviteCache`] which is
//! used to figure out which invite a new member used, the [`Database`] storing how many members
//! every user brought in, and the rules for claiming the reward role (see [`reward`]).

#![warn(missing_debug_implementations, rust_2018_idioms)]
#![warn(clippy::style, clippy::perf, clippy::complexity, clippy::correctness)]

pub mod database;
pub mod error;
pub mod reward;
pub mod snapshot;

pub use {
	database::{ClaimAttempt, Database, MemberInvites},
	error::{Error, Result},
	reward::{ClaimDecision, InviteStats, REWARD_THRESHOLD},
	snapshot::{GuildInvites, InviteCache, InviteSnapshot, InviteUse},
};
