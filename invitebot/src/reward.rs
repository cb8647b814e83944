//! Rules for claiming the reward role.

/// How many invites a user needs to claim the reward role. Claiming it uses up that many.
pub const REWARD_THRESHOLD: i64 = 5;

/// What should happen if a user asks for the reward role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
	/// The role has been claimed before. Nothing changes.
	AlreadyClaimed,

	/// Not enough invites yet.
	Insufficient { total_invites: i64, missing: i64 },

	/// Grant the role and take [`REWARD_THRESHOLD`] invites away.
	Eligible,
}

/// The part of a user's database entry that matters for the reward.
///
/// Users without a database entry are represented by [`InviteStats::default`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InviteStats {
	pub total_invites: i64,
	pub has_role: bool,
}

impl InviteStats {
	/// How many invites are still missing for the reward. Never negative.
	pub fn remaining(&self) -> i64 {
		(REWARD_THRESHOLD - self.total_invites).max(0)
	}

	pub fn reached_threshold(&self) -> bool {
		self.total_invites >= REWARD_THRESHOLD
	}

	pub fn claim_decision(&self) -> ClaimDecision {
		if self.has_role {
			ClaimDecision::AlreadyClaimed
		} else if self.reached_threshold() {
			ClaimDecision::Eligible
		} else {
			ClaimDecision::Insufficient {
				total_invites: self.total_invites,
				missing: self.remaining(),
			}
		}
	}
}
