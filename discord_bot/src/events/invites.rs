//! Keeping the invite snapshots up to date.

use {
	crate::{error::Result, GlobalState},
	invitebot::InviteSnapshot,
	poise::serenity_prelude::{Context, GuildId, InviteCreateEvent, InviteDeleteEvent},
	tracing::trace,
};

/// Fetches the current use count of every invite on the guild.
pub async fn fetch_snapshot(ctx: &Context, guild_id: GuildId) -> Result<InviteSnapshot> {
	Ok(guild_id
		.invites(&ctx.http)
		.await?
		.into_iter()
		.map(|invite| (invite.code, invite.uses))
		.collect())
}

pub async fn created(global_state: &GlobalState, invite: &InviteCreateEvent) {
	let Some(guild_id) = invite.guild_id else {
		return;
	};

	// the gateway event carries no use count; a fresh invite hasn't been used yet
	if global_state
		.invites
		.update_one(*guild_id.as_u64(), &invite.code, 0)
		.await
	{
		trace!("Tracking new invite `{}` on guild {guild_id}.", invite.code);
	}
}

pub async fn deleted(global_state: &GlobalState, invite: &InviteDeleteEvent) {
	let Some(guild_id) = invite.guild_id else {
		return;
	};

	if global_state
		.invites
		.remove_one(*guild_id.as_u64(), &invite.code)
		.await
	{
		trace!("Stopped tracking invite `{}` on guild {guild_id}.", invite.code);
	}
}
