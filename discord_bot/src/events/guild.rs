use {
	super::invites::fetch_snapshot,
	crate::{error::Result, GlobalState},
	poise::serenity_prelude::{Context, GuildId},
	tracing::info,
};

/// Takes the initial invite snapshot of a guild. This happens for every guild on startup and
/// whenever the bot gets added to a new one.
#[tracing::instrument(skip(ctx, global_state))]
pub async fn available(ctx: &Context, global_state: &GlobalState, guild_id: GuildId) -> Result<()> {
	let snapshot = fetch_snapshot(ctx, guild_id).await?;

	info!("Tracking {} invites on guild {guild_id}.", snapshot.len());
	global_state
		.invites
		.set(*guild_id.as_u64(), snapshot)
		.await;

	Ok(())
}

pub async fn removed(global_state: &GlobalState, guild_id: GuildId) {
	info!("Left guild {guild_id}.");
	global_state
		.invites
		.forget(*guild_id.as_u64())
		.await;
}
