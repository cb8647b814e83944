use {
	super::invites::fetch_snapshot,
	crate::{error::Result, GlobalState},
	poise::serenity_prelude::{Context, Member},
	tracing::{debug, error, info, warn},
};

/// Figures out whose invite the new member used and credits them.
///
/// The guild's snapshot stays locked from before the fetch until the owners have been credited,
/// so a second join on the same guild has to wait and then diffs against the new snapshot.
#[tracing::instrument(skip_all, fields(guild = %member.guild_id, user = member.user.tag()))]
pub async fn handle(ctx: &Context, global_state: &GlobalState, member: &Member) -> Result<()> {
	let guild_id = *member.guild_id.as_u64();
	let mut invites = global_state.invites.lock(guild_id).await;

	let current = fetch_snapshot(ctx, member.guild_id).await?;
	let used = invites.replace(current);

	match used.len() {
		0 => {
			debug!("Could not figure out which invite was used.");
			return Ok(());
		}
		1 => {}
		n => warn!("{n} invites were used since the last join. Crediting all of them."),
	}

	for invite in &used {
		match global_state
			.database
			.credit_invite(guild_id, invite)
			.await
		{
			Ok(Some(owner)) => info!("Invite count increased for user {owner}."),
			Ok(None) => debug!("Invite `{}` does not belong to anybody.", invite.code),
			Err(why) => error!("Failed to credit invite `{}`: {why}", invite.code),
		}
	}

	Ok(())
}
