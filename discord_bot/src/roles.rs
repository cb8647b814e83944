//! Looking up, creating and handing out the reward role.

use {
	crate::error::Result,
	poise::serenity_prelude::{Context, GuildId, Member, Permissions, RoleId, UserId},
	tracing::{info, warn},
};

pub const REWARD_ROLE_NAME: &str = "VIP Member";

/// #FFD700
pub const REWARD_ROLE_COLOUR: u64 = 0xFFD700;

/// Finds the reward role on the given guild, creating it if necessary.
///
/// The configured role is preferred. If it doesn't exist (or nothing is configured) we look for
/// a role named [`REWARD_ROLE_NAME`] before creating a new one. A freshly created role's ID is
/// logged so it can be put into the config.
pub async fn resolve_reward_role(
	ctx: &Context,
	guild_id: GuildId,
	configured: Option<u64>,
) -> Result<RoleId> {
	if let Some(role_id) = configured.map(RoleId) {
		if ctx.cache.role(guild_id, role_id).is_some() {
			return Ok(role_id);
		}

		warn!("Configured reward role {role_id} does not exist on guild {guild_id}.");
	}

	let existing = ctx
		.cache
		.guild_field(guild_id, |guild| {
			guild
				.roles
				.values()
				.find(|role| role.name == REWARD_ROLE_NAME)
				.map(|role| role.id)
		})
		.flatten();

	if let Some(role_id) = existing {
		info!("Using existing `{REWARD_ROLE_NAME}` role {role_id} on guild {guild_id}.");
		return Ok(role_id);
	}

	let role = guild_id
		.create_role(&ctx.http, |role| {
			role.name(REWARD_ROLE_NAME)
				.colour(REWARD_ROLE_COLOUR)
				.permissions(Permissions::empty())
		})
		.await?;

	warn!(
		"Created reward role `{}` on guild {guild_id}. Set `reward_role = {}` in the config (or `ROLE_ID={}`) to keep using it.",
		role.name, role.id, role.id
	);

	Ok(role.id)
}

/// Everything needed to hand out the reward, looked up before anything is written to the
/// database.
#[tracing::instrument(skip(ctx))]
pub async fn reward_target(
	ctx: &Context,
	guild_id: GuildId,
	user_id: UserId,
	configured: Option<u64>,
) -> Result<(Member, RoleId)> {
	let role_id = resolve_reward_role(ctx, guild_id, configured).await?;
	let member = guild_id.member(ctx, user_id).await?;

	Ok((member, role_id))
}

pub async fn grant_reward(ctx: &Context, member: &mut Member, role_id: RoleId) -> Result<()> {
	member.add_role(&ctx.http, role_id).await?;

	info!("Gave role {role_id} to {}.", member.user.tag());
	Ok(())
}
