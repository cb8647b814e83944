use {
	super::{update, update_with_error, GREEN, ORANGE, RED},
	crate::{
		error::{Error, Result},
		roles, GlobalState,
	},
	invitebot::{ClaimAttempt, ClaimDecision, REWARD_THRESHOLD},
	poise::serenity_prelude::{Context, CreateEmbed, GuildId},
	serenity::model::prelude::interaction::message_component::MessageComponentInteraction,
	tracing::{error, warn},
};

/// Hands out the reward role if the user invited enough people and didn't claim it before.
pub(super) async fn handle(
	ctx: &Context,
	global_state: &GlobalState,
	component: &MessageComponentInteraction,
	guild_id: GuildId,
) -> Result<()> {
	let user = &component.user;
	let database = &global_state.database;

	let stats = match database
		.invite_stats(*user.id.as_u64(), *guild_id.as_u64())
		.await
	{
		Ok(stats) => stats,
		Err(why) => {
			error!("Failed to check reward claim of {}: {why}", user.tag());
			return Ok(());
		}
	};

	let mut embed = CreateEmbed::default();

	match stats.claim_decision() {
		ClaimDecision::AlreadyClaimed => already_claimed(&mut embed),
		ClaimDecision::Insufficient { total_invites, missing } => {
			insufficient(&mut embed, total_invites, missing)
		}
		ClaimDecision::Eligible => {
			let configured_role = global_state.config.reward_role;

			let (mut member, role_id) =
				match roles::reward_target(ctx, guild_id, user.id, configured_role).await {
					Ok(target) => target,
					Err(why) => {
						error!("Failed to look up reward role for {}: {why:?}", user.tag());
						return update_with_error(ctx, component, &Error::AssignRole).await;
					}
				};

			let attempt = match database
				.claim_reward(*user.id.as_u64(), *guild_id.as_u64())
				.await
			{
				Ok(attempt) => attempt,
				Err(why) => return update_with_error(ctx, component, &Error::from(why)).await,
			};

			match attempt {
				// double click
				ClaimAttempt::AlreadyClaimed => already_claimed(&mut embed),
				ClaimAttempt::Insufficient { total_invites, missing } => {
					insufficient(&mut embed, total_invites, missing)
				}
				ClaimAttempt::Claimed { .. } => {
					if let Err(why) = roles::grant_reward(ctx, &mut member, role_id).await {
						error!("Failed to grant reward role to {}: {why:?}", user.tag());

						match database
							.revert_claim(*user.id.as_u64(), *guild_id.as_u64())
							.await
						{
							Ok(true) => {}
							Ok(false) => warn!("No reward claim of {} to revert.", user.tag()),
							Err(why) => error!("Failed to revert reward claim: {why}"),
						}

						return update_with_error(ctx, component, &Error::AssignRole).await;
					}

					embed
						.color(GREEN)
						.title("🎉 Congratulations!")
						.description(format!(
							"You successfully claimed the <@&{role_id}> role!\n{REWARD_THRESHOLD} invites have been used."
						))
						.footer(|f| f.text("You can now use your role!"));
				}
			}
		}
	}

	update(ctx, component, embed).await
}

fn already_claimed(embed: &mut CreateEmbed) {
	embed
		.color(ORANGE)
		.title("ℹ️ Role Already Claimed!")
		.description("You have already claimed this role.");
}

fn insufficient(embed: &mut CreateEmbed, total_invites: i64, missing: i64) {
	embed
		.color(RED)
		.title("❌ Insufficient Invites!")
		.description(format!("You need {missing} more invites to claim the role."))
		.field("🎯 Current Invites", total_invites, true)
		.field("⏳ Remaining Invites", missing, true);
}
