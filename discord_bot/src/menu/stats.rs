use {
	super::{update, GREEN, ORANGE},
	crate::{error::Result, GlobalState},
	invitebot::REWARD_THRESHOLD,
	poise::serenity_prelude::{Context, CreateEmbed, GuildId},
	serenity::model::prelude::interaction::message_component::MessageComponentInteraction,
	tracing::error,
};

pub(super) async fn handle(
	ctx: &Context,
	global_state: &GlobalState,
	component: &MessageComponentInteraction,
	guild_id: GuildId,
) -> Result<()> {
	let stats = match global_state
		.database
		.invite_stats(*component.user.id.as_u64(), *guild_id.as_u64())
		.await
	{
		Ok(stats) => stats,
		Err(why) => {
			error!("Failed to fetch stats for {}: {why}", component.user.tag());
			return Ok(());
		}
	};

	let mut embed = CreateEmbed::default();
	embed
		.color(if stats.reached_threshold() { GREEN } else { ORANGE })
		.title("📊 Your Invite Statistics")
		.field("🎯 Total Invites", stats.total_invites, true)
		.field("⏳ Remaining Invites", stats.remaining(), true)
		.field(
			"🎖️ Role Status",
			if stats.has_role { "✅ Claimed" } else { "❌ Not Claimed" },
			true,
		)
		.footer(|f| {
			f.text(format!(
				"You can claim your special role when you reach {REWARD_THRESHOLD} invites!"
			))
		});

	update(ctx, component, embed).await
}
