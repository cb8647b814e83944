use {
	crate::{
		error::{Error, Result},
		menu::{MenuOption, MENU_ID, RED},
		Context,
	},
	chrono::Utc,
	invitebot::REWARD_THRESHOLD,
};

/// Start the invite tracking system
///
/// Sends a menu where members can generate their personal invite link, look at how many people \
/// they invited so far and claim the reward role.
#[tracing::instrument(skip(ctx), fields(user = ctx.author().tag()))]
#[poise::command(
	slash_command,
	guild_only,
	rename = "invite-tracker",
	default_member_permissions = "ADMINISTRATOR",
	on_error = "Error::handle_command"
)]
pub async fn invite_tracker(ctx: Context<'_>) -> Result<()> {
	ctx.send(|reply| {
		reply
			.ephemeral(true)
			.embed(|e| {
				e.color(RED)
					.title(format!("🔗 **Reach {REWARD_THRESHOLD} INVITES for FREE ACCESS**"))
					.description(
						"📋 **How to use**\nUse the dropdown menu below to:\n🔷 Generate Invite Link\n🔷 View Statistics\n🔷 Claim your role",
					)
					.footer(|f| {
						f.text(format!(
							"🟥 INVITE TRACKER • {}",
							Utc::now().format("%d/%m/%Y, %H:%M")
						))
					})
			})
			.components(|c| {
				c.create_action_row(|row| {
					row.create_select_menu(|menu| {
						menu.custom_id(MENU_ID)
							.placeholder("Select an option ⏵")
							.options(|o| {
								for option in MenuOption::ALL {
									o.create_option(|o| {
										o.label(option.label())
											.value(option.value())
											.description(option.description())
									});
								}
								o
							})
					})
				})
			})
	})
	.await?;

	Ok(())
}
