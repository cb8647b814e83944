mod guild;
mod invites;
mod member_join;

use {
	crate::{error::Result, menu, GlobalState},
	poise::{serenity_prelude::Context, Event, FrameworkContext},
	serenity::model::prelude::interaction::Interaction,
	tracing::{debug, info},
};

pub async fn handler(
	ctx: &Context,
	event: &Event<'_>,
	_framework: FrameworkContext<'_, GlobalState, crate::Error>,
	global_state: &GlobalState,
) -> Result<()> {
	debug!("Received event `{}`", event.name());

	match event {
		Event::Ready { data_about_bot } => {
			info!("Connected to Discord as {}!", data_about_bot.user.tag());
		}
		Event::GuildCreate { guild, .. } => guild::available(ctx, global_state, guild.id).await?,
		Event::GuildDelete { incomplete, .. } => {
			if !incomplete.unavailable {
				guild::removed(global_state, incomplete.id).await;
			}
		}
		Event::GuildMemberAddition { new_member } => {
			member_join::handle(ctx, global_state, new_member).await?
		}
		Event::InviteCreate { data } => invites::created(global_state, data).await,
		Event::InviteDelete { data } => invites::deleted(global_state, data).await,
		Event::InteractionCreate { interaction: Interaction::MessageComponent(component) }
			if component.data.custom_id == menu::MENU_ID =>
		{
			menu::handle(ctx, global_state, component).await?
		}
		_ => {}
	}

	Ok(())
}
