use {
	super::{update, update_with_error, GREEN},
	crate::{
		error::{Error, Result},
		GlobalState,
	},
	poise::serenity_prelude::{ChannelId, Context, CreateEmbed, GuildId},
	serenity::model::prelude::interaction::message_component::MessageComponentInteraction,
	tracing::{error, info},
};

/// Creates a personal invite for whoever picked the option and remembers it, so joins through it
/// can be credited later.
pub(super) async fn handle(
	ctx: &Context,
	global_state: &GlobalState,
	component: &MessageComponentInteraction,
	guild_id: GuildId,
) -> Result<()> {
	let user = &component.user;

	// invites go to the system channel if there is one, otherwise to wherever the menu is
	let channel_id = ctx
		.cache
		.guild_field(guild_id, |guild| guild.system_channel_id)
		.flatten()
		.unwrap_or(component.channel_id);

	let code = match create_invite(ctx, channel_id).await {
		Ok(code) => code,
		Err(why) => {
			error!("Failed to create invite for {} in {channel_id}: {why:?}", user.tag());
			return update_with_error(ctx, component, &Error::CreateInvite).await;
		}
	};

	if let Err(why) = global_state
		.database
		.save_generated_code(*user.id.as_u64(), *guild_id.as_u64(), &code)
		.await
	{
		error!("Failed to save invite `{code}` for {}: {why}", user.tag());
		return update_with_error(ctx, component, &Error::CreateInvite).await;
	}

	info!("Created invite `{code}` for {}.", user.tag());

	let mut embed = CreateEmbed::default();
	embed
		.color(GREEN)
		.title("🔗 Invite Link Created!")
		.description(format!("Your personal invite link: https://discord.gg/{code}"))
		.footer(|f| f.text("This link was specially created for you"));

	update(ctx, component, embed).await
}

/// Never expires, can be used as often as people like and is never reused for anybody else.
async fn create_invite(ctx: &Context, channel_id: ChannelId) -> Result<String> {
	let invite = channel_id
		.create_invite(&ctx.http, |invite| {
			invite
				.max_age(0)
				.max_uses(0)
				.unique(true)
		})
		.await?;

	Ok(invite.code)
}
