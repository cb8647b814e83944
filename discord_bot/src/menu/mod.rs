//! The select menu sent by `/invite-tracker` and everything that happens when somebody picks an
//! option from it.
//!
//! The menu is handled through the regular event handler instead of a collector so it keeps
//! working after restarts.

mod claim;
mod generate;
mod stats;

use {
	crate::{
		error::{Error, Result},
		GlobalState,
	},
	poise::serenity_prelude::{Context, CreateEmbed},
	serenity::model::prelude::interaction::{
		message_component::MessageComponentInteraction, InteractionResponseType,
	},
	tracing::{debug, error, warn},
};

/// `custom_id` of the select menu.
pub const MENU_ID: &str = "invite_menu";

pub const GREEN: (u8, u8, u8) = (0, 255, 0);
pub const ORANGE: (u8, u8, u8) = (255, 165, 0);
pub const RED: (u8, u8, u8) = (255, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
	GenerateInvite,
	ViewStats,
	CheckRole,
}

impl MenuOption {
	pub const ALL: [Self; 3] = [Self::GenerateInvite, Self::ViewStats, Self::CheckRole];

	pub fn value(&self) -> &'static str {
		match self {
			Self::GenerateInvite => "generate_invite",
			Self::ViewStats => "view_stats",
			Self::CheckRole => "check_role",
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::GenerateInvite => "🔗 Generate Invite Link",
			Self::ViewStats => "📊 View Statistics",
			Self::CheckRole => "✅ Check & Claim Role",
		}
	}

	pub fn description(&self) -> &'static str {
		match self {
			Self::GenerateInvite => "Generate personal invite link",
			Self::ViewStats => "View invite statistics",
			Self::CheckRole => "Check invite count and claim role",
		}
	}
}

impl std::str::FromStr for MenuOption {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|option| option.value() == s)
			.ok_or_else(|| Error::Custom(format!("Unknown menu option `{s}`.")))
	}
}

#[tracing::instrument(skip_all, fields(user = component.user.tag(), choice = ?component.data.values))]
pub async fn handle(
	ctx: &Context,
	global_state: &GlobalState,
	component: &MessageComponentInteraction,
) -> Result<()> {
	let Some(guild_id) = component.guild_id else {
		return Err(Error::NoGuild);
	};

	let Some(choice) = component.data.values.first() else {
		warn!("Menu selection without any values.");
		return Ok(());
	};

	let option = match choice.parse::<MenuOption>() {
		Ok(option) => option,
		Err(why) => {
			warn!("{why}");
			return Ok(());
		}
	};

	debug!("Selected `{}`.", option.value());

	match option {
		MenuOption::GenerateInvite => generate::handle(ctx, global_state, component, guild_id).await,
		MenuOption::ViewStats => stats::handle(ctx, global_state, component, guild_id).await,
		MenuOption::CheckRole => claim::handle(ctx, global_state, component, guild_id).await,
	}
}

/// Replaces the menu message with `embed`.
async fn update(
	ctx: &Context,
	component: &MessageComponentInteraction,
	embed: CreateEmbed,
) -> Result<()> {
	component
		.create_interaction_response(&ctx.http, |response| {
			response
				.kind(InteractionResponseType::UpdateMessage)
				.interaction_response_data(|data| {
					data.set_embed(embed)
						.components(|c| c)
				})
		})
		.await?;

	Ok(())
}

/// Replaces the menu message with a plain error message.
async fn update_with_error(
	ctx: &Context,
	component: &MessageComponentInteraction,
	why: &Error,
) -> Result<()> {
	error!("Menu selection failed: {why:?}");

	component
		.create_interaction_response(&ctx.http, |response| {
			response
				.kind(InteractionResponseType::UpdateMessage)
				.interaction_response_data(|data| {
					data.content(why)
						.set_embeds(Vec::new())
						.components(|c| c)
				})
		})
		.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use {super::*, color_eyre::Result};

	#[test]
	fn option_values() -> Result<()> {
		assert_eq!("generate_invite".parse::<MenuOption>()?, MenuOption::GenerateInvite);
		assert_eq!("view_stats".parse::<MenuOption>()?, MenuOption::ViewStats);
		assert_eq!("check_role".parse::<MenuOption>()?, MenuOption::CheckRole);
		assert!("claim_role".parse::<MenuOption>().is_err());

		Ok(())
	}

	#[test]
	fn options_fit_into_discord_limits() {
		for option in MenuOption::ALL {
			assert!(option.label().chars().count() <= 100);
			assert!(option.description().chars().count() <= 100);
			assert!(option.value().len() <= 100);
		}
	}
}
