//! The global [`Error`] and [`Result`] types used across the entire crate.

use {
	crate::GlobalState,
	tracing::{error, info, warn},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Global `Error` type for the entire crate. The [`Display`](std::fmt::Display) implementation
/// is what users get to see.
#[derive(Debug, Clone)]
#[allow(clippy::upper_case_acronyms)]
pub enum Error {
	/// Some unknown error occurred.
	Unknown,

	/// Some custom edge-case error that doesn't deserve it's own enum variant.
	Custom(String),

	/// Failed to access the database.
	DatabaseAccess,

	/// Failed to parse JSON.
	ParseJSON,

	/// User Input was out of range.
	InputOutOfRange,

	/// Discord refused to create an invite for us.
	CreateInvite,

	/// Failed to create or hand out the reward role.
	AssignRole,

	/// Something that only works on a Guild was used somewhere else.
	NoGuild,
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Error::Unknown => "Some unknown error occurred.",
			Error::Custom(msg) => msg,
			Error::DatabaseAccess => "Failed to access the database.",
			Error::ParseJSON => "Failed to parse JSON.",
			Error::InputOutOfRange => "Your input was out of range.",
			Error::CreateInvite => "❌ An error occurred while creating invite link!",
			Error::AssignRole => "❌ An error occurred while assigning role!",
			Error::NoGuild => "You can only use this on a server.",
		})
	}
}

impl std::error::Error for Error {}

impl From<serenity::Error> for Error {
	fn from(value: serenity::Error) -> Self {
		match value {
			serenity::Error::Json(why) => {
				error!("JSON Error {why:?}");
				Self::ParseJSON
			}
			serenity::Error::NotInRange(param, value, min, max) => {
				warn!("Input (`{value}`) for `{param}` out of range (`{min}` - `{max}`)");
				Self::InputOutOfRange
			}
			why => {
				warn!("Error occurred: {why:?}");
				Self::Unknown
			}
		}
	}
}

impl From<invitebot::Error> for Error {
	fn from(value: invitebot::Error) -> Self {
		warn!("DB ERROR `{value}`");
		Self::DatabaseAccess
	}
}

impl Error {
	/// Last stop for every error the bot produces, both from slash commands and from event
	/// handlers. Nothing in here is fatal; we log it, tell the user if we can, and keep running.
	pub async fn handle_command(error: poise::FrameworkError<'_, GlobalState, Error>) {
		let (content, ephemeral) = match &error {
			poise::FrameworkError::Setup { error, .. } => {
				error!("Failed to set up the framework. {error:?}");
				return;
			}
			poise::FrameworkError::EventHandler { error, event, .. } => {
				error!("Failed to handle event `{}`. {error:?}", event.name());
				return;
			}
			poise::FrameworkError::Command { error, .. } => {
				error!("Slash Command failed. {error:?}");
				(error.to_string(), true)
			}
			poise::FrameworkError::CommandStructureMismatch { description, .. } => {
				error!("{description}");
				(String::from("Incorrect command structure."), true)
			}
			poise::FrameworkError::MissingBotPermissions { missing_permissions, .. } => {
				error!("{missing_permissions}");
				(
					String::from("The bot is missing permissions for this action. Please contact the server owner and kindly ask them to give the bot the required permissions."),
					true
				)
			}
			poise::FrameworkError::MissingUserPermissions { missing_permissions, .. } => {
				(
					if let Some(perms) = missing_permissions {
						format!("You are missing the `{perms}` permissions for this command.")
					} else {
						String::from("You are missing the required permissions for this command.")
					},
					true,
				)
			}
			poise::FrameworkError::GuildOnly { .. } => (Error::NoGuild.to_string(), true),
			why => {
				error!("{why:?}");
				(String::from("Failed to execute command."), true)
			}
		};

		if let Some(ctx) = &error.ctx() {
			if let Err(why) = ctx
				.send(|reply| {
					reply
						.ephemeral(ephemeral)
						.content(&content)
				})
				.await
			{
				error!("Failed to respond to slash command. {why:?}");
			}

			info!("Handled error with `{content}`.");
		}
	}
}
