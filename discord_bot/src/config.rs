//! The bot's config file.
//!
//! Everything has a default except for the Discord token. Secrets can also be passed via
//! environment variables (or a `.env` file), which take precedence over the config file:
//! - `BOT_TOKEN` -> [`Config::discord_token`]
//! - `ROLE_ID` -> [`Config::reward_role`]
//! - `DATABASE_URL` -> [`Config::database_url`]

use {
	clap::ValueEnum,
	color_eyre::{
		eyre::{eyre, WrapErr},
		Result as Eyre,
	},
	serde::Deserialize,
	std::path::Path,
	tracing::debug,
};

/// Config file for the bot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Can be one of the following:
	/// - `TRACE`
	/// - `DEBUG`
	/// - `INFO`
	/// - `WARN`
	/// - `ERROR`
	///
	/// The `--debug` flag will always override this value to `DEBUG`.
	pub log_level: Option<String>,

	/// Authentication Token for the Discord API.
	pub discord_token: Option<String>,

	/// The [`RoleId`](poise::serenity_prelude::RoleId) to hand out once somebody invited enough
	/// people. If this isn't set, the bot will create a role the first time somebody claims it.
	pub reward_role: Option<u64>,

	/// `SQLite` connection string.
	pub database_url: String,

	/// Which level to register commands on.
	pub mode: RegisterMode,

	/// The [`GuildId`](poise::serenity_prelude::GuildId) to register commands on when running in
	/// `Dev` mode.
	pub dev_guild: Option<u64>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_level: None,
			discord_token: None,
			reward_role: None,
			database_url: String::from("sqlite://invites.db"),
			mode: RegisterMode::Prod,
			dev_guild: None,
		}
	}
}

impl Config {
	/// Reads the config file at `path` (if there is one) and applies environment overrides.
	pub fn load(path: &Path) -> Eyre<Self> {
		let mut config = if path.exists() {
			let config_file = std::fs::read_to_string(path)
				.wrap_err_with(|| format!("Failed to read `{}`.", path.display()))?;
			Self::parse(&config_file)?
		} else {
			debug!("No config file at `{}`. Using defaults.", path.display());
			Self::default()
		};

		config.apply_env(|key| std::env::var(key).ok())?;
		Ok(config)
	}

	pub fn parse(config_file: &str) -> Eyre<Self> {
		toml::from_str(config_file).wrap_err("Failed to parse config file.")
	}

	/// Overrides values with whatever `var` returns for the supported environment variables.
	pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Eyre<()> {
		if let Some(token) = var("BOT_TOKEN") {
			self.discord_token = Some(token);
		}

		if let Some(role_id) = var("ROLE_ID") {
			let role_id = role_id
				.trim()
				.parse()
				.wrap_err_with(|| format!("`ROLE_ID` is not a valid ID: `{role_id}`"))?;
			self.reward_role = Some(role_id);
		}

		if let Some(database_url) = var("DATABASE_URL") {
			self.database_url = database_url;
		}

		Ok(())
	}

	/// The bot can't do anything without a token, so a missing token is fatal.
	pub fn token(&self) -> Eyre<&str> {
		match self.discord_token.as_deref() {
			Some(token) if !token.trim().is_empty() => Ok(token),
			_ => Err(eyre!("Missing Discord token. Set `discord_token` or `BOT_TOKEN`.")),
		}
	}

	/// The guild to register commands on, if commands should not be registered globally.
	pub fn registration_guild(&self) -> Eyre<Option<u64>> {
		match self.mode {
			RegisterMode::Prod => Ok(None),
			RegisterMode::Dev => self
				.dev_guild
				.map(Some)
				.ok_or_else(|| eyre!("`dev_guild` is required when running in `Dev` mode.")),
		}
	}
}

/// Which level to register commands on.
/// - `Dev`: commands will be registered on a single guild only. This is fast and useful for
///          development.
/// - `Prod`: commands will be registered on every guild the bot is on. This might take a while
///           to reload and therefore should only be used when running in production.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
pub enum RegisterMode {
	Dev,

	#[default]
	Prod,
}

impl std::fmt::Display for RegisterMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Dev => "Dev",
			Self::Prod => "Prod",
		})
	}
}
