//! Discord Bot for tracking invites.
//!
//! Members can generate a personal invite link through the `/invite-tracker` menu. Every time
//! somebody joins, the bot compares the guild's invite use counts with the last ones it saw to
//! figure out whose invite was used and credits that member. Once a member brought in
//! [`REWARD_THRESHOLD`](invitebot::REWARD_THRESHOLD) people, they can claim a reward role.

#![warn(missing_debug_implementations, rust_2018_idioms)]
#![warn(clippy::style, clippy::perf, clippy::complexity, clippy::correctness)]

mod commands;
mod config;
mod error;
mod events;
mod menu;
mod roles;

use {
	crate::{
		config::{Config, RegisterMode},
		error::Error,
	},
	clap::Parser,
	color_eyre::Result as Eyre,
	invitebot::{Database, InviteCache},
	poise::{
		serenity_prelude::{GatewayIntents, GuildId},
		Command, Framework, FrameworkOptions,
	},
	std::path::PathBuf,
	time::macros::format_description,
	tracing::info,
	tracing_subscriber::{
		fmt::{format::FmtSpan, time::UtcTime},
		EnvFilter,
	},
};

#[tokio::main]
async fn main() -> Eyre<()> {
	color_eyre::install()?;
	dotenv::dotenv().ok();
	let args = Args::parse();

	let mut config = Config::load(&args.config)?;
	if let Some(mode) = args.mode {
		config.mode = mode;
	}

	let file_logger = tracing_appender::rolling::daily("./logs", "invite_tracker.log");
	let (log_writer, _guard) = tracing_appender::non_blocking(file_logger);

	tracing_subscriber::fmt()
		.compact()
		.with_writer(log_writer)
		.with_timer(UtcTime::new(format_description!(
			"[[[year]-[month]-[day] | [hour]:[minute]:[second]]"
		)))
		.with_line_number(true)
		.with_span_events(FmtSpan::NEW)
		.with_env_filter({
			EnvFilter::new(if args.debug {
				"DEBUG"
			} else if let Some(ref level) = config.log_level {
				level.as_str()
			} else {
				"discord_bot=INFO,invitebot=INFO"
			})
		})
		.init();

	let token = config.token()?.to_owned();
	let registration_guild = config.registration_guild()?;
	let global_state = GlobalState::new(config).await?;

	let framework = Framework::builder()
		.options(FrameworkOptions {
			commands: vec![commands::invite_tracker()],
			event_handler: |ctx, event, framework, global_state| {
				Box::pin(events::handler(ctx, event, framework, global_state))
			},
			on_error: |error| Box::pin(Error::handle_command(error)),
			..Default::default()
		})
		.token(token)
		.intents(
			GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_INVITES,
		)
		.setup(move |ctx, _, framework| {
			Box::pin(async move {
				let commands = &framework.options().commands;
				let mode = global_state.config.mode;
				match registration_guild {
					Some(dev_guild) => {
						poise::builtins::register_in_guild(ctx, commands, GuildId(dev_guild))
							.await?;
					}
					None => {
						poise::builtins::register_globally(ctx, commands).await?;
					}
				}

				for Command { name, .. } in commands {
					info!("[{mode}] Successfully registered command `/{name}`.");
				}

				Ok(global_state)
			})
		});

	info!("Finished setting up. Connecting to Discord...");
	framework.run().await?;

	Ok(())
}

/// Some convenience CLI arguments to configure the bot quickly without changing the config file.
/// Any of these options will override the values set in the config file.
#[derive(Debug, Clone, Parser)]
struct Args {
	/// The path to the bot's config file.
	#[arg(short, long)]
	#[clap(default_value = "./config.toml")]
	pub config: PathBuf,

	/// Which level to register commands on.
	/// - `Dev`: commands will be registered on `dev_guild` only. This is fast and useful for
	///          development.
	/// - `Prod`: commands will be registered globally.
	#[arg(long)]
	pub mode: Option<RegisterMode>,

	/// Run in debug mode.
	#[arg(long)]
	#[clap(default_value = "false")]
	pub debug: bool,
}

/// Global State Object used for the entire runtime of the process. This holds the parsed config
/// file, the database and the invite snapshots of every guild.
#[derive(Debug)]
pub struct GlobalState {
	/// Parsed config file of the bot.
	pub config: Config,

	/// `SQLite` connection pool for storing everybody's invite counts.
	pub database: Database,

	/// Last known invite use counts per guild.
	pub invites: InviteCache,
}

impl GlobalState {
	async fn new(config: Config) -> Eyre<Self> {
		let database = Database::connect(&config.database_url).await?;
		info!("Connected to database `{}`.", config.database_url);

		Ok(Self { config, database, invites: InviteCache::new() })
	}
}

/// Global `Context` type which gets passed to slash commands.
pub type Context<'ctx> = poise::Context<'ctx, GlobalState, Error>;
