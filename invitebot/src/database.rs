//! `SQLite` storage for everybody's invite statistics.
//!
//! There is a single table, `user_invites`, with one row per user. IDs are stored as text since
//! Discord snowflakes don't fit into SQLite's signed integers.

use {
	crate::{
		error::{Error, Result},
		reward::{ClaimDecision, InviteStats, REWARD_THRESHOLD},
		snapshot::InviteUse,
	},
	serde::{Deserialize, Serialize},
	sqlx::{
		sqlite::{SqliteConnectOptions, SqlitePoolOptions},
		FromRow, Pool, QueryBuilder, Sqlite,
	},
	std::str::FromStr,
	tracing::{debug, info},
};

pub const TABLE: &str = "user_invites";

/// `SQLite` representation of a row in [`TABLE`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserInviteSchema {
	pub user_id: String,
	pub guild_id: String,
	pub total_invites: i64,
	pub generated_code: Option<String>,
	pub has_role: bool,
}

/// Parsed version of [`UserInviteSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInvites {
	pub user_id: u64,
	pub guild_id: u64,
	pub total_invites: i64,
	pub generated_code: Option<String>,
	pub has_role: bool,
}

impl TryFrom<UserInviteSchema> for MemberInvites {
	type Error = Error;

	fn try_from(value: UserInviteSchema) -> Result<Self> {
		Ok(Self {
			user_id: parse_id("user_id", value.user_id)?,
			guild_id: parse_id("guild_id", value.guild_id)?,
			total_invites: value.total_invites,
			generated_code: value.generated_code,
			has_role: value.has_role,
		})
	}
}

impl MemberInvites {
	pub fn stats(&self) -> InviteStats {
		InviteStats { total_invites: self.total_invites, has_role: self.has_role }
	}
}

fn parse_id(column: &'static str, value: String) -> Result<u64> {
	value
		.parse()
		.map_err(|_| Error::InvalidId { column, value })
}

/// Result of [`Database::claim_reward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimAttempt {
	AlreadyClaimed,
	Insufficient { total_invites: i64, missing: i64 },

	/// The claim has been saved. If the role can't be handed out afterwards,
	/// [`Database::revert_claim`] undoes it.
	Claimed { remaining_invites: i64 },
}

/// Connection pool plus all the queries the bot needs.
#[derive(Debug, Clone)]
pub struct Database {
	pool: Pool<Sqlite>,
}

impl Database {
	/// Connects to `url` (e.g. `sqlite://invites.db`), creating the file and the table if they
	/// don't exist yet.
	pub async fn connect(url: &str) -> Result<Self> {
		let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

		// every connection to an in-memory database gets its own database
		let pool = if url.contains(":memory:") {
			SqlitePoolOptions::new()
				.max_connections(1)
				.idle_timeout(None)
				.max_lifetime(None)
				.connect_with(options)
				.await?
		} else {
			SqlitePoolOptions::new()
				.max_connections(5)
				.connect_with(options)
				.await?
		};

		let database = Self { pool };
		database.migrate().await?;

		Ok(database)
	}

	pub async fn migrate(&self) -> Result<()> {
		sqlx::query(&format!(
			r#"
			CREATE TABLE IF NOT EXISTS {TABLE} (
				user_id        TEXT PRIMARY KEY,
				guild_id       TEXT,
				total_invites  INTEGER NOT NULL DEFAULT 0,
				generated_code TEXT,
				has_role       BOOLEAN NOT NULL DEFAULT 0
			)
			"#
		))
		.execute(&self.pool)
		.await?;

		debug!("Table `{TABLE}` is ready.");
		Ok(())
	}

	pub async fn find_member(&self, user_id: u64, guild_id: u64) -> Result<Option<MemberInvites>> {
		let mut query = QueryBuilder::new(format!("SELECT * FROM {TABLE} WHERE user_id = "));

		query
			.push_bind(user_id.to_string())
			.push(" AND guild_id = ")
			.push_bind(guild_id.to_string());

		query
			.build_query_as::<UserInviteSchema>()
			.fetch_optional(&self.pool)
			.await?
			.map(MemberInvites::try_from)
			.transpose()
	}

	/// Same as [`Database::find_member`] but users without an entry simply have no invites.
	pub async fn invite_stats(&self, user_id: u64, guild_id: u64) -> Result<InviteStats> {
		Ok(self
			.find_member(user_id, guild_id)
			.await?
			.map(|member| member.stats())
			.unwrap_or_default())
	}

	/// Who generated the invite `code` on this guild?
	pub async fn find_code_owner(&self, code: &str, guild_id: u64) -> Result<Option<u64>> {
		sqlx::query_scalar::<_, String>(&format!(
			"SELECT user_id FROM {TABLE} WHERE generated_code = ? AND guild_id = ?"
		))
		.bind(code)
		.bind(guild_id.to_string())
		.fetch_optional(&self.pool)
		.await?
		.map(|user_id| parse_id("user_id", user_id))
		.transpose()
	}

	/// Remembers `code` as the user's personal invite. Any previous code is replaced, the invite
	/// count and the claim status stay as they are.
	pub async fn save_generated_code(&self, user_id: u64, guild_id: u64, code: &str) -> Result<()> {
		sqlx::query(&format!(
			r#"
			INSERT INTO {TABLE} (user_id, guild_id, generated_code)
			VALUES (?, ?, ?)
			ON CONFLICT(user_id) DO UPDATE SET
				guild_id = excluded.guild_id,
				generated_code = excluded.generated_code
			"#
		))
		.bind(user_id.to_string())
		.bind(guild_id.to_string())
		.bind(code)
		.execute(&self.pool)
		.await?;

		debug!("Saved invite `{code}` for user {user_id} on guild {guild_id}.");
		Ok(())
	}

	/// Returns `false` if the user has no entry on this guild.
	pub async fn add_invites(&self, user_id: u64, guild_id: u64, amount: i64) -> Result<bool> {
		let result = sqlx::query(&format!(
			"UPDATE {TABLE} SET total_invites = total_invites + ? WHERE user_id = ? AND guild_id = ?"
		))
		.bind(amount)
		.bind(user_id.to_string())
		.bind(guild_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Credits whoever generated the used invite with one invite per use. Returns the owner's
	/// `UserID`, or `None` if the invite doesn't belong to anybody.
	pub async fn credit_invite(&self, guild_id: u64, used: &InviteUse) -> Result<Option<u64>> {
		let Some(owner) = self.find_code_owner(&used.code, guild_id).await? else {
			return Ok(None);
		};

		let uses = i64::try_from(used.uses).map_err(|_| Error::DatabaseUpdate)?;
		if !self.add_invites(owner, guild_id, uses).await? {
			return Ok(None);
		}

		info!("User {owner} invited {uses} member(s) to guild {guild_id} via `{}`.", used.code);
		Ok(Some(owner))
	}

	/// Marks the reward as claimed and takes away [`REWARD_THRESHOLD`] invites, if the user is
	/// allowed to claim it. This is a single statement, so two claims can't both succeed and
	/// joins credited at the same time are never blocked for long.
	pub async fn claim_reward(&self, user_id: u64, guild_id: u64) -> Result<ClaimAttempt> {
		let remaining_invites = sqlx::query_scalar::<_, i64>(&format!(
			r#"
			UPDATE {TABLE}
			SET has_role = 1, total_invites = total_invites - ?
			WHERE user_id = ? AND guild_id = ? AND has_role = 0 AND total_invites >= ?
			RETURNING total_invites
			"#
		))
		.bind(REWARD_THRESHOLD)
		.bind(user_id.to_string())
		.bind(guild_id.to_string())
		.bind(REWARD_THRESHOLD)
		.fetch_optional(&self.pool)
		.await?;

		if let Some(remaining_invites) = remaining_invites {
			info!(
				"User {user_id} claimed the reward on guild {guild_id} ({remaining_invites} invites left)."
			);
			return Ok(ClaimAttempt::Claimed { remaining_invites });
		}

		match self.invite_stats(user_id, guild_id).await?.claim_decision() {
			ClaimDecision::AlreadyClaimed => Ok(ClaimAttempt::AlreadyClaimed),
			ClaimDecision::Insufficient { total_invites, missing } => {
				Ok(ClaimAttempt::Insufficient { total_invites, missing })
			}
			// a claim was reverted in between
			ClaimDecision::Eligible => Err(Error::DatabaseUpdate),
		}
	}

	/// Gives back the invites taken by [`Database::claim_reward`] and clears the flag. Returns
	/// `false` if there was no claim to revert.
	pub async fn revert_claim(&self, user_id: u64, guild_id: u64) -> Result<bool> {
		let result = sqlx::query(&format!(
			r#"
			UPDATE {TABLE}
			SET has_role = 0, total_invites = total_invites + ?
			WHERE user_id = ? AND guild_id = ? AND has_role = 1
			"#
		))
		.bind(REWARD_THRESHOLD)
		.bind(user_id.to_string())
		.bind(guild_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Ok(false);
		}

		debug!("Reverted reward claim of user {user_id} on guild {guild_id}.");
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::snapshot::InviteCache,
		color_eyre::{eyre::eyre, Result},
		std::{path::PathBuf, time::Duration},
	};

	const GUILD: u64 = 1_046_812_338_104_848_405;
	const ALICE: u64 = 291_585_142_164_815_873;
	const BOB: u64 = 869_236_425_012_408_340;

	async fn database() -> Result<Database> {
		Ok(Database::connect("sqlite::memory:").await?)
	}

	async fn member(db: &Database, user_id: u64) -> Result<MemberInvites> {
		db.find_member(user_id, GUILD)
			.await?
			.ok_or_else(|| eyre!("user {user_id} should have an entry"))
	}

	fn used(code: &str, uses: u64) -> InviteUse {
		InviteUse { code: String::from(code), uses }
	}

	/// Removes the database file (and SQLite's side files) once the test is done.
	struct DatabaseFile(PathBuf);

	impl DatabaseFile {
		fn new(name: &str) -> Self {
			let path = std::env::temp_dir().join(format!("invitebot-{name}-{}.db", std::process::id()));
			let file = Self(path);
			file.remove();
			file
		}

		fn url(&self) -> String {
			format!("sqlite://{}", self.0.display())
		}

		fn remove(&self) {
			for suffix in ["", "-journal", "-wal", "-shm"] {
				let _ = std::fs::remove_file(format!("{}{suffix}", self.0.display()));
			}
		}
	}

	impl Drop for DatabaseFile {
		fn drop(&mut self) {
			self.remove();
		}
	}

	#[tokio::test]
	async fn unknown_user_has_no_invites() -> Result<()> {
		let db = database().await?;

		assert!(db.find_member(ALICE, GUILD).await?.is_none());
		assert_eq!(db.invite_stats(ALICE, GUILD).await?, InviteStats::default());
		assert!(!db.add_invites(ALICE, GUILD, 1).await?);

		Ok(())
	}

	#[tokio::test]
	async fn regenerating_keeps_progress() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "first").await?;
		assert!(db.add_invites(ALICE, GUILD, 12).await?);
		assert_eq!(
			db.claim_reward(ALICE, GUILD).await?,
			ClaimAttempt::Claimed { remaining_invites: 7 }
		);

		db.save_generated_code(ALICE, GUILD, "second").await?;

		let alice = member(&db, ALICE).await?;
		assert_eq!(alice.generated_code.as_deref(), Some("second"));
		assert_eq!(alice.total_invites, 7);
		assert!(alice.has_role);

		assert_eq!(db.find_code_owner("second", GUILD).await?, Some(ALICE));
		assert_eq!(db.find_code_owner("first", GUILD).await?, None);

		Ok(())
	}

	#[tokio::test]
	async fn codes_are_scoped_to_their_guild() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;

		assert_eq!(db.find_code_owner("ABC123", GUILD + 1).await?, None);
		assert!(db.find_member(ALICE, GUILD + 1).await?.is_none());

		Ok(())
	}

	#[tokio::test]
	async fn join_through_generated_invite() -> Result<()> {
		let db = database().await?;
		let invites = InviteCache::new();

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;
		invites
			.set(GUILD, [("ABC123", 0), ("admin", 9)].into_iter().collect())
			.await;

		// Bob joins through Alice's invite
		let mut guild = invites.lock(GUILD).await;
		let used = guild.replace([("ABC123", 1), ("admin", 9)].into_iter().collect());
		assert_eq!(used.len(), 1);

		for invite in &used {
			assert_eq!(db.credit_invite(GUILD, invite).await?, Some(ALICE));
		}
		drop(guild);

		assert_eq!(member(&db, ALICE).await?.total_invites, 1);
		assert!(db.find_member(BOB, GUILD).await?.is_none());

		Ok(())
	}

	#[tokio::test]
	async fn every_observed_use_is_credited() -> Result<()> {
		let db = database().await?;
		let invites = InviteCache::new();

		db.save_generated_code(ALICE, GUILD, "alice").await?;
		db.save_generated_code(BOB, GUILD, "bob").await?;
		invites
			.set(GUILD, [("alice", 0), ("bob", 3), ("admin", 1)].into_iter().collect())
			.await;

		// several members joined before the invites were fetched again
		let increased = invites
			.lock(GUILD)
			.await
			.replace([("alice", 2), ("bob", 4), ("admin", 2)].into_iter().collect());
		assert_eq!(increased, vec![used("admin", 1), used("alice", 2), used("bob", 1)]);

		let mut credited = Vec::new();
		for invite in &increased {
			credited.push(db.credit_invite(GUILD, invite).await?);
		}
		assert_eq!(credited, vec![None, Some(ALICE), Some(BOB)]);

		assert_eq!(member(&db, ALICE).await?.total_invites, 2);
		assert_eq!(member(&db, BOB).await?.total_invites, 1);

		Ok(())
	}

	#[tokio::test]
	async fn admin_invites_credit_nobody() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;

		assert_eq!(db.credit_invite(GUILD, &used("admin", 1)).await?, None);
		assert_eq!(member(&db, ALICE).await?.total_invites, 0);

		Ok(())
	}

	#[tokio::test]
	async fn claim_at_threshold() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;
		db.add_invites(ALICE, GUILD, 5).await?;

		assert_eq!(
			db.claim_reward(ALICE, GUILD).await?,
			ClaimAttempt::Claimed { remaining_invites: 0 }
		);

		let alice = member(&db, ALICE).await?;
		assert!(alice.has_role);
		assert_eq!(alice.total_invites, 0);

		Ok(())
	}

	#[tokio::test]
	async fn claim_with_too_few_invites() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;
		db.add_invites(ALICE, GUILD, 3).await?;

		assert_eq!(
			db.claim_reward(ALICE, GUILD).await?,
			ClaimAttempt::Insufficient { total_invites: 3, missing: 2 }
		);

		let alice = member(&db, ALICE).await?;
		assert!(!alice.has_role);
		assert_eq!(alice.total_invites, 3);

		// no entry at all
		assert_eq!(
			db.claim_reward(BOB, GUILD).await?,
			ClaimAttempt::Insufficient { total_invites: 0, missing: 5 }
		);

		Ok(())
	}

	#[tokio::test]
	async fn second_claim_changes_nothing() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;
		db.add_invites(ALICE, GUILD, 7).await?;

		assert!(matches!(db.claim_reward(ALICE, GUILD).await?, ClaimAttempt::Claimed { .. }));

		db.add_invites(ALICE, GUILD, 5).await?;
		assert_eq!(member(&db, ALICE).await?.total_invites, 7);

		assert_eq!(db.claim_reward(ALICE, GUILD).await?, ClaimAttempt::AlreadyClaimed);

		let alice = member(&db, ALICE).await?;
		assert!(alice.has_role);
		assert_eq!(alice.total_invites, 7);

		Ok(())
	}

	#[tokio::test]
	async fn reverted_claim_restores_everything() -> Result<()> {
		let db = database().await?;

		db.save_generated_code(ALICE, GUILD, "ABC123").await?;
		db.add_invites(ALICE, GUILD, 6).await?;

		assert!(!db.revert_claim(ALICE, GUILD).await?);

		assert!(matches!(db.claim_reward(ALICE, GUILD).await?, ClaimAttempt::Claimed { .. }));
		assert!(db.revert_claim(ALICE, GUILD).await?);

		let alice = member(&db, ALICE).await?;
		assert!(!alice.has_role);
		assert_eq!(alice.total_invites, 6);

		// can be claimed again afterwards
		assert_eq!(
			db.claim_reward(ALICE, GUILD).await?,
			ClaimAttempt::Claimed { remaining_invites: 1 }
		);

		Ok(())
	}

	#[tokio::test]
	async fn joins_are_credited_while_a_role_is_handed_out() -> Result<()> {
		let file = DatabaseFile::new("pending-claim");
		let db = Database::connect(&file.url()).await?;

		db.save_generated_code(ALICE, GUILD, "alice").await?;
		db.save_generated_code(BOB, GUILD, "bob").await?;
		db.add_invites(ALICE, GUILD, 5).await?;

		assert!(matches!(db.claim_reward(ALICE, GUILD).await?, ClaimAttempt::Claimed { .. }));

		// somebody joins through Bob's invite before Alice's role was granted
		let credited =
			tokio::time::timeout(Duration::from_secs(1), db.credit_invite(GUILD, &used("bob", 1)))
				.await?;
		assert_eq!(credited?, Some(BOB));

		// granting the role failed
		assert!(db.revert_claim(ALICE, GUILD).await?);

		assert_eq!(member(&db, BOB).await?.total_invites, 1);
		let alice = member(&db, ALICE).await?;
		assert!(!alice.has_role);
		assert_eq!(alice.total_invites, 5);

		Ok(())
	}

	#[tokio::test]
	async fn concurrent_claims_succeed_once() -> Result<()> {
		let file = DatabaseFile::new("concurrent-claims");
		let db = Database::connect(&file.url()).await?;

		db.save_generated_code(ALICE, GUILD, "alice").await?;
		db.add_invites(ALICE, GUILD, 9).await?;

		let (first, second) =
			tokio::join!(db.claim_reward(ALICE, GUILD), db.claim_reward(ALICE, GUILD));
		let attempts = [first?, second?];

		assert_eq!(
			attempts
				.iter()
				.filter(|attempt| matches!(attempt, ClaimAttempt::Claimed { .. }))
				.count(),
			1
		);
		assert!(attempts.contains(&ClaimAttempt::AlreadyClaimed));
		assert_eq!(member(&db, ALICE).await?.total_invites, 4);

		Ok(())
	}
}
