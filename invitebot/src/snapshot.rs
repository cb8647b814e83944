//! In-memory snapshots of invite usage.
//!
//! Discord doesn't tell us which invite a new member used. What it does give us is the current
//! use count of every invite in a guild, so we remember those counts and compare them with a
//! fresh fetch every time somebody joins. Whichever invite's count went up was used.

use {
	std::{
		collections::{BTreeMap, HashMap},
		sync::Arc,
	},
	tokio::sync::{Mutex, OwnedMutexGuard},
	tracing::{debug, trace},
};

/// Use counts of all invites of a single guild at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteSnapshot {
	uses: BTreeMap<String, u64>,
}

/// An invite whose use count went up between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteUse {
	pub code: String,

	/// By how much the use count went up.
	pub uses: u64,
}

impl InviteSnapshot {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, code: &str) -> Option<u64> {
		self.uses.get(code).copied()
	}

	pub fn insert(&mut self, code: impl Into<String>, uses: u64) {
		self.uses.insert(code.into(), uses);
	}

	pub fn remove(&mut self, code: &str) -> Option<u64> {
		self.uses.remove(code)
	}

	pub fn len(&self) -> usize {
		self.uses.len()
	}

	pub fn is_empty(&self) -> bool {
		self.uses.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.uses
			.iter()
			.map(|(code, uses)| (code.as_str(), *uses))
	}

	/// Every invite in `current` which has been used more often than in `self`. Invites we have
	/// never seen before count as 0 uses. The result is ordered by invite code.
	pub fn diff(&self, current: &InviteSnapshot) -> Vec<InviteUse> {
		current
			.iter()
			.filter_map(|(code, uses)| {
				let previous = self.get(code).unwrap_or(0);
				(uses > previous).then(|| InviteUse { code: code.to_owned(), uses: uses - previous })
			})
			.collect()
	}
}

impl<S: Into<String>> FromIterator<(S, u64)> for InviteSnapshot {
	fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
		Self {
			uses: iter
				.into_iter()
				.map(|(code, uses)| (code.into(), uses))
				.collect(),
		}
	}
}

type Slot = Arc<Mutex<Option<InviteSnapshot>>>;

/// The last known [`InviteSnapshot`] of every guild the bot is on.
///
/// Every guild gets its own lock. Holding a [`GuildInvites`] guard while fetching the current
/// invites and crediting their owners makes sure two joins on the same guild never diff against
/// the same old snapshot.
#[derive(Debug, Default)]
pub struct InviteCache {
	guilds: Mutex<HashMap<u64, Slot>>,
}

impl InviteCache {
	pub fn new() -> Self {
		Self::default()
	}

	async fn slot(&self, guild_id: u64) -> Slot {
		self.guilds
			.lock()
			.await
			.entry(guild_id)
			.or_default()
			.clone()
	}

	/// Waits until nobody else is working with the guild's snapshot and takes exclusive access.
	pub async fn lock(&self, guild_id: u64) -> GuildInvites {
		let snapshot = self
			.slot(guild_id)
			.await
			.lock_owned()
			.await;

		GuildInvites { guild_id, snapshot }
	}

	pub async fn get(&self, guild_id: u64) -> Option<InviteSnapshot> {
		self.lock(guild_id)
			.await
			.snapshot()
			.cloned()
	}

	pub async fn set(&self, guild_id: u64, snapshot: InviteSnapshot) {
		self.lock(guild_id).await.set(snapshot);
	}

	/// Records the use count of a single invite. Returns `false` if the guild has not been
	/// snapshotted yet, in which case nothing is recorded.
	pub async fn update_one(&self, guild_id: u64, code: &str, uses: u64) -> bool {
		let mut guild = self.lock(guild_id).await;
		match guild.snapshot.as_mut() {
			Some(snapshot) => {
				snapshot.insert(code, uses);
				true
			}
			None => {
				debug!("Ignoring invite `{code}` for guild {guild_id} without snapshot.");
				false
			}
		}
	}

	pub async fn remove_one(&self, guild_id: u64, code: &str) -> bool {
		self.lock(guild_id)
			.await
			.snapshot
			.as_mut()
			.and_then(|snapshot| snapshot.remove(code))
			.is_some()
	}

	/// Drops everything we know about a guild, e.g. after the bot got kicked.
	pub async fn forget(&self, guild_id: u64) {
		self.guilds.lock().await.remove(&guild_id);
	}
}

/// Exclusive access to a single guild's snapshot. See [`InviteCache::lock`].
#[derive(Debug)]
pub struct GuildInvites {
	guild_id: u64,
	snapshot: OwnedMutexGuard<Option<InviteSnapshot>>,
}

impl GuildInvites {
	pub fn guild_id(&self) -> u64 {
		self.guild_id
	}

	/// `None` until the guild's invites have been fetched at least once.
	pub fn snapshot(&self) -> Option<&InviteSnapshot> {
		self.snapshot.as_ref()
	}

	pub fn set(&mut self, snapshot: InviteSnapshot) {
		*self.snapshot = Some(snapshot);
	}

	/// Replaces the stored snapshot with `current` and returns every invite that has been used
	/// in the meantime. If there was no stored snapshot nothing can be attributed.
	pub fn replace(&mut self, current: InviteSnapshot) -> Vec<InviteUse> {
		let used = match self.snapshot.as_ref() {
			Some(previous) => previous.diff(&current),
			None => {
				debug!("Priming invite snapshot for guild {}.", self.guild_id);
				Vec::new()
			}
		};

		trace!("Guild {} now has {} invites.", self.guild_id, current.len());
		*self.snapshot = Some(current);
		used
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		color_eyre::{eyre::eyre, Result},
		std::time::Duration,
	};

	fn snapshot<const N: usize>(invites: [(&str, u64); N]) -> InviteSnapshot {
		invites.into_iter().collect()
	}

	#[test]
	fn single_increase() {
		let previous = snapshot([("ABC123", 0), ("admin", 4)]);
		let current = snapshot([("ABC123", 1), ("admin", 4)]);

		assert_eq!(
			previous.diff(&current),
			vec![InviteUse { code: String::from("ABC123"), uses: 1 }]
		);
	}

	#[test]
	fn no_increase() {
		let previous = snapshot([("ABC123", 2), ("admin", 4)]);

		assert!(previous.diff(&previous.clone()).is_empty());

		// an invite that got deleted or lost uses is not a join
		let current = snapshot([("ABC123", 1)]);
		assert!(previous.diff(&current).is_empty());
	}

	#[test]
	fn unknown_invite_counts_as_unused() {
		let previous = snapshot([("admin", 4)]);
		let current = snapshot([("admin", 4), ("fresh", 1), ("unused", 0)]);

		assert_eq!(
			previous.diff(&current),
			vec![InviteUse { code: String::from("fresh"), uses: 1 }]
		);
	}

	#[test]
	fn multiple_increases_are_ordered() {
		let previous = snapshot([("zzz", 1), ("aaa", 0), ("mmm", 7)]);
		let current = snapshot([("zzz", 2), ("aaa", 2), ("mmm", 7)]);

		let used = previous.diff(&current);
		assert_eq!(
			used,
			vec![
				InviteUse { code: String::from("aaa"), uses: 2 },
				InviteUse { code: String::from("zzz"), uses: 1 },
			]
		);
	}

	#[tokio::test]
	async fn first_fetch_only_primes() {
		let cache = InviteCache::new();
		let mut guild = cache.lock(1).await;

		assert!(guild.snapshot().is_none());
		assert!(guild
			.replace(snapshot([("ABC123", 3)]))
			.is_empty());

		let used = guild.replace(snapshot([("ABC123", 4)]));
		assert_eq!(used, vec![InviteUse { code: String::from("ABC123"), uses: 1 }]);
		assert_eq!(guild.snapshot().and_then(|s| s.get("ABC123")), Some(4));
	}

	#[tokio::test]
	async fn single_updates_need_a_snapshot() -> Result<()> {
		let cache = InviteCache::new();

		assert!(!cache.update_one(1, "ABC123", 0).await);
		assert!(cache.get(1).await.is_none());

		cache.set(1, InviteSnapshot::new()).await;
		assert!(cache.update_one(1, "ABC123", 0).await);

		let stored = cache
			.get(1)
			.await
			.ok_or_else(|| eyre!("snapshot should exist"))?;
		assert_eq!(stored.get("ABC123"), Some(0));

		assert!(cache.remove_one(1, "ABC123").await);
		assert!(!cache.remove_one(1, "ABC123").await);

		cache.forget(1).await;
		assert!(cache.get(1).await.is_none());

		Ok(())
	}

	#[tokio::test]
	async fn created_invite_starts_unused() {
		let cache = InviteCache::new();
		cache.set(1, snapshot([("admin", 4)])).await;

		// created after the guild was primed, first join through it
		assert!(cache.update_one(1, "fresh", 0).await);
		let used = cache
			.lock(1)
			.await
			.replace(snapshot([("admin", 4), ("fresh", 1)]));

		assert_eq!(used, vec![InviteUse { code: String::from("fresh"), uses: 1 }]);
	}

	#[tokio::test]
	async fn guilds_are_independent() {
		let cache = InviteCache::new();
		cache.set(1, snapshot([("one", 1)])).await;
		cache.set(2, snapshot([("two", 2)])).await;

		let _first = cache.lock(1).await;
		let second = tokio::time::timeout(Duration::from_millis(100), cache.get(2)).await;

		assert_eq!(second.ok().flatten(), Some(snapshot([("two", 2)])));
	}

	#[tokio::test]
	async fn guild_lock_is_exclusive() {
		let cache = InviteCache::new();
		cache.set(1, InviteSnapshot::new()).await;

		let guard = cache.lock(1).await;
		let blocked = tokio::time::timeout(Duration::from_millis(50), cache.lock(1)).await;
		assert!(blocked.is_err());

		drop(guard);
		let unblocked = tokio::time::timeout(Duration::from_millis(50), cache.lock(1)).await;
		assert!(unblocked.is_ok());
	}
}
