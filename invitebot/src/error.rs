//! The [`Error`] and [`Result`] types used across the crate.

use tracing::warn;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// Failed to access the database.
	DatabaseAccess,

	/// Failed to update an entry in the database.
	DatabaseUpdate,

	/// A row contained an ID that is not a valid snowflake.
	InvalidId { column: &'static str, value: String },
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::DatabaseAccess => f.write_str("Failed to access the database."),
			Error::DatabaseUpdate => f.write_str("Failed to update an entry in the database."),
			Error::InvalidId { column, value } => {
				write!(f, "Found invalid ID `{value}` in column `{column}`.")
			}
		}
	}
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
	fn from(value: sqlx::Error) -> Self {
		warn!("DB ERROR `{value:?}`");
		match value {
			sqlx::Error::Database(why) => {
				warn!("{why:?}");
				Self::DatabaseUpdate
			}
			_ => Self::DatabaseAccess,
		}
	}
}
