use thiserror::Error;

/// The errors returned by every fallible operation in this crate.
///
/// Decoding errors are deferred until first access, so constructing an
/// encoded view over raw bytes is always infallible. Cleanup failures are
/// surfaced as-is and never mask the original cause.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// A key or a store was looked up and does not exist
	#[error("Resource not found: {0}")]
	NotFound(String),

	/// A store or a key already exists where uniqueness was required
	#[error("Resource already exists: {0}")]
	AlreadyExists(String),

	/// Encoded bytes failed to parse
	#[error("Malformed encoding: {0}")]
	Malformed(String),

	/// A durable write was requested from a session that cannot perform
	/// one, such as committing a transient session
	#[error("The session is read-only")]
	ReadOnly,

	/// The operation was given invalid input
	#[error("Invalid input: {0}")]
	Invalid(String),

	/// The session was cancelled cooperatively
	#[error("The operation was cancelled")]
	Canceled,

	/// A writer session was requested while another writer is active
	#[error("A writer session is already in progress")]
	Busy,

	/// The session has already reached a terminal state
	#[error("The session has already been committed or closed")]
	Discarded,

	/// A problem in the underlying engine, outside this crate's control
	#[error("There was a problem with the underlying datastore: {0}")]
	Internal(String),
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Error {
		Error::Internal(e.to_string())
	}
}

impl From<std::str::Utf8Error> for Error {
	fn from(e: std::str::Utf8Error) -> Error {
		Error::Malformed(e.to_string())
	}
}

impl From<std::string::FromUtf8Error> for Error {
	fn from(e: std::string::FromUtf8Error) -> Error {
		Error::Malformed(e.to_string())
	}
}
