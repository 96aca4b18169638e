use once_cell::sync::Lazy;

/// Specifies how many bytes a writer session buffers before it performs an
/// intermediate, non-durable flush to the engine. A flushed session is still
/// rolled back atomically through the rollback segment.
pub static MAX_BATCH_SIZE: Lazy<usize> =
	lazy_env_parse!("GENJI_MAX_BATCH_SIZE", usize, 10 * 1024 * 1024);

/// Specifies how many bytes a transient session buffers before it flushes
/// its scratch batch non-durably.
pub static MAX_TRANSIENT_BATCH_SIZE: Lazy<usize> =
	lazy_env_parse!("GENJI_MAX_TRANSIENT_BATCH_SIZE", usize, 16 * 1024 * 1024);

/// Page size used by streaming range scans over a session.
pub const SCAN_BATCH_SIZE: u32 = 500;

/// Maximum length in bytes of a single document field name.
pub const MAX_FIELD_NAME_SIZE: usize = 64 * 1024;

/// Maximum size in bytes of one encoded document, headers included.
pub const MAX_DOCUMENT_SIZE: usize = 32 * 1024 * 1024;
