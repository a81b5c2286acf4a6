/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monotonic request counter used to decide which completion is authoritative.
pub type Generation = u64;
