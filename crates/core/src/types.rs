/// Owner / caller discriminator used to partition cached generations.
pub type OwnerId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
