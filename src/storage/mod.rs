// LogSleuth - storage/mod.rs
//
// Storage adapter layer (§4.F): an abstraction over an opaque document/query
// store. The required shape is `insert_record`, `upsert_template`,
// `insert_file`/`update_file`, `find_records`, `aggregate`, `insert_anomaly`
// plus the read paths the HTTP and anomaly layers need. `sqlite` is the one
// concrete backend this service ships (§9 Open Question: the spec leaves
// the concrete document store abstract; this rewrite picks an embedded
// SQLite database reached through `sqlx`, storing flexible fields as a JSON
// column rather than standing up an external document database).

pub mod adapter;
pub mod sqlite;

pub use adapter::{FileStatsSummary, FileUpdate, HourlyBucket, StatsSummary, StorageAdapter};
pub use sqlite::SqliteStorage;
