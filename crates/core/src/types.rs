/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (leave ranges, schedule days, due dates) carry no zone.
pub type Date = chrono::NaiveDate;
