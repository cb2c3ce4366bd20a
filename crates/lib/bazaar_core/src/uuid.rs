// Ledger rows are keyed by UUIDv7 so that a user's sessions sort by issue
// time. User ids stay as database-assigned BIGSERIAL values.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a random UUIDv4, used as the `jti` of issued tokens.
pub fn uuidv4() -> Uuid {
    Uuid::new_v4()
}
