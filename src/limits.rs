/// Rooms held by a single engine.
pub const MAX_ROOMS: usize = 100_000;

/// Ledger entries (all statuses) on one room before new bookings are refused.
pub const MAX_BOOKINGS_PER_ROOM: usize = 50_000;

/// Longest stay a single booking may cover.
pub const MAX_STAY_NIGHTS: i64 = 366;

/// Widest window accepted by reporting queries (occupancy, revenue).
pub const MAX_REPORT_WINDOW_DAYS: i64 = 3_660;

pub const MAX_NAME_LEN: usize = 256;

/// Free-text booking fields: special requests, notes, cancellation reason.
pub const MAX_TEXT_LEN: usize = 4_096;

/// Largest blob accepted by an upload store.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
