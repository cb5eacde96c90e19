/// Length of a weekly pay period, in days
pub const WEEKLY_SPAN_DAYS: i64 = 7;

/// Length of a biweekly pay period, in days
pub const BIWEEKLY_SPAN_DAYS: i64 = 14;

/// Biweekly cycles are anchored on this January day when the company has none configured
pub const DEFAULT_CYCLE_START_DAY: i16 = 1;

/// Upper bound for a single backend call when `CALL_TIMEOUT_SECS` is not set
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// How many periods the preview endpoint returns when no count is given
pub const DEFAULT_PREVIEW_COUNT: u32 = 4;

pub const MAX_PREVIEW_COUNT: u32 = 26;

pub const TOKEN_LIFETIME_WEEKS: i64 = 1;

/// Largest single amount accepted on input, in cents
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
