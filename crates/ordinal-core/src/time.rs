use time::OffsetDateTime;

/// Current wall-clock time in UTC.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
