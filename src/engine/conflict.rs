use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;
use super::availability::conflicting_bookings;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Turn a requested check-in/check-out pair into a stay.
pub(crate) fn validate_stay(check_in: NaiveDate, check_out: NaiveDate) -> Result<DateSpan, EngineError> {
    if check_out <= check_in {
        return Err(EngineError::InvalidRange { check_in, check_out });
    }
    let stay = DateSpan::new(check_in, check_out);
    if stay.days() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(stay)
}

/// Reporting window `[start, end)`.
pub(crate) fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<DateSpan, EngineError> {
    if end <= start {
        return Err(EngineError::InvalidRange {
            check_in: start,
            check_out: end,
        });
    }
    let window = DateSpan::new(start, end);
    if window.days() > MAX_REPORT_WINDOW_DAYS {
        return Err(EngineError::LimitExceeded("report window too wide"));
    }
    Ok(window)
}

pub(crate) fn validate_text(text: &Option<String>) -> Result<(), EngineError> {
    match text {
        Some(t) if t.len() > MAX_TEXT_LEN => Err(EngineError::LimitExceeded("text field too long")),
        _ => Ok(()),
    }
}

pub(crate) fn validate_name(name: &Option<String>) -> Result<(), EngineError> {
    match name {
        Some(n) if n.len() > MAX_NAME_LEN => Err(EngineError::LimitExceeded("room name too long")),
        _ => Ok(()),
    }
}

pub(crate) fn validate_rates(rates: &RoomRates) -> Result<(), EngineError> {
    if rates.price_per_night < Decimal::ZERO {
        return Err(EngineError::InvalidInput("price per night must not be negative"));
    }
    let pct_ok = |p: Decimal| p >= Decimal::ZERO && p <= Decimal::ONE_HUNDRED;
    if !pct_ok(rates.weekly_discount_pct) || !pct_ok(rates.monthly_discount_pct) {
        return Err(EngineError::InvalidInput("discount percentage must be between 0 and 100"));
    }
    Ok(())
}

/// Fail with the first active booking overlapping `stay`, ignoring `exclude`.
pub(crate) fn check_no_conflict(
    rs: &RoomState,
    stay: &DateSpan,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match conflicting_bookings(rs, *stay, exclude).next() {
        Some(existing) => Err(EngineError::Conflict(existing.id)),
        None => Ok(()),
    }
}

/// Status guard for lifecycle transitions.
pub(crate) fn require_status(
    booking: &Booking,
    expected: BookingStatus,
    action: &'static str,
) -> Result<(), EngineError> {
    if booking.status != expected {
        return Err(EngineError::InvalidState {
            id: booking.id,
            status: booking.status,
            action,
        });
    }
    Ok(())
}
