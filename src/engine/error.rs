use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Requested dates overlap the named booking.
    Conflict(Ulid),
    InvalidState {
        id: Ulid,
        status: BookingStatus,
        action: &'static str,
    },
    RoomInactive(Ulid),
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    InvalidInput(&'static str),
    LimitExceeded(&'static str),
    Storage(String),
}

impl EngineError {
    /// Status code an HTTP front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::Storage(_) => 500,
            EngineError::AlreadyExists(_)
            | EngineError::Conflict(_)
            | EngineError::InvalidState { .. }
            | EngineError::RoomInactive(_)
            | EngineError::InvalidRange { .. }
            | EngineError::InvalidInput(_)
            | EngineError::LimitExceeded(_) => 400,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::Conflict(_) => "conflict",
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::RoomInactive(_) => "room_inactive",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::Storage(_) => "storage",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Conflict(id) => {
                write!(f, "room is already booked for these dates (booking {id})")
            }
            EngineError::InvalidState { id, status, action } => {
                write!(f, "cannot {action} booking {id}: status is {status}")
            }
            EngineError::RoomInactive(id) => write!(f, "room {id} is not accepting bookings"),
            EngineError::InvalidRange { check_in, check_out } => {
                write!(
                    f,
                    "check-out date {check_out} must be after check-in date {check_in}"
                )
            }
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
