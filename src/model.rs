use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open range of calendar days `[start, end)`.
///
/// A stay checking out on day X and another checking in on day X do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "DateSpan start must be before end");
        Self { start, end }
    }

    /// Whole days in the span; for a stay this is the number of nights.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &DateSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    /// Bookings in these states hold the room and take part in conflict checks.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::CheckedOut => "checked-out",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    None,
    Weekly,
    Monthly,
}

/// Nightly price and length-of-stay discount tiers (percentages, 0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRates {
    pub price_per_night: Decimal,
    pub weekly_discount_pct: Decimal,
    pub monthly_discount_pct: Decimal,
}

impl RoomRates {
    pub fn flat(price_per_night: Decimal) -> Self {
        Self {
            price_per_night,
            weekly_discount_pct: Decimal::ZERO,
            monthly_discount_pct: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub hostel_id: Ulid,
    pub name: Option<String>,
    /// Beds in the room.
    pub capacity: u32,
    pub rates: RoomRates,
    /// Denormalized counter, always within `[0, capacity]`. Recomputable from the ledger.
    pub available_rooms: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub hostel_id: Ulid,
    pub guest_id: Ulid,
    pub stay: DateSpan,
    pub guest_count: u32,
    pub status: BookingStatus,
    pub total_price: Decimal,
    pub discount_type: DiscountType,
    pub special_requests: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    /// Every booking ever made on the room, sorted by `stay.start`.
    pub bookings: Vec<Booking>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            bookings: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by stay start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.stay.start, |b| b.stay.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    pub fn booking_mut(&mut self, id: &Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == *id)
    }

    /// Remove and return a booking; used when its stay moves and it must be re-sorted.
    pub fn take_booking(&mut self, id: &Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == *id)?;
        Some(self.bookings.remove(pos))
    }

    /// Return only bookings (of any status) whose stay overlaps the query window.
    /// Uses binary search to skip bookings starting on or after `query.end`.
    pub fn overlapping(&self, query: DateSpan) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.stay.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.stay.end > query.start)
    }

    /// Counter value implied by the ledger: every confirmed or checked-in
    /// booking holds one unit, saturating at zero.
    pub fn expected_available(&self) -> u32 {
        let held = self.bookings.iter().filter(|b| b.status.is_active()).count();
        let held = u32::try_from(held).unwrap_or(u32::MAX);
        self.room.capacity.saturating_sub(held)
    }

    /// Bring the cached counter in line with the ledger. Every record that
    /// touches bookings or capacity ends with this, so applying a record can
    /// never introduce drift.
    pub(crate) fn refresh_counter(&mut self) {
        self.room.available_rooms = self.expected_available();
    }
}

/// Journal record format. One record is one committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated {
        room: Room,
    },
    RoomUpdated {
        id: Ulid,
        name: Option<String>,
        capacity: u32,
        rates: RoomRates,
    },
    RoomActiveSet {
        id: Ulid,
        active: bool,
    },
    /// Inserts the booking and takes one unit off the room counter.
    BookingCreated {
        booking: Booking,
    },
    /// Marks the booking cancelled, which frees its unit.
    BookingCancelled {
        id: Ulid,
        room_id: Ulid,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    BookingCheckedIn {
        id: Ulid,
        room_id: Ulid,
        at: DateTime<Utc>,
    },
    /// Ends the stay and frees its unit.
    BookingCheckedOut {
        id: Ulid,
        room_id: Ulid,
        at: DateTime<Utc>,
    },
    /// Carries the post-update values of every patchable field.
    BookingUpdated {
        id: Ulid,
        room_id: Ulid,
        stay: DateSpan,
        total_price: Decimal,
        discount_type: DiscountType,
        special_requests: Option<String>,
        notes: Option<String>,
    },
    CounterReconciled {
        id: Ulid,
        available_rooms: u32,
    },
    /// Compaction record: restores a room and its ledger exactly.
    RoomSnapshot {
        room: Room,
        bookings: Vec<Booking>,
    },
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingRequest {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest_id: Ulid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub special_requests: Option<String>,
}

/// Fields a booking may change after creation. Anything else in the
/// payload is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(alias = "checkOutDate")]
    pub check_out: Option<NaiveDate>,
    pub special_requests: Option<String>,
    pub notes: Option<String>,
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub conflicting_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BedAvailability {
    pub occupied_beds: u32,
    pub available_beds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub nights: u32,
    pub base_price: Decimal,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableRoom {
    pub room: Room,
    pub beds: BedAvailability,
    pub quote: PriceQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancyReport {
    pub booked_bed_nights: u64,
    pub capacity_bed_nights: u64,
    /// Rounded half-up to a whole percent.
    pub rate_pct: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenueReport {
    pub total: Decimal,
    pub bookings: usize,
    pub average: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub room_id: Ulid,
    pub cached: u32,
    pub expected: u32,
}
