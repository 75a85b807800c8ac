use ulid::Ulid;

use crate::model::*;

// ── Availability ──────────────────────────────────────────────────

/// Active bookings (confirmed or checked in) whose stay overlaps `stay`,
/// optionally skipping one booking id (used when a booking re-validates itself).
pub fn conflicting_bookings<'a>(
    rs: &'a RoomState,
    stay: DateSpan,
    exclude: Option<Ulid>,
) -> impl Iterator<Item = &'a Booking> + 'a {
    rs.overlapping(stay)
        .filter(move |b| b.status.is_active() && Some(b.id) != exclude)
}

/// Room-level check: free iff no active booking overlaps the stay.
pub fn availability(rs: &RoomState, stay: &DateSpan, exclude: Option<Ulid>) -> Availability {
    let conflicting_count = conflicting_bookings(rs, *stay, exclude).count();
    Availability {
        available: conflicting_count == 0,
        conflicting_count,
    }
}

/// Bed-level view over the same conflicting set. A booking counts at least one bed.
pub fn bed_availability(rs: &RoomState, stay: &DateSpan) -> BedAvailability {
    let occupied_beds = conflicting_bookings(rs, *stay, None)
        .map(|b| b.guest_count.max(1))
        .fold(0u32, u32::saturating_add);
    BedAvailability {
        occupied_beds,
        available_beds: rs.room.capacity.saturating_sub(occupied_beds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn span(a: u32, b: u32) -> DateSpan {
        DateSpan::new(d(a), d(b))
    }

    fn make_room(capacity: u32) -> RoomState {
        RoomState::new(Room {
            id: Ulid::new(),
            hostel_id: Ulid::new(),
            name: None,
            capacity,
            rates: RoomRates::flat(Decimal::from(30)),
            available_rooms: capacity,
            is_active: true,
        })
    }

    fn add(rs: &mut RoomState, a: u32, b: u32, guests: u32, status: BookingStatus) -> Ulid {
        let id = Ulid::new();
        rs.insert_booking(Booking {
            id,
            room_id: rs.room.id,
            hostel_id: rs.room.hostel_id,
            guest_id: Ulid::new(),
            stay: span(a, b),
            guest_count: guests,
            status,
            total_price: Decimal::ZERO,
            discount_type: DiscountType::None,
            special_requests: None,
            notes: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            cancelled_at: None,
            check_in_time: None,
            check_out_time: None,
        });
        id
    }

    #[test]
    fn empty_room_is_available() {
        let rs = make_room(4);
        let a = availability(&rs, &span(10, 15), None);
        assert!(a.available);
        assert_eq!(a.conflicting_count, 0);
        assert_eq!(
            bed_availability(&rs, &span(10, 15)),
            BedAvailability { occupied_beds: 0, available_beds: 4 }
        );
    }

    #[test]
    fn overlap_makes_room_unavailable() {
        let mut rs = make_room(4);
        add(&mut rs, 10, 15, 2, BookingStatus::Confirmed);
        let a = availability(&rs, &span(12, 18), None);
        assert!(!a.available);
        assert_eq!(a.conflicting_count, 1);
    }

    #[test]
    fn back_to_back_stays_do_not_conflict() {
        let mut rs = make_room(1);
        add(&mut rs, 10, 15, 1, BookingStatus::Confirmed);
        assert!(availability(&rs, &span(15, 20), None).available);
        assert!(availability(&rs, &span(5, 10), None).available);
    }

    #[test]
    fn inactive_statuses_are_ignored() {
        let mut rs = make_room(2);
        add(&mut rs, 10, 15, 1, BookingStatus::Cancelled);
        add(&mut rs, 10, 15, 1, BookingStatus::CheckedOut);
        assert!(availability(&rs, &span(10, 15), None).available);

        add(&mut rs, 11, 12, 1, BookingStatus::CheckedIn);
        assert!(!availability(&rs, &span(10, 15), None).available);
    }

    #[test]
    fn excluded_booking_does_not_count() {
        let mut rs = make_room(2);
        let own = add(&mut rs, 10, 15, 1, BookingStatus::Confirmed);
        assert!(availability(&rs, &span(10, 18), Some(own)).available);
        let other = add(&mut rs, 16, 20, 1, BookingStatus::Confirmed);
        let a = availability(&rs, &span(10, 18), Some(own));
        assert!(!a.available);
        assert_eq!(conflicting_bookings(&rs, span(10, 18), Some(own)).next().map(|b| b.id), Some(other));
    }

    #[test]
    fn beds_sum_guest_counts() {
        let mut rs = make_room(6);
        add(&mut rs, 1, 5, 2, BookingStatus::Confirmed);
        add(&mut rs, 5, 9, 3, BookingStatus::CheckedIn);
        add(&mut rs, 3, 7, 4, BookingStatus::Cancelled);
        let beds = bed_availability(&rs, &span(4, 6));
        assert_eq!(beds, BedAvailability { occupied_beds: 5, available_beds: 1 });
    }

    #[test]
    fn beds_never_go_negative() {
        let mut rs = make_room(2);
        add(&mut rs, 1, 5, 3, BookingStatus::Confirmed);
        let beds = bed_availability(&rs, &span(1, 5));
        assert_eq!(beds.available_beds, 0);
        assert_eq!(beds.occupied_beds, 3);
    }

    #[test]
    fn zero_capacity_room_has_no_beds_but_no_conflicts() {
        let rs = make_room(0);
        assert!(availability(&rs, &span(1, 3), None).available);
        assert_eq!(bed_availability(&rs, &span(1, 3)).available_beds, 0);
    }
}
