use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::*;

use super::availability::{availability, bed_availability};
use super::conflict::{validate_stay, validate_window};
use super::pricing::quote;
use super::{Engine, EngineError};

impl Engine {
    // ── Availability ─────────────────────────────────────────

    pub async fn is_available(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_booking_id: Option<Ulid>,
    ) -> Result<Availability, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        Ok(availability(&guard, &stay, exclude_booking_id))
    }

    pub async fn bed_availability(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<BedAvailability, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        Ok(bed_availability(&guard, &stay))
    }

    pub async fn price(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<PriceQuote, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        Ok(quote(&guard.room.rates, &stay))
    }

    /// Active rooms of a hostel, in creation order, that are free for the stay
    /// and still have a bed, each with its price.
    pub async fn list_available_rooms(
        &self,
        hostel_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<AvailableRoom>, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let mut result = Vec::new();
        for room_id in self.store.hostel_room_ids(&hostel_id) {
            let Some(rs) = self.store.get_room(&room_id) else { continue };
            let guard = rs.read().await;
            if !guard.room.is_active || !availability(&guard, &stay, None).available {
                continue;
            }
            let beds = bed_availability(&guard, &stay);
            if beds.available_beds == 0 {
                continue;
            }
            result.push(AvailableRoom {
                room: guard.room.clone(),
                beds,
                quote: quote(&guard.room.rates, &stay),
            });
        }
        Ok(result)
    }

    // ── Reporting ────────────────────────────────────────────

    /// Booked bed-nights over offered bed-nights for stays that lie entirely
    /// inside `[start, end)`. Cancelled bookings are left out.
    pub async fn occupancy_rate(
        &self,
        room_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OccupancyReport, EngineError> {
        let window = validate_window(start, end)?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;

        let booked_bed_nights: u64 = guard
            .bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled && window.contains_span(&b.stay))
            .map(|b| b.stay.days() as u64 * u64::from(b.guest_count))
            .sum();
        let capacity_bed_nights = u64::from(guard.room.capacity) * window.days() as u64;
        let rate_pct = if capacity_bed_nights == 0 {
            0
        } else {
            let pct = (booked_bed_nights * 100 + capacity_bed_nights / 2) / capacity_bed_nights;
            u32::try_from(pct).unwrap_or(u32::MAX)
        };

        Ok(OccupancyReport {
            booked_bed_nights,
            capacity_bed_nights,
            rate_pct,
        })
    }

    /// Revenue from non-cancelled bookings whose stay lies inside `[start, end)`.
    pub async fn revenue(
        &self,
        room_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RevenueReport, EngineError> {
        let window = validate_window(start, end)?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;

        let (total, bookings) = guard
            .bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled && window.contains_span(&b.stay))
            .fold((Decimal::ZERO, 0usize), |(sum, n), b| (sum + b.total_price, n + 1));
        let average = if bookings == 0 {
            Decimal::ZERO
        } else {
            (total / Decimal::from(bookings)).round_dp(2)
        };

        Ok(RevenueReport {
            total,
            bookings,
            average,
        })
    }

    /// Rooms whose cached counter disagrees with their ledger. Read-only.
    pub async fn counter_drift(&self) -> Vec<CounterDrift> {
        let mut drift = Vec::new();
        for room_id in self.store.room_ids() {
            let Some(rs) = self.store.get_room(&room_id) else { continue };
            let guard = rs.read().await;
            let expected = guard.expected_available();
            if guard.room.available_rooms != expected {
                drift.push(CounterDrift {
                    room_id,
                    cached: guard.room.available_rooms,
                    expected,
                });
            }
        }
        drift
    }

    // ── Lookups ──────────────────────────────────────────────

    pub async fn get_room(&self, room_id: Ulid) -> Result<Room, EngineError> {
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        Ok(guard.room.clone())
    }

    /// All rooms of a hostel, active or not, in creation order.
    pub async fn list_rooms(&self, hostel_id: Ulid) -> Vec<Room> {
        let mut rooms = Vec::new();
        for room_id in self.store.hostel_room_ids(&hostel_id) {
            if let Some(rs) = self.store.get_room(&room_id) {
                rooms.push(rs.read().await.room.clone());
            }
        }
        rooms
    }

    pub async fn get_booking(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        let room_id = self
            .store
            .room_for_booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        guard
            .booking(&booking_id)
            .cloned()
            .ok_or(EngineError::NotFound(booking_id))
    }

    /// Every booking on a room, ordered by check-in date.
    pub async fn list_bookings(&self, room_id: Ulid) -> Result<Vec<Booking>, EngineError> {
        let rs = self.room_handle(&room_id)?;
        let guard = rs.read().await;
        Ok(guard.bookings.clone())
    }

    pub async fn list_guest_bookings(&self, guest_id: Ulid) -> Vec<Booking> {
        let mut found = Vec::new();
        for room_id in self.store.room_ids() {
            let Some(rs) = self.store.get_room(&room_id) else { continue };
            let guard = rs.read().await;
            found.extend(guard.bookings.iter().filter(|b| b.guest_id == guest_id).cloned());
        }
        found.sort_by_key(|b| (b.stay.start, b.id));
        found
    }
}
