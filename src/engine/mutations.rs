use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{self, track};

use super::conflict::*;
use super::pricing::quote;
use super::{Engine, EngineError};

impl Engine {
    // ── Room registry ────────────────────────────────────────

    pub async fn create_room(
        &self,
        id: Ulid,
        hostel_id: Ulid,
        name: Option<String>,
        capacity: u32,
        rates: RoomRates,
    ) -> Result<Room, EngineError> {
        track("create_room", async {
            validate_name(&name)?;
            validate_rates(&rates)?;
            let _registry = self.registry_gate.read().await;
            if self.store.room_count() >= MAX_ROOMS {
                return Err(EngineError::LimitExceeded("too many rooms"));
            }
            if self.store.contains_room(&id) {
                return Err(EngineError::AlreadyExists(id));
            }

            let room = Room {
                id,
                hostel_id,
                name,
                capacity,
                rates,
                available_rooms: capacity,
                is_active: true,
            };
            self.journal
                .append(&Event::RoomCreated { room: room.clone() })
                .await?;
            self.store.insert_room(RoomState::new(room.clone()));
            metrics::gauge!(observability::ROOMS_TOTAL).set(self.store.room_count() as f64);
            info!("room {id} created in hostel {hostel_id} with {capacity} beds");
            Ok(room)
        })
        .await
    }

    /// Change name, capacity or rates. The counter follows the capacity delta.
    pub async fn update_room(
        &self,
        id: Ulid,
        name: Option<String>,
        capacity: u32,
        rates: RoomRates,
    ) -> Result<Room, EngineError> {
        track("update_room", async {
            validate_name(&name)?;
            validate_rates(&rates)?;
            let rs = self.room_handle(&id)?;
            let mut guard = rs.write().await;
            let event = Event::RoomUpdated { id, name, capacity, rates };
            self.persist_and_apply(&mut guard, &event).await?;
            Ok(guard.room.clone())
        })
        .await
    }

    /// Soft delete: the room keeps its ledger but takes no new bookings.
    pub async fn deactivate_room(&self, id: Ulid) -> Result<Room, EngineError> {
        self.set_room_active(id, false).await
    }

    pub async fn activate_room(&self, id: Ulid) -> Result<Room, EngineError> {
        self.set_room_active(id, true).await
    }

    async fn set_room_active(&self, id: Ulid, active: bool) -> Result<Room, EngineError> {
        track("set_room_active", async {
            let rs = self.room_handle(&id)?;
            let mut guard = rs.write().await;
            if guard.room.is_active != active {
                self.persist_and_apply(&mut guard, &Event::RoomActiveSet { id, active })
                    .await?;
                info!("room {id} active={active}");
            }
            Ok(guard.room.clone())
        })
        .await
    }

    // ── Booking lifecycle ────────────────────────────────────

    /// Check, price and record a booking as one transaction on the room:
    /// the booking insert and the counter update share one journal record.
    pub async fn create_booking(&self, req: BookingRequest) -> Result<Booking, EngineError> {
        track("create_booking", async {
            let stay = validate_stay(req.check_in, req.check_out)?;
            validate_text(&req.special_requests)?;
            if req.guest_count == 0 {
                return Err(EngineError::InvalidInput("guest count must be at least 1"));
            }
            // Held until the record is applied, so a concurrent create with
            // the same id on another room sees it taken.
            let claim = self
                .store
                .claim_booking_id(req.id, req.room_id)
                .ok_or(EngineError::AlreadyExists(req.id))?;

            let rs = self.room_handle(&req.room_id)?;
            let mut guard = rs.write().await;
            if !guard.room.is_active {
                return Err(EngineError::RoomInactive(req.room_id));
            }
            if req.guest_count > guard.room.capacity {
                return Err(EngineError::InvalidInput("guest count exceeds room capacity"));
            }
            if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
                return Err(EngineError::LimitExceeded("too many bookings on room"));
            }
            if let Err(e) = check_no_conflict(&guard, &stay, None) {
                metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                debug!("booking {} refused on room {}: {e}", req.id, req.room_id);
                return Err(e);
            }

            let price = quote(&guard.room.rates, &stay);
            let booking = Booking {
                id: req.id,
                room_id: req.room_id,
                hostel_id: guard.room.hostel_id,
                guest_id: req.guest_id,
                stay,
                guest_count: req.guest_count,
                status: BookingStatus::Confirmed,
                total_price: price.total_price,
                discount_type: price.discount_type,
                special_requests: req.special_requests,
                notes: None,
                cancellation_reason: None,
                created_at: now(),
                cancelled_at: None,
                check_in_time: None,
                check_out_time: None,
            };
            let event = Event::BookingCreated {
                booking: booking.clone(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            claim.commit();
            info!(
                "booking {} confirmed on room {} for [{}, {}) total {}",
                booking.id, booking.room_id, stay.start, stay.end, booking.total_price
            );
            Ok(booking)
        })
        .await
    }

    /// Only confirmed bookings can be cancelled; the room gets its unit back.
    pub async fn cancel_booking(
        &self,
        id: Ulid,
        reason: Option<String>,
    ) -> Result<Booking, EngineError> {
        track("cancel_booking", async {
            validate_text(&reason)?;
            let mut guard = self.resolve_booking_write(&id).await?;
            let booking = guard.booking(&id).ok_or(EngineError::NotFound(id))?;
            require_status(booking, BookingStatus::Confirmed, "cancel")?;

            let event = Event::BookingCancelled {
                id,
                room_id: booking.room_id,
                reason,
                at: now(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            info!("booking {id} cancelled");
            guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
        })
        .await
    }

    pub async fn check_in(&self, id: Ulid) -> Result<Booking, EngineError> {
        track("check_in", async {
            let mut guard = self.resolve_booking_write(&id).await?;
            let booking = guard.booking(&id).ok_or(EngineError::NotFound(id))?;
            require_status(booking, BookingStatus::Confirmed, "check in")?;

            let event = Event::BookingCheckedIn {
                id,
                room_id: booking.room_id,
                at: now(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            info!("booking {id} checked in");
            guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
        })
        .await
    }

    /// Checked-out stays stop holding a unit of the room counter.
    pub async fn check_out(&self, id: Ulid) -> Result<Booking, EngineError> {
        track("check_out", async {
            let mut guard = self.resolve_booking_write(&id).await?;
            let booking = guard.booking(&id).ok_or(EngineError::NotFound(id))?;
            require_status(booking, BookingStatus::CheckedIn, "check out")?;

            let event = Event::BookingCheckedOut {
                id,
                room_id: booking.room_id,
                at: now(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            info!("booking {id} checked out");
            guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
        })
        .await
    }

    /// Apply a patch of check-out date, special requests and notes.
    /// A new check-out date is re-validated against the room's other bookings
    /// and re-priced.
    pub async fn update_booking(&self, id: Ulid, patch: BookingPatch) -> Result<Booking, EngineError> {
        track("update_booking", async {
            validate_text(&patch.special_requests)?;
            validate_text(&patch.notes)?;
            let mut guard = self.resolve_booking_write(&id).await?;
            let booking = guard.booking(&id).ok_or(EngineError::NotFound(id))?;
            if booking.status.is_terminal() {
                return Err(EngineError::InvalidState {
                    id,
                    status: booking.status,
                    action: "update",
                });
            }
            if patch == BookingPatch::default() {
                return Ok(booking.clone());
            }

            let (stay, total_price, discount_type) = match patch.check_out {
                Some(check_out) if check_out != booking.stay.end => {
                    let stay = validate_stay(booking.stay.start, check_out)?;
                    check_no_conflict(&guard, &stay, Some(id))?;
                    let price = quote(&guard.room.rates, &stay);
                    (stay, price.total_price, price.discount_type)
                }
                _ => (booking.stay, booking.total_price, booking.discount_type),
            };
            let event = Event::BookingUpdated {
                id,
                room_id: booking.room_id,
                stay,
                total_price,
                discount_type,
                special_requests: patch.special_requests.or_else(|| booking.special_requests.clone()),
                notes: patch.notes.or_else(|| booking.notes.clone()),
            };
            self.persist_and_apply(&mut guard, &event).await?;
            debug!("booking {id} updated");
            guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
        })
        .await
    }

    // ── Counter maintenance ──────────────────────────────────

    /// Recompute every room's availability counter from its ledger and commit
    /// a correction for each room that drifted. Returns the corrections.
    pub async fn reconcile_counters(&self) -> Result<Vec<CounterDrift>, EngineError> {
        track("reconcile_counters", async {
            let mut repaired = Vec::new();
            for room_id in self.store.room_ids() {
                let Some(rs) = self.store.get_room(&room_id) else { continue };
                let mut guard = rs.write().await;
                let expected = guard.expected_available();
                let cached = guard.room.available_rooms;
                if cached == expected {
                    continue;
                }
                let event = Event::CounterReconciled {
                    id: room_id,
                    available_rooms: expected,
                };
                self.persist_and_apply(&mut guard, &event).await?;
                metrics::counter!(observability::COUNTER_DRIFT_TOTAL).increment(1);
                warn!("room {room_id} counter drifted: cached {cached}, ledger says {expected}");
                repaired.push(CounterDrift { room_id, cached, expected });
            }
            Ok(repaired)
        })
        .await
    }

    // ── Journal maintenance ──────────────────────────────────

    /// Rewrite the journal as one snapshot record per room.
    pub async fn compact_journal(&self) -> Result<(), EngineError> {
        track("compact_journal", async {
            let mut room_ids = self.store.room_ids();
            room_ids.sort();

            // Read guards on every room block mutations for the duration;
            // the registry gate blocks room creation.
            let mut guards = Vec::with_capacity(room_ids.len());
            for room_id in &room_ids {
                if let Some(rs) = self.store.get_room(room_id) {
                    guards.push(rs.read_owned().await);
                }
            }
            let _registry = self.registry_gate.write().await;

            let events = guards
                .iter()
                .map(|g| Event::RoomSnapshot {
                    room: g.room.clone(),
                    bookings: g.bookings.clone(),
                })
                .collect();
            self.journal.compact(events).await?;
            info!("journal compacted to {} room snapshots", guards.len());
            Ok(())
        })
        .await
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        self.journal.appends_since_compact().await
    }
}
