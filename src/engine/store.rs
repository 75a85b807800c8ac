use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// In-memory rooms and their ledgers, plus the lookup indexes around them.
///
/// Each room's `RwLock` is its transaction scope: whoever holds the write
/// guard may read the ledger, append to the journal, then apply.
pub struct RoomStore {
    rooms: DashMap<Ulid, SharedRoomState>,
    /// booking id → room id
    booking_to_room: DashMap<Ulid, Ulid>,
    /// hostel id → room ids in creation order
    hostel_rooms: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            booking_to_room: DashMap::new(),
            hostel_rooms: DashMap::new(),
        }
    }

    // ── Rooms ────────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, id: &Ulid) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    /// Register a room (with any ledger it already carries) and index it.
    pub fn insert_room(&self, state: RoomState) {
        let id = state.room.id;
        let hostel_id = state.room.hostel_id;
        for booking in &state.bookings {
            self.booking_to_room.insert(booking.id, id);
        }
        if self.rooms.insert(id, Arc::new(RwLock::new(state))).is_none() {
            self.hostel_rooms.entry(hostel_id).or_default().push(id);
        }
    }

    pub fn room_ids(&self) -> Vec<Ulid> {
        self.rooms.iter().map(|e| *e.key()).collect()
    }

    pub fn hostel_room_ids(&self, hostel_id: &Ulid) -> Vec<Ulid> {
        self.hostel_rooms
            .get(hostel_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    // ── Booking index ────────────────────────────────────────

    pub fn room_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_room.get(booking_id).map(|e| *e.value())
    }

    /// Claim `booking_id` for `room_id` ahead of taking the room's lock.
    /// Returns `None` if the id is already booked or claimed elsewhere.
    /// The claim is released on drop unless committed.
    pub fn claim_booking_id(&self, booking_id: Ulid, room_id: Ulid) -> Option<BookingClaim<'_>> {
        match self.booking_to_room.entry(booking_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(room_id);
                Some(BookingClaim {
                    store: self,
                    booking_id,
                    committed: false,
                })
            }
        }
    }

    // ── Event application ────────────────────────────────────

    /// Apply a committed record to a room. The caller holds the room's write lock.
    /// `RoomCreated` and `RoomSnapshot` act on the map itself and are ignored here.
    pub fn apply_event(&self, rs: &mut RoomState, event: &Event) {
        match event {
            Event::RoomUpdated {
                name,
                capacity,
                rates,
                ..
            } => {
                rs.room.name = name.clone();
                rs.room.capacity = *capacity;
                rs.room.rates = *rates;
                rs.refresh_counter();
            }
            Event::RoomActiveSet { active, .. } => {
                rs.room.is_active = *active;
            }
            Event::BookingCreated { booking } => {
                self.booking_to_room.insert(booking.id, booking.room_id);
                rs.insert_booking(booking.clone());
                rs.refresh_counter();
            }
            Event::BookingCancelled { id, reason, at, .. } => {
                if let Some(b) = rs.booking_mut(id) {
                    b.status = BookingStatus::Cancelled;
                    b.cancellation_reason = reason.clone();
                    b.cancelled_at = Some(*at);
                }
                rs.refresh_counter();
            }
            Event::BookingCheckedIn { id, at, .. } => {
                if let Some(b) = rs.booking_mut(id) {
                    b.status = BookingStatus::CheckedIn;
                    b.check_in_time = Some(*at);
                }
            }
            Event::BookingCheckedOut { id, at, .. } => {
                if let Some(b) = rs.booking_mut(id) {
                    b.status = BookingStatus::CheckedOut;
                    b.check_out_time = Some(*at);
                }
                rs.refresh_counter();
            }
            Event::BookingUpdated {
                id,
                stay,
                total_price,
                discount_type,
                special_requests,
                notes,
                ..
            } => {
                if let Some(mut b) = rs.take_booking(id) {
                    b.stay = *stay;
                    b.total_price = *total_price;
                    b.discount_type = *discount_type;
                    b.special_requests = special_requests.clone();
                    b.notes = notes.clone();
                    rs.insert_booking(b);
                }
            }
            Event::CounterReconciled {
                available_rooms, ..
            } => {
                rs.room.available_rooms = (*available_rooms).min(rs.room.capacity);
            }
            Event::RoomCreated { .. } | Event::RoomSnapshot { .. } => {}
        }
    }
}

/// A booking id held in the index while its booking is being created.
pub struct BookingClaim<'a> {
    store: &'a RoomStore,
    booking_id: Ulid,
    committed: bool,
}

impl BookingClaim<'_> {
    /// The booking is recorded; keep the index entry.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for BookingClaim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.booking_to_room.remove(&self.booking_id);
        }
    }
}

/// The room an event touches, for events applied through `apply_event`.
pub(super) fn event_room_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::RoomUpdated { id, .. }
        | Event::RoomActiveSet { id, .. }
        | Event::CounterReconciled { id, .. } => Some(*id),
        Event::BookingCreated { booking } => Some(booking.room_id),
        Event::BookingCancelled { room_id, .. }
        | Event::BookingCheckedIn { room_id, .. }
        | Event::BookingCheckedOut { room_id, .. }
        | Event::BookingUpdated { room_id, .. } => Some(*room_id),
        Event::RoomCreated { .. } | Event::RoomSnapshot { .. } => None,
    }
}
