mod availability;
mod conflict;
mod error;
mod journal;
mod mutations;
mod pricing;
mod queries;
mod store;

pub use availability::{availability, bed_availability, conflicting_bookings};
pub use error::EngineError;
pub use journal::{Journal, MemoryJournal, WalJournal};
pub use pricing::{MONTHLY_TIER_NIGHTS, WEEKLY_TIER_NIGHTS, discount_tier, quote};
pub use store::{BookingClaim, RoomStore, SharedRoomState};

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

use store::event_room_id;

pub struct Engine {
    pub(super) store: RoomStore,
    journal: Arc<dyn Journal>,
    /// Held shared by room creation, exclusively by compaction, so a room
    /// created mid-compaction is never dropped from the rewritten journal.
    registry_gate: RwLock<()>,
}

impl Engine {
    /// Replay the journal at `wal_path` and keep appending to it.
    /// Must be called inside a tokio runtime (spawns the journal writer).
    pub fn open(wal_path: &Path) -> io::Result<Self> {
        let replay = Wal::replay(wal_path)?;
        if let Some(damage) = replay.damage {
            tracing::warn!(
                "journal {} has a damaged tail ({damage:?}); recovered {} records",
                wal_path.display(),
                replay.events.len()
            );
            Wal::rewrite(wal_path, &replay.events)?;
        }
        let journal = WalJournal::open(wal_path)?;
        Ok(Self::with_journal(Arc::new(journal), &replay.events))
    }

    /// Build state from `history`, then commit new records to `journal`.
    pub fn with_journal(journal: Arc<dyn Journal>, history: &[Event]) -> Self {
        let engine = Self {
            store: RoomStore::new(),
            journal,
            registry_gate: RwLock::new(()),
        };

        // We own every lock here, so try_write never contends.
        for event in history {
            match event {
                Event::RoomCreated { room } => {
                    engine.store.insert_room(RoomState::new(room.clone()));
                }
                Event::RoomSnapshot { room, bookings } => {
                    engine.store.insert_room(RoomState {
                        room: room.clone(),
                        bookings: bookings.clone(),
                    });
                }
                other => {
                    let Some(room_id) = event_room_id(other) else { continue };
                    let Some(rs) = engine.store.get_room(&room_id) else {
                        tracing::warn!("replay: record for unknown room {room_id} skipped");
                        continue;
                    };
                    if let Ok(mut guard) = rs.try_write() {
                        engine.store.apply_event(&mut guard, other);
                    }
                }
            }
        }

        engine
    }

    pub fn room_count(&self) -> usize {
        self.store.room_count()
    }

    pub(super) fn room_handle(&self, room_id: &Ulid) -> Result<SharedRoomState, EngineError> {
        self.store
            .get_room(room_id)
            .ok_or(EngineError::NotFound(*room_id))
    }

    /// Journal first, then memory. If the append fails nothing is applied.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.journal.append(event).await?;
        self.store.apply_event(rs, event);
        Ok(())
    }

    /// Lookup booking → room, then take the room's write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let room_id = self
            .store
            .room_for_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let rs = self.room_handle(&room_id)?;
        Ok(rs.write_owned().await)
    }
}
