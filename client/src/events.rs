use std::sync::{Arc, Mutex, Weak};

use tabletop_shared::color::Color;
use tabletop_shared::seat::{ParticipantId, SeatIndex};

/// Change notifications raised when a replica applies host state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `participant` is the new occupant, or the one who left when `occupied` is false.
    SeatOccupancyChanged {
        slot: SeatIndex,
        occupied: bool,
        participant: Option<ParticipantId>,
    },
    /// `None` when the participant's color was cleared.
    PlayerColorChanged {
        participant: ParticipantId,
        color: Option<Color>,
    },
    PlayerSeatChanged {
        participant: ParticipantId,
        old: Option<SeatIndex>,
        new: Option<SeatIndex>,
    },
    ActivePlayerChanged {
        index: Option<SeatIndex>,
    },
    ColorPaletteChanged,
    /// Clamped seat count of the new layout. The layout is sized by the
    /// highest occupied seat, not the occupant count: four occupants with a
    /// gap can keep a five-seat polygon, and occupants leaving below the
    /// highest seat do not raise this event.
    LayoutChanged {
        count: usize,
    },
    ColorConflictResolved {
        participant: ParticipantId,
        requested: Color,
        assigned: Color,
    },
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Typed fan-out of session events. Cloning shares the listener list.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let mut id = 0;
        if let Ok(mut listeners) = self.listeners.lock() {
            id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
        }
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Listeners run outside the lock, so they may subscribe or drop subscriptions.
    pub fn publish(&self, event: &SessionEvent) {
        let snapshot: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners.entries.iter().map(|(_, l)| l.clone()).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|l| l.entries.len())
            .unwrap_or(0)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
