//! Runtime events and the per-type callback table.

use std::collections::HashMap;
use std::fmt;

use crate::types::{RuntimeSessionState, SessionHandle, Time};

/// Key of the callback table. One handler per type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    SessionStateChanged,
    EventsLost,
    InstanceLossPending,
    ReferenceSpaceChangePending,
    InteractionProfileChanged,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    SessionStateChanged {
        session: SessionHandle,
        state: RuntimeSessionState,
        time: Time,
    },
    EventsLost {
        lost_event_count: u32,
    },
    InstanceLossPending {
        loss_time: Time,
    },
    ReferenceSpaceChangePending {
        change_time: Time,
    },
    InteractionProfileChanged,
    Other,
}

impl RuntimeEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            RuntimeEvent::SessionStateChanged { .. } => EventType::SessionStateChanged,
            RuntimeEvent::EventsLost { .. } => EventType::EventsLost,
            RuntimeEvent::InstanceLossPending { .. } => EventType::InstanceLossPending,
            RuntimeEvent::ReferenceSpaceChangePending { .. } => {
                EventType::ReferenceSpaceChangePending
            }
            RuntimeEvent::InteractionProfileChanged => EventType::InteractionProfileChanged,
            RuntimeEvent::Other => EventType::Other,
        }
    }

    /// New session state, if this is a state change.
    pub fn session_state(&self) -> Option<RuntimeSessionState> {
        match self {
            RuntimeEvent::SessionStateChanged { state, .. } => Some(*state),
            _ => None,
        }
    }
}

/// Handlers run synchronously on the frame thread and must not call back
/// into the session controller.
pub type EventCallback = Box<dyn FnMut(&RuntimeEvent)>;

#[derive(Default)]
pub struct EventCallbackTable {
    handlers: HashMap<EventType, EventCallback>,
}

impl EventCallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `callback` for `event_type`. Returns true if it replaced an
    /// existing handler.
    pub fn set(&mut self, event_type: EventType, callback: EventCallback) -> bool {
        self.handlers.insert(event_type, callback).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for the event's type. Returns whether one ran.
    pub fn dispatch(&mut self, event: &RuntimeEvent) -> bool {
        match self.handlers.get_mut(&event.event_type()) {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventCallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
