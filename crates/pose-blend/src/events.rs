//! Host lifecycle events and subscriptions

use bitflags::bitflags;

bitflags! {
    /// Set of lifecycle events a subscriber listens to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u8 {
        /// Dependency graph was re-evaluated
        const DEPSGRAPH_UPDATE = 0x01;
        /// Current frame changed
        const FRAME_CHANGE     = 0x02;
        /// An undo step was performed
        const UNDO             = 0x04;
        /// A document is about to be loaded
        const LOAD_PRE         = 0x08;

        /// Events that trigger a blend update
        const UPDATE = Self::DEPSGRAPH_UPDATE.bits() | Self::FRAME_CHANGE.bits();
    }
}

/// Event raised by the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    DepsgraphUpdate,
    FrameChange,
    Undo,
    LoadPre,
}

impl LifecycleEvent {
    pub fn kind(self) -> EventKinds {
        match self {
            Self::DepsgraphUpdate => EventKinds::DEPSGRAPH_UPDATE,
            Self::FrameChange => EventKinds::FRAME_CHANGE,
            Self::Undo => EventKinds::UNDO,
            Self::LoadPre => EventKinds::LOAD_PRE,
        }
    }
}

/// Token returned by [`Dispatcher::subscribe`]
///
/// Not `Clone`: handing it back to [`Dispatcher::unsubscribe`] consumes it,
/// so a subscription can only be removed once.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a subscription without unsubscribing leaks it"]
pub struct Subscription {
    id: u64,
}

#[derive(Debug)]
struct Subscriber<T> {
    id: u64,
    kinds: EventKinds,
    target: T,
}

/// Routes lifecycle events to subscribed targets
#[derive(Debug)]
pub struct Dispatcher<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> Dispatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kinds: EventKinds, target: T) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kinds, target });
        Subscription { id }
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != subscription.id);
        self.subscribers.len() != before
    }

    /// Point an existing subscription at a new target
    pub fn retarget(&mut self, subscription: &Subscription, target: T) -> bool {
        match self.subscribers.iter_mut().find(|s| s.id == subscription.id) {
            Some(subscriber) => {
                subscriber.target = target;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the targets listening to `event`, in subscription order
    ///
    /// The snapshot lets handlers subscribe or unsubscribe while the event
    /// is being delivered.
    pub fn targets(&self, event: LifecycleEvent) -> Vec<T> {
        let kind = event.kind();
        self.subscribers
            .iter()
            .filter(|s| s.kinds.intersects(kind))
            .map(|s| s.target.clone())
            .collect()
    }

    /// Drop every subscription
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
