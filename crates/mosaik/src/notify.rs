//! Notification bus: synchronous fan-out of tile-layer events.
//!
//! Payloads are a closed enum, so a handler matches on exactly the variants
//! it cares about instead of downcasting. Handlers subscribe per
//! [`NotificationKind`] and run in subscription order when a notification of
//! that kind is posted.
//!
//! The bus is shared through `Rc` and takes `&self` everywhere, so a handler
//! may subscribe or unsubscribe while a post is in flight. Each post works on
//! a snapshot of the handlers present when it started.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Something that happened in the tile layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TileSheetLoaded { url: String },
    TileSheetFailed { url: String, reason: String },
    TileCreated { id: String },
    TileDisposed { id: String },
}

/// Discriminant of [`Notification`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    TileSheetLoaded,
    TileSheetFailed,
    TileCreated,
    TileDisposed,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::TileSheetLoaded { .. } => NotificationKind::TileSheetLoaded,
            Notification::TileSheetFailed { .. } => NotificationKind::TileSheetFailed,
            Notification::TileCreated { .. } => NotificationKind::TileCreated,
            Notification::TileDisposed { .. } => NotificationKind::TileDisposed,
        }
    }
}

/// Token returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Handler = Rc<dyn Fn(&Notification)>;

struct Listener {
    kind: NotificationKind,
    subscription: Subscription,
    handler: Handler,
}

#[derive(Default)]
pub struct NotificationBus {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every notification of `kind`.
    pub fn subscribe(
        &self,
        kind: NotificationKind,
        handler: impl Fn(&Notification) + 'static,
    ) -> Subscription {
        self.subscribe_many(&[kind], handler)
    }

    /// One handler for several kinds, removed together by `unsubscribe`.
    pub fn subscribe_many(
        &self,
        kinds: &[NotificationKind],
        handler: impl Fn(&Notification) + 'static,
    ) -> Subscription {
        let subscription = Subscription(self.next_id.get());
        self.next_id.set(subscription.0 + 1);
        let handler: Handler = Rc::new(handler);
        let mut listeners = self.listeners.borrow_mut();
        for &kind in kinds {
            listeners.push(Listener {
                kind,
                subscription,
                handler: Rc::clone(&handler),
            });
        }
        subscription
    }

    /// Remove the subscription from every kind. Returns false if it was not
    /// subscribed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.subscription != subscription);
        listeners.len() != before
    }

    /// Deliver `notification` to its kind's handlers. Returns how many ran.
    pub fn post(&self, notification: &Notification) -> usize {
        let kind = notification.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Rc::clone(&l.handler))
            .collect();
        for handler in &handlers {
            handler(notification);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: NotificationKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Log every subscription at debug level.
    pub fn dump_subscriptions(&self) {
        let listeners = self.listeners.borrow();
        log::debug!("Notification bus: {} subscriptions", listeners.len());
        for listener in listeners.iter() {
            log::debug!("  {:?} -> subscription {}", listener.kind, listener.subscription.0);
        }
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscriptions", &self.listeners.borrow().len())
            .finish()
    }
}
