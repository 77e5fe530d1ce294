//! View notifications.
//!
//! A small synchronous publish/subscribe bus keyed by notification kind and source view.
//! Subscriptions are owned by the tree and are dropped when either their observer or their
//! source view is destroyed.

use crate::tree::ViewTree;
use crate::view::ViewId;
use core::fmt;
use std::sync::Arc;

/// Kinds of notifications views post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A view with `NOTIFY_SIZE_CHANGED` was resized.
    SizeDidChange,
    /// A view got its native surface.
    DidRealize,
}

/// A posted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub source: ViewId,
}

/// Refers to a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

pub type NotificationCallback = Arc<dyn Fn(&mut ViewTree, &Notification)>;

struct Subscription {
    id: SubscriptionId,
    kind: NotificationKind,
    /// `None` matches every source.
    source: Option<ViewId>,
    observer: Option<ViewId>,
    callback: NotificationCallback,
}

/// List of subscriptions.
#[derive(Default)]
pub(crate) struct NotificationCenter {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl NotificationCenter {
    pub(crate) fn new() -> NotificationCenter {
        NotificationCenter::default()
    }

    pub(crate) fn subscribe(
        &mut self,
        kind: NotificationKind,
        source: Option<ViewId>,
        observer: Option<ViewId>,
        callback: NotificationCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            source,
            observer,
            callback,
        });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != len
    }

    pub(crate) fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|s| s.id == id)
    }

    /// Removes every subscription the view observes with.
    pub(crate) fn remove_observer(&mut self, view: ViewId) {
        self.subscriptions.retain(|s| s.observer != Some(view));
    }

    /// Removes every subscription observing or observed on the view.
    pub(crate) fn remove_view(&mut self, view: ViewId) {
        self.subscriptions
            .retain(|s| s.observer != Some(view) && s.source != Some(view));
    }

    /// Returns the callbacks that should receive the notification, in subscription order.
    pub(crate) fn matching(
        &self,
        notification: &Notification,
    ) -> Vec<(SubscriptionId, NotificationCallback)> {
        self.subscriptions
            .iter()
            .filter(|s| {
                s.kind == notification.kind
                    && s.source.map_or(true, |source| source == notification.source)
            })
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(
                self.subscriptions
                    .iter()
                    .map(|s| (s.id, s.kind, s.source, s.observer)),
            )
            .finish()
    }
}

impl ViewTree {
    /// Subscribes to notifications of a kind.
    ///
    /// - `source`: only deliver notifications posted for this view (or all, if `None`)
    /// - `observer`: the view this subscription belongs to; it is removed when that view dies
    pub fn subscribe<F>(
        &mut self,
        kind: NotificationKind,
        source: Option<ViewId>,
        observer: Option<ViewId>,
        callback: F,
    ) -> SubscriptionId
    where
        F: 'static + Fn(&mut ViewTree, &Notification),
    {
        self.notifications
            .subscribe(kind, source, observer, Arc::new(callback))
    }

    /// Removes a subscription. Returns false if it didn’t exist.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifications.unsubscribe(id)
    }

    /// Removes every subscription the view observes with.
    pub fn remove_observer(&mut self, view: ViewId) {
        self.notifications.remove_observer(view);
    }

    /// Delivers a notification to all matching subscribers, synchronously.
    ///
    /// Subscribers removed by an earlier callback during the same delivery are skipped.
    pub fn post(&mut self, kind: NotificationKind, source: ViewId) {
        let notification = Notification { kind, source };
        for (id, callback) in self.notifications.matching(&notification) {
            if !self.notifications.is_subscribed(id) {
                continue;
            }
            callback(self, &notification);
        }
    }
}

#[test]
fn test_post_matches_kind_and_source() {
    use crate::headless::HeadlessBackend;
    use crate::view::ViewKind;
    use cgmath::Vector2;
    use std::cell::RefCell;
    use std::rc::Rc;

    let backend = HeadlessBackend::new(Vector2::new(640, 480));
    let mut tree = ViewTree::new(Box::new(backend), Default::default());
    let a = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let b = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    tree.subscribe(NotificationKind::SizeDidChange, Some(a), None, move |_, n| {
        s.borrow_mut().push(("a", n.source))
    });
    let s = Rc::clone(&seen);
    tree.subscribe(NotificationKind::SizeDidChange, None, None, move |_, n| {
        s.borrow_mut().push(("any", n.source))
    });

    tree.post(NotificationKind::SizeDidChange, b);
    tree.post(NotificationKind::DidRealize, a);
    tree.post(NotificationKind::SizeDidChange, a);

    assert_eq!(*seen.borrow(), vec![("any", b), ("a", a), ("any", a)]);
}

#[test]
fn test_unsubscribe_during_delivery() {
    use crate::headless::HeadlessBackend;
    use crate::view::ViewKind;
    use cgmath::Vector2;
    use std::cell::Cell;
    use std::rc::Rc;

    let backend = HeadlessBackend::new(Vector2::new(640, 480));
    let mut tree = ViewTree::new(Box::new(backend), Default::default());
    let view = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();

    let second = Rc::new(Cell::new(None));
    let calls = Rc::new(Cell::new(0));

    let s = Rc::clone(&second);
    tree.subscribe(NotificationKind::DidRealize, Some(view), None, move |tree, _| {
        if let Some(id) = s.get() {
            tree.unsubscribe(id);
        }
    });
    let c = Rc::clone(&calls);
    let id = tree.subscribe(NotificationKind::DidRealize, Some(view), None, move |_, _| {
        c.set(c.get() + 1)
    });
    second.set(Some(id));

    tree.post(NotificationKind::DidRealize, view);
    assert_eq!(calls.get(), 0, "second subscription was removed before its turn");
    assert_eq!(tree.notifications.len(), 1);
}

#[test]
fn test_remove_observer_keeps_subscriptions_on_the_view() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let a = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let b = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();

    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    tree.subscribe(NotificationKind::SizeDidChange, Some(a), Some(b), move |_, _| {
        c.set(c.get() + 1)
    });
    let c = Rc::clone(&calls);
    tree.subscribe(NotificationKind::SizeDidChange, Some(b), Some(a), move |_, _| {
        c.set(c.get() + 10)
    });

    tree.remove_observer(b);
    assert_eq!(tree.notifications.len(), 1);
    tree.post(NotificationKind::SizeDidChange, a);
    tree.post(NotificationKind::SizeDidChange, b);
    assert_eq!(calls.get(), 10, "subscriptions with b as their source survive");
}
