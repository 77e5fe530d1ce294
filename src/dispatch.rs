//! Event delivery.
//!
//! Native events arrive addressed to a surface. `handle_event` maps the surface back to its view
//! and runs the view's handlers in registration order. Synthetic events go through
//! `dispatch_event`, which addresses the event to the target view's surface and then takes the
//! same path. Nothing is queued; handlers run before these calls return.

use crate::error::ViewError;
use crate::events::{Event, EventHandler, EventKind, EventMask, HandlerId, RegisteredHandler};
use crate::tree::ViewTree;
use crate::view::{ViewFlags, ViewId};
use cgmath::Point2;
use log::{trace, warn};

impl ViewTree {
    /// Registers an event handler for the events in `mask`.
    pub fn add_event_handler<F>(
        &mut self,
        view: ViewId,
        mask: EventMask,
        handler: F,
    ) -> Result<HandlerId, ViewError>
    where
        F: 'static + FnMut(&mut ViewTree, ViewId, &Event),
    {
        let id = HandlerId(self.next_handler_id);
        let node = self.node_mut(view)?;
        node.handlers.push(RegisteredHandler {
            id,
            mask,
            handler: EventHandler::new(handler),
        });
        self.next_handler_id += 1;
        Ok(id)
    }

    /// Removes an event handler. Returns false if the view doesn’t have it.
    pub fn remove_event_handler(&mut self, view: ViewId, id: HandlerId) -> bool {
        match self.nodes.get_mut(&view) {
            Some(node) => {
                let len = node.handlers.len();
                node.handlers.retain(|h| h.id != id);
                node.handlers.len() != len
            }
            None => false,
        }
    }

    /// Runs the view’s handlers that match the event.
    fn deliver(&mut self, view: ViewId, event: &Event) {
        let mask = event.kind.mask();
        let handlers: Vec<_> = match self.nodes.get(&view) {
            Some(node) => node
                .handlers
                .iter()
                .filter(|h| h.mask.intersects(mask))
                .cloned()
                .collect(),
            None => return,
        };

        for registered in handlers {
            // an earlier handler may have removed this one
            let still_registered = self
                .nodes
                .get(&view)
                .map_or(false, |node| node.handlers.iter().any(|h| h.id == registered.id));
            if !still_registered {
                continue;
            }
            if !registered.handler.call(self, view, event) {
                warn!(
                    "skipping reentrant delivery of {:?} to handler {:?} of {:?}",
                    event.kind, registered.id, view
                );
            }
        }
    }

    /// Routes a native event to the view that owns its surface.
    ///
    /// Returns false if no view owns the surface.
    pub fn handle_event(&mut self, event: Event) -> bool {
        let view = match event.window.and_then(|w| self.view_for_surface(w)) {
            Some(view) => view,
            None => {
                trace!("dropping event for unknown surface {:?}", event.window);
                return false;
            }
        };
        self.deliver(view, &event);
        true
    }

    /// Delivers an event to a view right away.
    ///
    /// Does nothing if the view has no native surface.
    pub fn dispatch_event(&mut self, target: ViewId, mut event: Event) -> Result<(), ViewError> {
        let surface = match self.node(target)?.surface {
            Some(surface) => surface,
            None => return Ok(()),
        };
        event.window = Some(surface);
        self.handle_event(event);
        Ok(())
    }

    /// Dispatches a copy of the event to every subview of `parent`, in order.
    pub fn broadcast_event(&mut self, parent: ViewId, event: &Event) -> Result<(), ViewError> {
        let children = self.node(parent)?.children.clone();
        for child in children {
            match self.dispatch_event(child, event.clone()) {
                Ok(()) | Err(ViewError::NoSuchView(_)) => (),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Asks a mapped view to repaint itself by sending it an `Expose` event.
    pub fn redisplay_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        let node = self.node(view)?;
        if !node.flags.contains(ViewFlags::MAPPED) {
            return Ok(());
        }
        let area = node.frame().with_origin(Point2::new(0, 0));
        self.dispatch_event(view, Event::new(EventKind::Expose { area, count: 0 }))
    }

    /// Tells the view’s structure handlers that it is going away.
    pub(crate) fn call_destroy_handlers(&mut self, view: ViewId) {
        let event = Event {
            window: self.surface(view),
            kind: EventKind::Destroy,
        };
        self.deliver(view, &event);
    }
}

#[cfg(test)]
fn realized_window(tree: &mut ViewTree, children: usize) -> (ViewId, Vec<ViewId>) {
    use crate::view::ViewKind;

    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 100).unwrap();
    let children = (0..children)
        .map(|_| {
            let child = tree.create_view(window, ViewKind::Child).unwrap();
            tree.resize_view(child, 10, 10).unwrap();
            child
        })
        .collect();
    tree.realize_view(window).unwrap();
    (window, children)
}

#[cfg(test)]
fn client_message(message_type: u32) -> Event {
    Event::new(EventKind::ClientMessage {
        message_type,
        data: [0; 5],
    })
}

#[test]
fn test_dispatch_stamps_surface() {
    use crate::tree::test_tree;
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let (window, _) = realized_window(&mut tree, 0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    tree.add_event_handler(window, EventMask::CLIENT_MESSAGE, move |_, view, event| {
        s.borrow_mut().push((view, event.window))
    })
    .unwrap();

    tree.dispatch_event(window, client_message(1)).unwrap();
    assert_eq!(*seen.borrow(), vec![(window, tree.surface(window))]);
}

#[test]
fn test_dispatch_to_unrealized_view_does_nothing() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    tree.add_event_handler(window, EventMask::all(), move |_, _, _| c.set(c.get() + 1))
        .unwrap();

    tree.dispatch_event(window, client_message(1)).unwrap();
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_handlers_filter_by_mask() {
    use crate::tree::test_tree;
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let (window, _) = realized_window(&mut tree, 0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    tree.add_event_handler(window, EventMask::EXPOSURE, move |_, _, _| {
        s.borrow_mut().push("expose")
    })
    .unwrap();
    let s = Rc::clone(&seen);
    let id = tree
        .add_event_handler(window, EventMask::CLIENT_MESSAGE, move |_, _, _| {
            s.borrow_mut().push("message")
        })
        .unwrap();

    tree.dispatch_event(window, client_message(7)).unwrap();
    tree.redisplay_view(window).unwrap();
    assert_eq!(*seen.borrow(), vec!["message"], "unmapped views aren’t redisplayed");

    tree.map_view(window).unwrap();
    tree.redisplay_view(window).unwrap();
    assert!(tree.remove_event_handler(window, id));
    assert!(!tree.remove_event_handler(window, id));
    tree.dispatch_event(window, client_message(7)).unwrap();
    assert_eq!(*seen.borrow(), vec!["message", "expose"]);
}

#[test]
fn test_broadcast_reaches_every_subview_in_order() {
    use crate::tree::test_tree;
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let (window, children) = realized_window(&mut tree, 3);
    let seen = Rc::new(RefCell::new(Vec::new()));
    for child in &children {
        let s = Rc::clone(&seen);
        tree.add_event_handler(*child, EventMask::CLIENT_MESSAGE, move |_, view, event| {
            s.borrow_mut().push((view, event.window))
        })
        .unwrap();
    }

    tree.broadcast_event(window, &client_message(3)).unwrap();
    let expected: Vec<_> = children
        .iter()
        .map(|child| (*child, tree.surface(*child)))
        .collect();
    assert_eq!(*seen.borrow(), expected);
}

#[test]
fn test_handler_may_destroy_views() {
    use crate::tree::test_tree;

    let (mut tree, backend) = test_tree();
    let (window, children) = realized_window(&mut tree, 2);
    let victim = children[1];
    tree.add_event_handler(children[0], EventMask::CLIENT_MESSAGE, move |tree, _, _| {
        tree.destroy_view(victim).unwrap();
    })
    .unwrap();

    tree.broadcast_event(window, &client_message(0)).unwrap();
    assert!(!tree.contains(victim));
    assert_eq!(tree.children(window), &children[..1]);
    assert_eq!(backend.surface_count(), 2, "root and window remain");
}

#[test]
fn test_reentrant_handler_is_skipped() {
    use crate::tree::test_tree;
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let (window, _) = realized_window(&mut tree, 0);
    let depth = Rc::new(Cell::new(0));
    let d = Rc::clone(&depth);
    tree.add_event_handler(window, EventMask::CLIENT_MESSAGE, move |tree, view, event| {
        d.set(d.get() + 1);
        tree.dispatch_event(view, event.clone()).unwrap();
    })
    .unwrap();

    tree.dispatch_event(window, client_message(0)).unwrap();
    assert_eq!(depth.get(), 1);
}

#[test]
fn test_handle_event_routes_by_surface() {
    use crate::backend::NativeHandle;
    use crate::tree::test_tree;
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut tree, _) = test_tree();
    let (_, children) = realized_window(&mut tree, 1);
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    tree.add_event_handler(children[0], EventMask::CLIENT_MESSAGE, move |_, _, _| {
        c.set(c.get() + 1)
    })
    .unwrap();

    let mut event = client_message(0);
    event.window = tree.surface(children[0]);
    assert!(tree.handle_event(event.clone()));
    event.window = Some(NativeHandle(u64::MAX));
    assert!(!tree.handle_event(event));
    assert_eq!(calls.get(), 1);
}
