//! Keyboard focus.
//!
//! Each top-level view remembers which of its descendants has focus. Changing it sends a
//! `FocusOut` to the previous view and then a `FocusIn` to the new one, both delivered inline.

use crate::error::ViewError;
use crate::events::{Event, EventKind, FocusMode};
use crate::tree::ViewTree;
use crate::view::ViewId;
use log::warn;

/// The focused view of one top-level view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FocusRecord {
    pub(crate) top_level: ViewId,
    pub(crate) focused: Option<ViewId>,
}

impl ViewTree {
    /// Returns the view that has focus inside a top-level view.
    pub fn focused_view(&self, top_level: ViewId) -> Option<ViewId> {
        self.focus
            .iter()
            .find(|record| record.top_level == top_level)
            .and_then(|record| record.focused)
    }

    /// Moves focus inside a top-level view.
    pub fn set_focus(&mut self, top_level: ViewId, view: Option<ViewId>) {
        let existing = self
            .focus
            .iter()
            .position(|record| record.top_level == top_level);

        match existing {
            None => self.focus.insert(
                0,
                FocusRecord {
                    top_level,
                    focused: view,
                },
            ),
            Some(index) => {
                if let Some(previous) = self.focus[index].focused {
                    self.deliver_focus(previous, EventKind::FocusOut(FocusMode::Normal));
                }
                // the focus-out handler may have rearranged the records
                match self
                    .focus
                    .iter_mut()
                    .find(|record| record.top_level == top_level)
                {
                    Some(record) => record.focused = view,
                    None => self.focus.insert(
                        0,
                        FocusRecord {
                            top_level,
                            focused: view,
                        },
                    ),
                }
            }
        }

        if let Some(view) = view {
            self.deliver_focus(view, EventKind::FocusIn(FocusMode::Normal));
        }
    }

    fn deliver_focus(&mut self, view: ViewId, kind: EventKind) {
        match self.dispatch_event(view, Event::new(kind)) {
            Ok(()) | Err(ViewError::NoSuchView(_)) => (),
            Err(err) => warn!("failed to deliver focus change to {:?}: {}", view, err),
        }
    }

    /// Forgets the focus record of a top-level view.
    pub(crate) fn remove_focus_record(&mut self, top_level: ViewId) {
        self.focus.retain(|record| record.top_level != top_level);
    }

    /// Links `next` after `view` in the focus chain (the tab order).
    pub fn link_focus_chain(&mut self, view: ViewId, next: ViewId) -> Result<(), ViewError> {
        self.node(next)?;
        self.node_mut(view)?.next_focus = Some(next);
        self.node_mut(next)?.prev_focus = Some(view);
        Ok(())
    }

    pub fn next_in_focus_chain(&self, view: ViewId) -> Option<ViewId> {
        self.nodes.get(&view).and_then(|node| node.next_focus)
    }

    pub fn prev_in_focus_chain(&self, view: ViewId) -> Option<ViewId> {
        self.nodes.get(&view).and_then(|node| node.prev_focus)
    }
}

#[cfg(test)]
fn focus_log(
    tree: &mut ViewTree,
    views: &[ViewId],
) -> std::rc::Rc<std::cell::RefCell<Vec<(ViewId, EventKind)>>> {
    use crate::events::EventMask;
    use std::cell::RefCell;
    use std::rc::Rc;

    let log = Rc::new(RefCell::new(Vec::new()));
    for view in views {
        let l = Rc::clone(&log);
        tree.add_event_handler(*view, EventMask::FOCUS_CHANGE, move |_, view, event| {
            l.borrow_mut().push((view, event.kind.clone()))
        })
        .unwrap();
    }
    log
}

#[test]
fn test_focus_out_before_focus_in() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();
    for view in &[window, a, b] {
        tree.resize_view(*view, 10, 10).unwrap();
    }
    tree.realize_view(window).unwrap();
    let log = focus_log(&mut tree, &[a, b]);

    assert_eq!(tree.focused_view(window), None);
    tree.set_focus(window, Some(a));
    tree.set_focus(window, Some(b));
    assert_eq!(tree.focused_view(window), Some(b));

    assert_eq!(
        *log.borrow(),
        vec![
            (a, EventKind::FocusIn(FocusMode::Normal)),
            (a, EventKind::FocusOut(FocusMode::Normal)),
            (b, EventKind::FocusIn(FocusMode::Normal)),
        ]
    );
}

#[test]
fn test_focus_is_per_top_level() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, _) = test_tree();
    let root = tree.root();
    let w1 = tree.create_view(root, ViewKind::TopLevel).unwrap();
    let w2 = tree.create_view(root, ViewKind::TopLevel).unwrap();
    let a = tree.create_view(w1, ViewKind::Child).unwrap();
    let b = tree.create_view(w2, ViewKind::Child).unwrap();

    tree.set_focus(w1, Some(a));
    tree.set_focus(w2, Some(b));
    assert_eq!(tree.focused_view(w1), Some(a));
    assert_eq!(tree.focused_view(w2), Some(b));

    tree.set_focus(w1, None);
    assert_eq!(tree.focused_view(w1), None);
    assert_eq!(tree.focused_view(w2), Some(b));
}

#[test]
fn test_destroying_focused_view_clears_focus() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(window, 10, 10).unwrap();
    tree.resize_view(a, 10, 10).unwrap();
    tree.realize_view(window).unwrap();
    let log = focus_log(&mut tree, &[a]);

    tree.set_focus(window, Some(a));
    tree.destroy_view(a).unwrap();
    assert_eq!(tree.focused_view(window), None);
    assert_eq!(
        log.borrow().last(),
        Some(&(a, EventKind::FocusOut(FocusMode::Normal))),
        "the dying view is told it lost focus"
    );

    tree.destroy_view(window).unwrap();
    assert!(tree.focus.is_empty(), "the top-level record is gone");
}

#[test]
fn test_focus_chain_unlinks_on_destroy() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();
    let c = tree.create_view(window, ViewKind::Child).unwrap();
    tree.link_focus_chain(a, b).unwrap();
    tree.link_focus_chain(b, c).unwrap();

    tree.destroy_view(b).unwrap();
    assert_eq!(tree.next_in_focus_chain(a), Some(c));
    assert_eq!(tree.prev_in_focus_chain(c), Some(a));
}
