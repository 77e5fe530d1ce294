//! Realization: giving views their native surfaces.
//!
//! Realization runs top-down. A view can only be realized once its parent is, and realizing a
//! view realizes its whole subtree, so callers usually realize a top-level view once after
//! building its contents. Views created inside an already realized view stay unrealized until
//! `realize_view` is called again on them or on an ancestor; realizing is idempotent for views
//! that already have a surface.

use crate::error::ViewError;
use crate::notify::NotificationKind;
use crate::tree::ViewTree;
use crate::view::{ViewFlags, ViewId};
use log::{trace, warn};

impl ViewTree {
    /// Creates the native surface of the view and of all its subviews.
    ///
    /// # Panics
    /// - if the view (or any subview that still needs a surface) has a zero width or height
    pub fn realize_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        let node = self.node(view)?;
        assert!(
            node.size.x > 0 && node.size.y > 0,
            "cannot realize a view with an empty size"
        );

        let parent = node.parent;
        let realized = node.is_realized();
        let frame = node.frame();

        if let Some(parent) = parent {
            if !self.is_realized(parent) {
                warn!("trying to realize widget of unrealized parent");
                return Err(ViewError::UnrealizedParent(view));
            }
        }

        if !realized {
            let parent_surface = match parent.and_then(|parent| self.surface(parent)) {
                Some(surface) => surface,
                None => {
                    warn!("trying to realize widget without parent");
                    return Err(ViewError::NoParent(view));
                }
            };

            let attributes = self.node(view)?.attributes.clone();
            let surface = self
                .backend
                .create_surface(parent_surface, frame, &attributes)?;
            self.surfaces.insert(surface, view);

            let node = self.node_mut(view)?;
            node.surface = Some(surface);
            node.flags.insert(ViewFlags::REALIZED);
            let map_when_realized = node.flags.contains(ViewFlags::MAP_WHEN_REALIZED);
            trace!("realized view {:?} as {:?}", view, surface);

            if map_when_realized {
                self.map_view(view)?;
                self.node_mut(view)?
                    .flags
                    .remove(ViewFlags::MAP_WHEN_REALIZED);
            }

            self.post(NotificationKind::DidRealize, view);
        }

        // notification handlers may have changed the subviews
        let children = match self.nodes.get(&view) {
            Some(node) => node.children.clone(),
            None => return Ok(()),
        };
        for child in children {
            if self.contains(child) {
                self.realize_view(child)?;
            }
        }
        Ok(())
    }
}

#[test]
fn test_realize_cascades_parent_first() {
    use crate::headless::NativeOp;
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, backend) = test_tree();
    let root = tree.root();
    let window = tree.create_view(root, ViewKind::TopLevel).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();
    let a1 = tree.create_view(a, ViewKind::Child).unwrap();
    for view in &[window, a, b, a1] {
        tree.resize_view(*view, 10, 10).unwrap();
    }

    tree.realize_view(window).unwrap();

    let created: Vec<_> = backend
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            NativeOp::Create { surface, parent, .. } => Some((surface, parent)),
            _ => None,
        })
        .collect();
    let surface = |view| tree.surface(view).unwrap();
    assert_eq!(
        created,
        vec![
            (surface(window), surface(root)),
            (surface(a), surface(window)),
            (surface(a1), surface(a)),
            (surface(b), surface(window)),
        ],
        "depth-first, parents before children, subviews in order"
    );
    for view in &[window, a, b, a1] {
        assert!(tree.is_realized(*view));
        assert_eq!(tree.view_for_surface(surface(*view)), Some(*view));
    }
}

#[test]
fn test_realize_is_idempotent() {
    use crate::notify::NotificationKind;
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 10, 10).unwrap();

    let realized = Rc::new(RefCell::new(Vec::new()));
    let r = Rc::clone(&realized);
    tree.subscribe(NotificationKind::DidRealize, None, None, move |tree, n| {
        assert!(tree.surface(n.source).is_some(), "surface exists when notified");
        r.borrow_mut().push(n.source)
    });

    tree.realize_view(window).unwrap();
    let surface = tree.surface(window);
    let ops = backend.ops().len();

    // a late subview gets realized by realizing its ancestor again
    let late = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(late, 5, 5).unwrap();
    tree.realize_view(window).unwrap();

    assert_eq!(tree.surface(window), surface, "realized views keep their surface");
    assert_eq!(backend.ops().len(), ops + 1, "only the late subview was created");
    assert_eq!(*realized.borrow(), vec![window, late]);
}

#[test]
fn test_realize_under_unrealized_parent() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let child = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(window, 10, 10).unwrap();
    tree.resize_view(child, 10, 10).unwrap();

    match tree.realize_view(child) {
        Err(ViewError::UnrealizedParent(view)) => assert_eq!(view, child),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!tree.is_realized(child));
    assert_eq!(tree.surface(child), None);
    assert!(backend.ops().is_empty());
}

#[test]
#[should_panic(expected = "cannot realize a view with an empty size")]
fn test_realize_empty_view_panics() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let _ = tree.realize_view(window);
}
