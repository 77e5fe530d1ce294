//! Expand-to-parent auto-layout.

use crate::error::ViewError;
use crate::notify::{NotificationKind, SubscriptionId};
use crate::rect::{EdgeOffsets, Rect};
use crate::tree::ViewTree;
use crate::view::{ViewFlags, ViewId};
use log::warn;

/// How a view follows its parent’s size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Expansion {
    pub(crate) offsets: EdgeOffsets,
    /// The view being followed.
    pub(crate) container: ViewId,
    pub(crate) subscription: SubscriptionId,
}

impl ViewTree {
    /// Makes the view fill its parent, keeping the given distances to the parent’s edges.
    ///
    /// The view follows every later resize of its parent until it is destroyed. Calling this again
    /// replaces the offsets, and moves the subscription over if the view has changed parents.
    ///
    /// # Panics
    /// - if the view has no parent
    pub fn expand_to_parent(
        &mut self,
        view: ViewId,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> Result<(), ViewError> {
        let node = self.node(view)?;
        let parent = match node.parent {
            Some(parent) => parent,
            None => panic!("cannot expand a view without a parent"),
        };
        let previous = node.expand;
        self.node(parent)?;

        let subscription = match previous {
            Some(expansion) if expansion.container == parent => expansion.subscription,
            _ => {
                if let Some(expansion) = previous {
                    self.unsubscribe(expansion.subscription);
                }
                self.subscribe(
                    NotificationKind::SizeDidChange,
                    Some(parent),
                    Some(view),
                    move |tree, notification| {
                        if let Err(err) = tree.apply_expand(view, notification.source) {
                            warn!("failed to follow parent size of {:?}: {}", view, err);
                        }
                    },
                )
            }
        };

        self.node_mut(view)?.expand = Some(Expansion {
            offsets: EdgeOffsets::new(left, top, right, bottom),
            container: parent,
            subscription,
        });
        self.node_mut(parent)?
            .flags
            .insert(ViewFlags::NOTIFY_SIZE_CHANGED);

        self.apply_expand(view, parent)
    }

    /// Fits the view into the container using its stored offsets.
    fn apply_expand(&mut self, view: ViewId, container: ViewId) -> Result<(), ViewError> {
        let offsets = match self.node(view)?.expand {
            Some(expansion) => expansion.offsets,
            None => return Ok(()),
        };
        let frame = Rect::inset_in(self.node(container)?.size, offsets);

        self.move_view(view, frame.origin.x, frame.origin.y)?;
        if frame.is_empty() {
            warn!("parent of {:?} is too small to expand into", view);
            return Ok(());
        }
        self.resize_view(view, frame.size.x, frame.size.y)
    }
}

#[test]
fn test_expand_follows_parent() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use cgmath::{Point2, Vector2};

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 100).unwrap();
    let content = tree.create_view(window, ViewKind::Child).unwrap();

    tree.expand_to_parent(content, 10, 10, 10, 10).unwrap();
    assert!(tree.flags(window).unwrap().contains(ViewFlags::NOTIFY_SIZE_CHANGED));
    assert_eq!(tree.position(content), Some(Point2::new(10, 10)));
    assert_eq!(tree.size(content), Some(Vector2::new(80, 80)));

    tree.resize_view(window, 200, 200).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(180, 180)));

    // new offsets replace the old ones instead of adding a second subscription
    let subscriptions = tree.notifications.len();
    tree.expand_to_parent(content, 0, 20, 0, 0).unwrap();
    assert_eq!(tree.notifications.len(), subscriptions);
    assert_eq!(tree.frame(content), Some(Rect::new(Point2::new(0, 20), Vector2::new(200, 180))));
}

#[test]
fn test_expand_subscription_dies_with_view() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use cgmath::Vector2;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 100).unwrap();
    let content = tree.create_view(window, ViewKind::Child).unwrap();
    tree.expand_to_parent(content, 0, 0, 0, 0).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(100, 100)));

    tree.destroy_view(content).unwrap();
    assert_eq!(tree.notifications.len(), 0);
    tree.resize_view(window, 50, 50).unwrap();
}

#[test]
fn test_expand_into_small_parent_keeps_size() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use cgmath::Vector2;

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 100).unwrap();
    let content = tree.create_view(window, ViewKind::Child).unwrap();
    tree.expand_to_parent(content, 5, 5, 5, 5).unwrap();

    tree.resize_view(window, 8, 8).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(90, 90)));
}

#[test]
#[should_panic(expected = "cannot expand a view without a parent")]
fn test_expand_root_panics() {
    use crate::tree::test_tree;

    let (mut tree, _) = test_tree();
    let root = tree.root();
    let _ = tree.expand_to_parent(root, 0, 0, 0, 0);
}

#[test]
fn test_expand_again_after_reparent() {
    use crate::tree::test_tree;
    use crate::view::ViewKind;
    use cgmath::{Point2, Vector2};

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 400, 400).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(a, 100, 100).unwrap();
    tree.resize_view(b, 200, 200).unwrap();
    let content = tree.create_view(a, ViewKind::Child).unwrap();
    tree.expand_to_parent(content, 10, 10, 10, 10).unwrap();
    let subscriptions = tree.notifications.len();

    tree.reparent_view(content, b, 0, 0).unwrap();
    tree.expand_to_parent(content, 10, 10, 10, 10).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(180, 180)));
    assert_eq!(tree.notifications.len(), subscriptions, "old subscription was replaced");

    tree.resize_view(b, 150, 150).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(130, 130)));

    // the old parent no longer drives the layout
    tree.resize_view(a, 60, 60).unwrap();
    assert_eq!(tree.size(content), Some(Vector2::new(130, 130)));
    assert_eq!(tree.position(content), Some(Point2::new(10, 10)));
}
