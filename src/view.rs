use crate::backend::{Cursor, InputContext, NativeHandle, SurfaceAttributes};
use crate::events::RegisteredHandler;
use crate::layout::Expansion;
use crate::rect::Rect;
use crate::tree::ViewTree;
use bitflags::bitflags;
use cgmath::{Point2, Vector2};
use core::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A unique identifier for a view.
///
/// (this is just a UUID)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u32, u16, u16, [u8; 8]);

impl ViewId {
    pub(crate) fn new() -> ViewId {
        let uuid = Uuid::new_v4();
        let (a, b, c, d) = uuid.as_fields();
        ViewId(a, b, c, *d)
    }
}

bitflags! {
    /// View state flags.
    pub struct ViewFlags: u16 {
        /// The view has a native surface. Never cleared once set.
        const REALIZED = 1 << 0;
        const MAPPED = 1 << 1;
        /// Map as soon as the view is realized.
        const MAP_WHEN_REALIZED = 1 << 2;
        /// The view is an independent on-screen window.
        const TOP_LEVEL = 1 << 3;
        const ROOT = 1 << 4;
        const OVERRIDE_REDIRECT = 1 << 5;
        /// An ancestor is being destroyed; its native surface takes this one with it.
        const PARENT_DYING = 1 << 6;
        const ALREADY_DEAD = 1 << 7;
        /// Post size change notifications on resize.
        const NOTIFY_SIZE_CHANGED = 1 << 8;
    }
}

/// What kind of view to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// A plain subview.
    Child,
    /// A managed window; child of the root view.
    TopLevel,
    /// A window the window manager should leave alone (menus, balloons, drag images).
    UnmanagedTopLevel,
}

/// Observes and adjusts view geometry changes.
///
/// All methods default to doing nothing, so implementors only override the hooks they care about.
pub trait ViewDelegate {
    /// Called before a view moves; may rewrite the proposed origin.
    fn will_move(&self, tree: &ViewTree, view: ViewId, origin: &mut Point2<i32>) {
        let _ = (tree, view, origin);
    }

    /// Called after a view moved.
    fn did_move(&self, tree: &mut ViewTree, view: ViewId) {
        let _ = (tree, view);
    }

    /// Called before a view is resized; may rewrite the proposed size.
    fn will_resize(&self, tree: &ViewTree, view: ViewId, size: &mut Vector2<u32>) {
        let _ = (tree, view, size);
    }

    /// Called after a view was resized.
    fn did_resize(&self, tree: &mut ViewTree, view: ViewId) {
        let _ = (tree, view);
    }
}

/// A node in the view tree.
pub(crate) struct ViewNode {
    pub(crate) position: Point2<i32>,
    pub(crate) size: Vector2<u32>,
    /// The immediate superview.
    pub(crate) parent: Option<ViewId>,
    /// An ordered list of all subviews, in insertion order.
    pub(crate) children: Vec<ViewId>,
    pub(crate) ref_count: usize,
    pub(crate) flags: ViewFlags,
    pub(crate) surface: Option<NativeHandle>,
    /// Attributes used when the surface is created.
    pub(crate) attributes: SurfaceAttributes,
    pub(crate) cursor: Option<Cursor>,
    pub(crate) delegate: Option<Arc<dyn ViewDelegate>>,
    pub(crate) handlers: Vec<RegisteredHandler>,
    pub(crate) next_focus: Option<ViewId>,
    pub(crate) prev_focus: Option<ViewId>,
    pub(crate) input_context: Option<InputContext>,
    /// Set by `expand_to_parent`.
    pub(crate) expand: Option<Expansion>,
    pub(crate) balloon_text: Option<String>,
    pub(crate) drag_types: Vec<String>,
}

impl ViewNode {
    pub(crate) fn new(attributes: SurfaceAttributes) -> ViewNode {
        ViewNode {
            position: Point2::new(0, 0),
            size: Vector2::new(0, 0),
            parent: None,
            children: Vec::new(),
            ref_count: 1,
            flags: ViewFlags::empty(),
            surface: None,
            attributes,
            cursor: None,
            delegate: None,
            handlers: Vec::new(),
            next_focus: None,
            prev_focus: None,
            input_context: None,
            expand: None,
            balloon_text: None,
            drag_types: Vec::new(),
        }
    }

    pub(crate) fn frame(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub(crate) fn is_realized(&self) -> bool {
        self.flags.contains(ViewFlags::REALIZED)
    }
}

struct DebugifyOption<'a, T: ?Sized>(&'a Option<Arc<T>>);
impl<'a, T: ?Sized> fmt::Debug for DebugifyOption<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_some() {
            write!(f, "Some(..)")
        } else {
            write!(f, "None")
        }
    }
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("ref_count", &self.ref_count)
            .field("flags", &self.flags)
            .field("surface", &self.surface)
            .field("attributes", &self.attributes)
            .field("cursor", &self.cursor)
            .field("delegate", &DebugifyOption(&self.delegate))
            .field("handlers", &self.handlers.len())
            .field("next_focus", &self.next_focus)
            .field("prev_focus", &self.prev_focus)
            .field("input_context", &self.input_context)
            .field("expand", &self.expand)
            .field("balloon_text", &self.balloon_text)
            .field("drag_types", &self.drag_types)
            .finish()
    }
}

#[test]
fn test_view_ids_are_unique() {
    let a = ViewId::new();
    let b = ViewId::new();
    assert_ne!(a, b);
}
