use crate::backend::{Backend, Cursor, InputContext, NativeHandle};
use crate::color::{Background, Color, Pixmap};
use crate::error::ViewError;
use crate::events::EventMask;
use crate::focus::FocusRecord;
use crate::notify::{NotificationCenter, NotificationKind};
use crate::rect::Rect;
use crate::screen::ScreenContext;
use crate::view::{ViewDelegate, ViewFlags, ViewId, ViewKind, ViewNode};
use cgmath::{Point2, Vector2};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// A tree of views on one screen.
///
/// The root view stands for the screen's root surface and exists for as long as the tree does.
/// Top-level views (windows) are children of the root; every other view is created inside one of
/// them.
#[derive(Debug)]
pub struct ViewTree {
    pub(crate) backend: Box<dyn Backend>,
    screen: ScreenContext,
    pub(crate) nodes: HashMap<ViewId, ViewNode>,
    root: ViewId,
    /// Maps native surfaces back to the views that own them.
    pub(crate) surfaces: HashMap<NativeHandle, ViewId>,
    pub(crate) focus: Vec<FocusRecord>,
    pub(crate) notifications: NotificationCenter,
    pub(crate) next_handler_id: u64,
}

impl ViewTree {
    /// Creates a tree with a root view covering the backend's screen.
    pub fn new(backend: Box<dyn Backend>, screen: ScreenContext) -> ViewTree {
        let root_id = ViewId::new();
        let root_surface = backend.root_surface();

        let mut root = ViewNode::new(screen.default_attributes());
        root.surface = Some(root_surface);
        root.size = backend.screen_size();
        root.flags = ViewFlags::REALIZED | ViewFlags::MAPPED | ViewFlags::ROOT;

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        let mut surfaces = HashMap::new();
        surfaces.insert(root_surface, root_id);

        ViewTree {
            backend,
            screen,
            nodes,
            root: root_id,
            surfaces,
            focus: Vec::new(),
            notifications: NotificationCenter::new(),
            next_handler_id: 0,
        }
    }

    /// The root view.
    pub fn root(&self) -> ViewId {
        self.root
    }

    pub fn screen(&self) -> &ScreenContext {
        &self.screen
    }

    pub(crate) fn node(&self, id: ViewId) -> Result<&ViewNode, ViewError> {
        self.nodes.get(&id).ok_or(ViewError::NoSuchView(id))
    }

    pub(crate) fn node_mut(&mut self, id: ViewId) -> Result<&mut ViewNode, ViewError> {
        self.nodes.get_mut(&id).ok_or(ViewError::NoSuchView(id))
    }

    /// Returns the view's surface if the view is realized.
    pub(crate) fn realized_surface(&self, id: ViewId) -> Result<Option<NativeHandle>, ViewError> {
        let node = self.node(id)?;
        Ok(if node.is_realized() { node.surface } else { None })
    }

    /// Creates a view.
    ///
    /// `parent` must be the root view for top-level kinds.
    pub fn create_view(&mut self, parent: ViewId, kind: ViewKind) -> Result<ViewId, ViewError> {
        self.node(parent)?;
        if kind != ViewKind::Child {
            assert!(parent == self.root, "top-level views must be children of the root view");
        }

        let id = ViewId::new();
        let mut node = ViewNode::new(self.screen.default_attributes());
        match kind {
            ViewKind::Child => (),
            ViewKind::TopLevel => {
                node.flags.insert(ViewFlags::TOP_LEVEL);
                node.attributes.event_mask |= EventMask::STRUCTURE_NOTIFY;
            }
            ViewKind::UnmanagedTopLevel => {
                node.flags
                    .insert(ViewFlags::TOP_LEVEL | ViewFlags::OVERRIDE_REDIRECT);
                node.attributes.event_mask |= EventMask::STRUCTURE_NOTIFY;
                node.attributes.override_redirect = true;
            }
        }
        self.nodes.insert(id, node);
        self.adopt(parent, id);
        trace!("created {:?} view {:?} in {:?}", kind, id, parent);
        Ok(id)
    }

    /// Appends a view to the parent's subviews.
    fn adopt(&mut self, parent: ViewId, child: ViewId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Removes a view from its parent's subviews.
    fn unparent(&mut self, child: ViewId) {
        let parent = match self.nodes.get_mut(&child) {
            Some(node) => node.parent.take(),
            None => return,
        };
        if let Some(node) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            node.children.retain(|id| *id != child);
        }
    }

    /// Returns true if `ancestor` is `view` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ViewId, view: ViewId) -> bool {
        let mut current = Some(view);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    /// Moves a view into another parent.
    ///
    /// # Panics
    /// - if the view is a top-level view
    /// - if the new parent is inside the view’s own subtree
    pub fn reparent_view(
        &mut self,
        view: ViewId,
        new_parent: ViewId,
        x: i32,
        y: i32,
    ) -> Result<(), ViewError> {
        let node = self.node(view)?;
        assert!(
            !node.flags.contains(ViewFlags::TOP_LEVEL),
            "cannot reparent a top-level view"
        );
        let view_realized = node.is_realized();
        let surface = node.surface;
        let parent_surface = self.realized_surface(new_parent)?;
        assert!(
            !self.is_ancestor_or_self(view, new_parent),
            "cannot reparent a view into its own subtree"
        );

        self.unparent(view);
        self.adopt(new_parent, view);

        let origin = Point2::new(x, y);
        if view_realized {
            match (surface, parent_surface) {
                (Some(surface), Some(parent_surface)) => {
                    self.backend.reparent(surface, parent_surface, origin)?;
                }
                _ => {
                    warn!("trying to reparent realized view to unrealized parent");
                    return Err(ViewError::UnrealizedParent(view));
                }
            }
        }

        self.node_mut(view)?.position = origin;
        Ok(())
    }

    /// Moves a view within its parent.
    ///
    /// # Panics
    /// - if the view is the root view
    pub fn move_view(&mut self, view: ViewId, x: i32, y: i32) -> Result<(), ViewError> {
        let node = self.node(view)?;
        assert!(
            !node.flags.contains(ViewFlags::ROOT),
            "cannot move the root view"
        );
        let delegate = node.delegate.clone();

        let mut origin = Point2::new(x, y);
        if let Some(delegate) = &delegate {
            delegate.will_move(self, view, &mut origin);
        }

        if self.node(view)?.position == origin {
            return Ok(());
        }
        if let Some(surface) = self.realized_surface(view)? {
            self.backend.move_surface(surface, origin)?;
        }
        self.node_mut(view)?.position = origin;

        if let Some(delegate) = &delegate {
            delegate.did_move(self, view);
        }
        Ok(())
    }

    /// Resizes a view.
    ///
    /// # Panics
    /// - if the width or height (after the delegate had its say) is zero
    pub fn resize_view(&mut self, view: ViewId, width: u32, height: u32) -> Result<(), ViewError> {
        let delegate = self.node(view)?.delegate.clone();

        let mut size = Vector2::new(width, height);
        if let Some(delegate) = &delegate {
            delegate.will_resize(self, view, &mut size);
        }

        assert!(size.x > 0, "view width must be positive");
        assert!(size.y > 0, "view height must be positive");

        if self.node(view)?.size == size {
            return Ok(());
        }
        if let Some(surface) = self.realized_surface(view)? {
            self.backend.resize_surface(surface, size)?;
        }
        self.node_mut(view)?.size = size;

        if let Some(delegate) = &delegate {
            delegate.did_resize(self, view);
        }

        let notify = self
            .nodes
            .get(&view)
            .map_or(false, |node| node.flags.contains(ViewFlags::NOTIFY_SIZE_CHANGED));
        if notify {
            self.post(NotificationKind::SizeDidChange, view);
        }
        Ok(())
    }

    /// Raises the view’s surface above its siblings. Does nothing if the view isn’t realized.
    pub fn raise_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        if let Some(surface) = self.realized_surface(view)? {
            self.backend.raise(surface)?;
        }
        Ok(())
    }

    /// Lowers the view’s surface below its siblings. Does nothing if the view isn’t realized.
    pub fn lower_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        if let Some(surface) = self.realized_surface(view)? {
            self.backend.lower(surface)?;
        }
        Ok(())
    }

    /// Shows the view, or marks it to be shown once it is realized.
    pub fn map_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        let node = self.node(view)?;
        if node.flags.contains(ViewFlags::MAPPED) {
            return Ok(());
        }
        match self.realized_surface(view)? {
            Some(surface) => {
                self.backend.map_raised(surface)?;
                self.node_mut(view)?.flags.insert(ViewFlags::MAPPED);
            }
            None => {
                self.node_mut(view)?
                    .flags
                    .insert(ViewFlags::MAP_WHEN_REALIZED);
            }
        }
        Ok(())
    }

    /// Hides the view and cancels any pending map.
    pub fn unmap_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        let node = self.node_mut(view)?;
        node.flags.remove(ViewFlags::MAP_WHEN_REALIZED);
        if !node.flags.contains(ViewFlags::MAPPED) {
            return Ok(());
        }
        let surface = node.surface;
        if let Some(surface) = surface {
            self.backend.unmap(surface)?;
        }
        self.node_mut(view)?.flags.remove(ViewFlags::MAPPED);
        Ok(())
    }

    /// Maps all subviews with a single native request.
    ///
    /// Subviews that aren’t realized yet will be mapped when they are.
    pub fn map_subviews(&mut self, view: ViewId) -> Result<(), ViewError> {
        let surface = match self.realized_surface(view)? {
            Some(surface) => surface,
            None => {
                warn!("trying to map subviews of unrealized view");
                return Err(ViewError::NotRealized(view));
            }
        };
        self.backend.map_subsurfaces(surface)?;

        let children = self.node(view)?.children.clone();
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                if node.is_realized() {
                    node.flags.insert(ViewFlags::MAPPED);
                    node.flags.remove(ViewFlags::MAP_WHEN_REALIZED);
                } else {
                    node.flags.insert(ViewFlags::MAP_WHEN_REALIZED);
                }
            }
        }
        Ok(())
    }

    /// Unmaps all subviews with a single native request.
    pub fn unmap_subviews(&mut self, view: ViewId) -> Result<(), ViewError> {
        let surface = match self.realized_surface(view)? {
            Some(surface) => surface,
            None => {
                warn!("trying to unmap subviews of unrealized view");
                return Err(ViewError::NotRealized(view));
            }
        };
        self.backend.unmap_subsurfaces(surface)?;

        let children = self.node(view)?.children.clone();
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.flags
                    .remove(ViewFlags::MAPPED | ViewFlags::MAP_WHEN_REALIZED);
            }
        }
        Ok(())
    }

    /// Adds a reference to the view.
    pub fn retain_view(&mut self, view: ViewId) -> Result<ViewId, ViewError> {
        self.node_mut(view)?.ref_count += 1;
        Ok(view)
    }

    /// Drops a reference to the view and destroys it (and its subviews) once none are left.
    ///
    /// # Panics
    /// - if the view is the root view
    pub fn destroy_view(&mut self, view: ViewId) -> Result<(), ViewError> {
        let node = self.node_mut(view)?;
        assert!(
            !node.flags.contains(ViewFlags::ROOT),
            "cannot destroy the root view"
        );
        node.ref_count = node.ref_count.saturating_sub(1);
        if node.ref_count == 0 {
            self.destroy_node(view);
        }
        Ok(())
    }

    /// Sets `PARENT_DYING` on the direct subviews; each of them marks its own when it is released.
    fn mark_children_dying(&mut self, view: ViewId) {
        let children = match self.nodes.get(&view) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.flags.insert(ViewFlags::PARENT_DYING);
            }
        }
    }

    fn destroy_node(&mut self, view: ViewId) {
        let node = match self.nodes.get_mut(&view) {
            Some(node) => node,
            None => return,
        };
        if node.flags.contains(ViewFlags::ALREADY_DEAD) {
            return;
        }
        node.flags.insert(ViewFlags::ALREADY_DEAD);
        debug!("destroying view {:?}", view);

        node.balloon_text = None;

        let next = node.next_focus.take();
        let prev = node.prev_focus.take();
        if let Some(node) = next.and_then(|next| self.nodes.get_mut(&next)) {
            node.prev_focus = prev;
        }
        if let Some(node) = prev.and_then(|prev| self.nodes.get_mut(&prev)) {
            node.next_focus = next;
        }

        // focus must not stay on a view that no longer exists
        if let Some(top_level) = self.top_level_of(view) {
            if self.focused_view(top_level) == Some(view) {
                self.set_focus(top_level, None);
            }
        }
        let is_top_level = self
            .nodes
            .get(&view)
            .map_or(false, |n| n.flags.contains(ViewFlags::TOP_LEVEL));
        if is_top_level {
            self.remove_focus_record(view);
        }

        // the native surface of this view takes all native subsurfaces with it, so subviews
        // are detached from the native layer first and then released bottom-up
        self.mark_children_dying(view);
        loop {
            let child = match self.nodes.get(&view).and_then(|n| n.children.first()) {
                Some(child) => *child,
                None => break,
            };
            if let Some(node) = self.nodes.get_mut(&child) {
                node.ref_count = node.ref_count.saturating_sub(1);
                if node.ref_count == 0 {
                    self.destroy_node(child);
                }
            }
            // still alive (retained elsewhere); orphan it
            let still_first = self
                .nodes
                .get(&view)
                .map_or(false, |n| n.children.first() == Some(&child));
            if still_first {
                self.unparent(child);
            }
        }

        self.call_destroy_handlers(view);

        let node = match self.nodes.get(&view) {
            Some(node) => node,
            None => return,
        };
        if node.is_realized() {
            if let Some(surface) = node.surface {
                self.surfaces.remove(&surface);
                let owns_surface = !node.flags.contains(ViewFlags::PARENT_DYING)
                    || node.flags.contains(ViewFlags::TOP_LEVEL);
                if owns_surface && !node.flags.contains(ViewFlags::ROOT) {
                    if let Err(err) = self.backend.destroy_surface(surface) {
                        warn!("failed to destroy surface of view {:?}: {}", view, err);
                    }
                }
            }
        }

        self.unparent(view);

        let mut node = match self.nodes.remove(&view) {
            Some(node) => node,
            None => return,
        };
        node.handlers.clear();
        self.notifications.remove_view(view);
        if let Some(context) = node.input_context.take() {
            if let Err(err) = self.backend.destroy_input_context(context) {
                warn!("failed to release input context of view {:?}: {}", view, err);
            }
        }
        node.drag_types.clear();
        drop(node);
    }

    /// Returns the top-level view containing the view (or the view itself).
    pub fn top_level_of(&self, view: ViewId) -> Option<ViewId> {
        let mut current = Some(view);
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            if node.flags.contains(ViewFlags::TOP_LEVEL) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// Returns true if the view exists.
    pub fn contains(&self, view: ViewId) -> bool {
        self.nodes.contains_key(&view)
    }

    /// The number of live views, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn position(&self, view: ViewId) -> Option<Point2<i32>> {
        self.nodes.get(&view).map(|node| node.position)
    }

    pub fn size(&self, view: ViewId) -> Option<Vector2<u32>> {
        self.nodes.get(&view).map(|node| node.size)
    }

    pub fn frame(&self, view: ViewId) -> Option<Rect> {
        self.nodes.get(&view).map(|node| node.frame())
    }

    pub fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.nodes.get(&view).and_then(|node| node.parent)
    }

    /// The view’s subviews, in insertion order.
    pub fn children(&self, view: ViewId) -> &[ViewId] {
        self.nodes
            .get(&view)
            .map_or(&[][..], |node| &node.children[..])
    }

    pub fn flags(&self, view: ViewId) -> Option<ViewFlags> {
        self.nodes.get(&view).map(|node| node.flags)
    }

    pub fn is_realized(&self, view: ViewId) -> bool {
        self.flags(view)
            .map_or(false, |f| f.contains(ViewFlags::REALIZED))
    }

    pub fn is_mapped(&self, view: ViewId) -> bool {
        self.flags(view)
            .map_or(false, |f| f.contains(ViewFlags::MAPPED))
    }

    /// The view’s native surface, if it has one.
    pub fn surface(&self, view: ViewId) -> Option<NativeHandle> {
        self.nodes.get(&view).and_then(|node| node.surface)
    }

    pub fn ref_count(&self, view: ViewId) -> Option<usize> {
        self.nodes.get(&view).map(|node| node.ref_count)
    }

    /// Finds the view that owns a native surface.
    pub fn view_for_surface(&self, surface: NativeHandle) -> Option<ViewId> {
        self.surfaces.get(&surface).copied()
    }

    /// The view’s position relative to its top-level window’s content.
    pub fn screen_position(&self, view: ViewId) -> Option<Point2<i32>> {
        let mut position = Point2::new(0, 0);
        let mut current = view;
        loop {
            let node = self.nodes.get(&current)?;
            match node.parent {
                Some(parent) if parent != self.root => {
                    position.x += node.position.x;
                    position.y += node.position.y;
                    current = parent;
                }
                _ => return Some(position),
            }
        }
    }

    /// Sets a solid background.
    pub fn set_background_color(&mut self, view: ViewId, color: Color) -> Result<(), ViewError> {
        self.set_background(view, Background::Color(color))
    }

    /// Sets a tiled pixmap background. The view keeps a reference to the pixmap.
    pub fn set_background_pixmap(
        &mut self,
        view: ViewId,
        pixmap: Arc<Pixmap>,
    ) -> Result<(), ViewError> {
        self.set_background(view, Background::Pixmap(pixmap))
    }

    fn set_background(&mut self, view: ViewId, background: Background) -> Result<(), ViewError> {
        let surface = self.realized_surface(view)?;
        if let Some(surface) = surface {
            self.backend.set_background(surface, &background)?;
        }
        self.node_mut(view)?.attributes.background = background;
        Ok(())
    }

    pub fn background(&self, view: ViewId) -> Option<&Background> {
        self.nodes.get(&view).map(|node| &node.attributes.background)
    }

    pub fn set_cursor(&mut self, view: ViewId, cursor: Cursor) -> Result<(), ViewError> {
        match self.realized_surface(view)? {
            Some(surface) => self.backend.set_cursor(surface, cursor)?,
            None => self.node_mut(view)?.attributes.cursor = Some(cursor),
        }
        self.node_mut(view)?.cursor = Some(cursor);
        Ok(())
    }

    pub fn cursor(&self, view: ViewId) -> Option<Cursor> {
        self.nodes.get(&view).and_then(|node| node.cursor)
    }

    /// Enables or disables `SizeDidChange` notifications for the view.
    pub fn set_notify_size_changes(&mut self, view: ViewId, notify: bool) -> Result<(), ViewError> {
        self.node_mut(view)?
            .flags
            .set(ViewFlags::NOTIFY_SIZE_CHANGED, notify);
        Ok(())
    }

    pub fn set_delegate(
        &mut self,
        view: ViewId,
        delegate: Option<Arc<dyn ViewDelegate>>,
    ) -> Result<(), ViewError> {
        self.node_mut(view)?.delegate = delegate;
        Ok(())
    }

    /// Sets the balloon (tooltip) text shown for the view.
    pub fn set_balloon_text(&mut self, view: ViewId, text: Option<String>) -> Result<(), ViewError> {
        self.node_mut(view)?.balloon_text = text;
        Ok(())
    }

    pub fn balloon_text(&self, view: ViewId) -> Option<&str> {
        self.nodes
            .get(&view)
            .and_then(|node| node.balloon_text.as_deref())
    }

    /// Sets the drag-and-drop types the view accepts.
    pub fn set_drag_types(&mut self, view: ViewId, types: Vec<String>) -> Result<(), ViewError> {
        self.node_mut(view)?.drag_types = types;
        Ok(())
    }

    pub fn drag_types(&self, view: ViewId) -> &[String] {
        self.nodes
            .get(&view)
            .map_or(&[][..], |node| &node.drag_types[..])
    }

    /// Attaches an input-method context; the view releases it when destroyed.
    pub fn set_input_context(
        &mut self,
        view: ViewId,
        context: Option<InputContext>,
    ) -> Result<(), ViewError> {
        let previous = std::mem::replace(&mut self.node_mut(view)?.input_context, context);
        if let Some(previous) = previous.filter(|p| Some(*p) != context) {
            self.backend.destroy_input_context(previous)?;
        }
        Ok(())
    }

    pub fn input_context(&self, view: ViewId) -> Option<InputContext> {
        self.nodes.get(&view).and_then(|node| node.input_context)
    }
}

#[cfg(test)]
pub(crate) fn test_tree() -> (ViewTree, crate::headless::HeadlessBackend) {
    let backend = crate::headless::HeadlessBackend::new(Vector2::new(1024, 768));
    let tree = ViewTree::new(Box::new(backend.clone()), ScreenContext::default());
    (tree, backend)
}

#[test]
fn test_create_views() {
    let (mut tree, _) = test_tree();
    let root = tree.root();
    assert!(tree.is_realized(root) && tree.is_mapped(root));
    assert_eq!(tree.size(root), Some(Vector2::new(1024, 768)));
    assert_eq!(tree.view_for_surface(tree.surface(root).unwrap()), Some(root));

    let window = tree.create_view(root, ViewKind::TopLevel).unwrap();
    let menu = tree.create_view(root, ViewKind::UnmanagedTopLevel).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();

    assert_eq!(tree.children(root), &[window, menu]);
    assert_eq!(tree.children(window), &[a, b], "subviews keep insertion order");
    assert_eq!(tree.parent(a), Some(window));
    assert_eq!(tree.ref_count(a), Some(1));

    let flags = tree.flags(menu).unwrap();
    assert!(flags.contains(ViewFlags::TOP_LEVEL | ViewFlags::OVERRIDE_REDIRECT));
    assert!(tree.nodes[&menu].attributes.override_redirect);
    assert!(tree.nodes[&window]
        .attributes
        .event_mask
        .contains(EventMask::STRUCTURE_NOTIFY));
    assert!(!tree.nodes[&a]
        .attributes
        .event_mask
        .contains(EventMask::STRUCTURE_NOTIFY));
    assert_eq!(
        tree.background(a),
        Some(&Background::Color(tree.screen().background))
    );

    assert_eq!(tree.top_level_of(b), Some(window));
    assert_eq!(tree.top_level_of(root), None);
}

#[test]
#[should_panic(expected = "top-level views must be children of the root view")]
fn test_top_level_inside_window_panics() {
    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let _ = tree.create_view(window, ViewKind::TopLevel);
}

#[test]
fn test_move_and_resize() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 50).unwrap();
    tree.move_view(window, 5, 6).unwrap();
    assert!(backend.ops().is_empty(), "unrealized views stay in memory");

    tree.realize_view(window).unwrap();
    let surface = tree.surface(window).unwrap();
    assert_eq!(
        backend.frame(surface),
        Some(Rect::new(Point2::new(5, 6), Vector2::new(100, 50)))
    );
    backend.clear_ops();

    tree.move_view(window, 5, 6).unwrap();
    tree.resize_view(window, 100, 50).unwrap();
    assert!(backend.ops().is_empty(), "unchanged geometry is a no-op");

    tree.move_view(window, -10, 20).unwrap();
    tree.resize_view(window, 300, 200).unwrap();
    assert_eq!(
        backend.ops(),
        vec![
            NativeOp::Move(surface, Point2::new(-10, 20)),
            NativeOp::Resize(surface, Vector2::new(300, 200)),
        ]
    );
    assert_eq!(
        tree.frame(window),
        Some(Rect::new(Point2::new(-10, 20), Vector2::new(300, 200)))
    );
}

#[test]
#[should_panic(expected = "view width must be positive")]
fn test_resize_zero_width_panics() {
    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let _ = tree.resize_view(window, 0, 10);
}

#[test]
#[should_panic(expected = "view height must be positive")]
fn test_resize_zero_height_panics() {
    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let _ = tree.resize_view(window, 10, 0);
}

#[test]
#[should_panic(expected = "cannot move the root view")]
fn test_move_root_panics() {
    let (mut tree, _) = test_tree();
    let root = tree.root();
    let _ = tree.move_view(root, 0, 0);
}

#[test]
fn test_delegate_rewrites_geometry() {
    use std::cell::RefCell;

    #[derive(Default)]
    struct Clamp {
        log: RefCell<Vec<&'static str>>,
    }

    impl ViewDelegate for Clamp {
        fn will_move(&self, _tree: &ViewTree, _view: ViewId, origin: &mut Point2<i32>) {
            self.log.borrow_mut().push("will_move");
            origin.x = origin.x.max(0);
        }
        fn did_move(&self, _tree: &mut ViewTree, _view: ViewId) {
            self.log.borrow_mut().push("did_move");
        }
        fn will_resize(&self, _tree: &ViewTree, _view: ViewId, size: &mut Vector2<u32>) {
            self.log.borrow_mut().push("will_resize");
            size.x = size.x.min(64);
        }
        fn did_resize(&self, tree: &mut ViewTree, view: ViewId) {
            self.log.borrow_mut().push("did_resize");
            assert_eq!(tree.size(view).unwrap().x, 64, "did_resize sees the final size");
        }
    }

    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let delegate = Arc::new(Clamp::default());
    tree.set_delegate(window, Some(delegate.clone())).unwrap();

    tree.move_view(window, -20, 7).unwrap();
    tree.resize_view(window, 500, 40).unwrap();
    assert_eq!(tree.position(window), Some(Point2::new(0, 7)));
    assert_eq!(tree.size(window), Some(Vector2::new(64, 40)));

    // clamped onto the current position: no change, no did_move
    tree.move_view(window, -5, 7).unwrap();
    assert_eq!(
        *delegate.log.borrow(),
        vec!["will_move", "did_move", "will_resize", "did_resize", "will_move"]
    );
}

#[test]
fn test_reparent() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 200, 200).unwrap();
    let a = tree.create_view(window, ViewKind::Child).unwrap();
    let b = tree.create_view(window, ViewKind::Child).unwrap();
    let child = tree.create_view(a, ViewKind::Child).unwrap();
    for view in &[a, b, child] {
        tree.resize_view(*view, 10, 10).unwrap();
    }

    // in memory only
    tree.reparent_view(child, b, 3, 4).unwrap();
    assert_eq!(tree.children(a), &[] as &[ViewId]);
    assert_eq!(tree.children(b), &[child]);
    assert_eq!(tree.position(child), Some(Point2::new(3, 4)));

    tree.realize_view(window).unwrap();
    backend.clear_ops();
    tree.reparent_view(child, a, 1, 1).unwrap();
    assert_eq!(
        backend.ops(),
        vec![NativeOp::Reparent {
            surface: tree.surface(child).unwrap(),
            parent: tree.surface(a).unwrap(),
            origin: Point2::new(1, 1),
        }]
    );
    assert_eq!(tree.parent(child), Some(a));
}

#[test]
fn test_reparent_into_unrealized_parent() {
    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 200, 200).unwrap();
    let child = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(child, 10, 10).unwrap();
    tree.move_view(child, 7, 7).unwrap();
    tree.realize_view(window).unwrap();

    let other = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let holder = tree.create_view(other, ViewKind::Child).unwrap();
    backend.clear_ops();

    match tree.reparent_view(child, holder, 1, 1) {
        Err(ViewError::UnrealizedParent(view)) => assert_eq!(view, child),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(backend.ops().is_empty());
    assert_eq!(tree.position(child), Some(Point2::new(7, 7)), "position is kept");
    assert_eq!(tree.parent(child), Some(holder));
}

#[test]
#[should_panic(expected = "cannot reparent a top-level view")]
fn test_reparent_top_level_panics() {
    let (mut tree, _) = test_tree();
    let a = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let b = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let _ = tree.reparent_view(a, b, 0, 0);
}

#[test]
fn test_map_unmap() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 20, 20).unwrap();

    tree.map_view(window).unwrap();
    assert!(!tree.is_mapped(window));
    assert!(tree.flags(window).unwrap().contains(ViewFlags::MAP_WHEN_REALIZED));

    tree.unmap_view(window).unwrap();
    assert!(!tree.flags(window).unwrap().contains(ViewFlags::MAP_WHEN_REALIZED));

    tree.map_view(window).unwrap();
    tree.realize_view(window).unwrap();
    let surface = tree.surface(window).unwrap();
    assert!(tree.is_mapped(window));
    assert!(backend.is_mapped(surface));
    assert!(!tree.flags(window).unwrap().contains(ViewFlags::MAP_WHEN_REALIZED));

    backend.clear_ops();
    tree.map_view(window).unwrap();
    assert!(backend.ops().is_empty(), "already mapped");

    tree.unmap_view(window).unwrap();
    tree.unmap_view(window).unwrap();
    assert_eq!(backend.ops(), vec![NativeOp::Unmap(surface)]);
    assert!(!tree.is_mapped(window));
}

#[test]
fn test_map_subviews_uses_one_batch_call() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 100, 100).unwrap();
    let children: Vec<_> = (0..5)
        .map(|_| {
            let child = tree.create_view(window, ViewKind::Child).unwrap();
            tree.resize_view(child, 10, 10).unwrap();
            child
        })
        .collect();
    tree.realize_view(window).unwrap();
    backend.clear_ops();

    tree.map_subviews(window).unwrap();
    let surface = tree.surface(window).unwrap();
    assert_eq!(backend.ops(), vec![NativeOp::MapSubsurfaces(surface)]);
    for child in &children {
        assert!(tree.is_mapped(*child));
        assert!(backend.is_mapped(tree.surface(*child).unwrap()));
    }

    backend.clear_ops();
    tree.unmap_subviews(window).unwrap();
    assert_eq!(backend.ops(), vec![NativeOp::UnmapSubsurfaces(surface)]);
    assert!(children.iter().all(|child| !tree.is_mapped(*child)));
}

#[test]
fn test_map_subviews_of_unrealized_view() {
    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    assert!(matches!(
        tree.map_subviews(window),
        Err(ViewError::NotRealized(_))
    ));
    assert!(backend.ops().is_empty());
}

#[test]
fn test_raise_lower() {
    let (mut tree, backend) = test_tree();
    let root = tree.root();
    let a = tree.create_view(root, ViewKind::TopLevel).unwrap();
    let b = tree.create_view(root, ViewKind::TopLevel).unwrap();

    tree.raise_view(a).unwrap();
    assert!(backend.ops().is_empty(), "unrealized views can’t be restacked");

    for view in &[a, b] {
        tree.resize_view(*view, 10, 10).unwrap();
        tree.realize_view(*view).unwrap();
    }
    let (sa, sb) = (tree.surface(a).unwrap(), tree.surface(b).unwrap());
    let root_surface = tree.surface(root).unwrap();
    assert_eq!(backend.stacking(root_surface), vec![sa, sb]);

    tree.raise_view(a).unwrap();
    assert_eq!(backend.stacking(root_surface), vec![sb, sa]);
    tree.lower_view(a).unwrap();
    assert_eq!(backend.stacking(root_surface), vec![sa, sb]);
}

#[test]
fn test_attributes() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 10, 10).unwrap();

    tree.set_cursor(window, Cursor(68)).unwrap();
    tree.set_background_color(window, Color::WHITE).unwrap();
    assert!(backend.ops().is_empty());

    tree.realize_view(window).unwrap();
    let surface = tree.surface(window).unwrap();
    let attributes = backend.attributes(surface).unwrap();
    assert_eq!(attributes.cursor, Some(Cursor(68)));
    assert_eq!(attributes.background, Background::Color(Color::WHITE));

    let pixmap = Arc::new(Pixmap {
        id: 9,
        width: 8,
        height: 8,
    });
    backend.clear_ops();
    tree.set_background_pixmap(window, Arc::clone(&pixmap)).unwrap();
    tree.set_cursor(window, Cursor(2)).unwrap();
    assert_eq!(
        backend.ops(),
        vec![
            NativeOp::SetBackground(surface),
            NativeOp::SetCursor(surface, Cursor(2)),
        ]
    );
    assert_eq!(tree.cursor(window), Some(Cursor(2)));
    assert_eq!(Arc::strong_count(&pixmap), 3, "held by us, the view and the surface");

    tree.destroy_view(window).unwrap();
    assert_eq!(Arc::strong_count(&pixmap), 1, "destroyed views release their background");
}

#[test]
fn test_screen_position() {
    let (mut tree, _) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    let panel = tree.create_view(window, ViewKind::Child).unwrap();
    let button = tree.create_view(panel, ViewKind::Child).unwrap();
    tree.move_view(window, 300, 300).unwrap();
    tree.move_view(panel, 10, 20).unwrap();
    tree.move_view(button, 1, 2).unwrap();

    assert_eq!(tree.screen_position(button), Some(Point2::new(11, 22)));
    assert_eq!(tree.screen_position(window), Some(Point2::new(0, 0)));
}

#[test]
fn test_view_resources_are_released_on_destroy() {
    use crate::headless::NativeOp;
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 10, 10).unwrap();

    tree.set_balloon_text(window, Some("Workspace".into())).unwrap();
    tree.set_drag_types(window, vec!["NSFilenamesPboardType".into()]).unwrap();
    tree.set_input_context(window, Some(InputContext(3))).unwrap();
    tree.set_input_context(window, Some(InputContext(4))).unwrap();
    assert_eq!(tree.balloon_text(window), Some("Workspace"));
    assert_eq!(tree.drag_types(window), &["NSFilenamesPboardType".to_string()]);
    assert_eq!(tree.input_context(window), Some(InputContext(4)));

    let sizes = Rc::new(Cell::new(0));
    let s = Rc::clone(&sizes);
    tree.subscribe(NotificationKind::SizeDidChange, Some(window), None, move |_, _| {
        s.set(s.get() + 1)
    });
    tree.resize_view(window, 20, 20).unwrap();
    tree.set_notify_size_changes(window, true).unwrap();
    tree.resize_view(window, 30, 30).unwrap();
    assert_eq!(sizes.get(), 1, "only posted while enabled");

    tree.destroy_view(window).unwrap();
    assert_eq!(
        backend.ops(),
        vec![
            NativeOp::DestroyInputContext(InputContext(3)),
            NativeOp::DestroyInputContext(InputContext(4)),
        ]
    );
    assert_eq!(tree.balloon_text(window), None);
    assert!(tree.drag_types(window).is_empty());
    assert_eq!(tree.notifications.len(), 0);
}

#[test]
#[should_panic(expected = "cannot destroy the root view")]
fn test_destroy_root_panics() {
    let (mut tree, _) = test_tree();
    let root = tree.root();
    tree.create_view(root, ViewKind::TopLevel).unwrap();
    let _ = tree.destroy_view(root);
}

#[test]
fn test_destroy_deep_chain_destroys_one_surface() {
    use crate::headless::NativeOp;

    let (mut tree, backend) = test_tree();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 10, 10).unwrap();
    let mut chain = vec![window];
    for _ in 0..6 {
        let parent = *chain.last().unwrap();
        let child = tree.create_view(parent, ViewKind::Child).unwrap();
        tree.resize_view(child, 10, 10).unwrap();
        chain.push(child);
    }
    tree.realize_view(window).unwrap();
    let surfaces: Vec<_> = chain.iter().map(|v| tree.surface(*v).unwrap()).collect();

    // keep the middle alive so its own subviews are released later
    let middle = tree.retain_view(chain[3]).unwrap();
    backend.clear_ops();
    tree.destroy_view(window).unwrap();
    assert!(tree.flags(middle).unwrap().contains(ViewFlags::PARENT_DYING));
    assert!(!tree.flags(chain[4]).unwrap().contains(ViewFlags::PARENT_DYING));

    tree.destroy_view(middle).unwrap();
    assert_eq!(backend.ops(), vec![NativeOp::Destroy(surfaces[0])]);
    for surface in surfaces {
        assert_eq!(backend.destroy_count(surface), 1);
    }
    assert_eq!(tree.len(), 1);
}
