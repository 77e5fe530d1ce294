//! A backend that keeps surfaces in memory.
//!
//! Useful for tests and for running the view tree without a display server. Clones share the same
//! state, so a test can hand one clone to the tree and inspect the other.

use crate::backend::{
    Backend, BackendError, Cursor, InputContext, NativeHandle, SurfaceAttributes,
};
use crate::color::Background;
use crate::rect::Rect;
use crate::screen::ScreenContext;
use cgmath::{Point2, Vector2};
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A native request, as recorded by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeOp {
    Create {
        surface: NativeHandle,
        parent: NativeHandle,
        frame: Rect,
    },
    Destroy(NativeHandle),
    Move(NativeHandle, Point2<i32>),
    Resize(NativeHandle, Vector2<u32>),
    MapRaised(NativeHandle),
    Unmap(NativeHandle),
    MapSubsurfaces(NativeHandle),
    UnmapSubsurfaces(NativeHandle),
    Raise(NativeHandle),
    Lower(NativeHandle),
    Reparent {
        surface: NativeHandle,
        parent: NativeHandle,
        origin: Point2<i32>,
    },
    SetBackground(NativeHandle),
    SetCursor(NativeHandle, Cursor),
    DestroyInputContext(InputContext),
}

#[derive(Debug)]
struct Surface {
    parent: Option<NativeHandle>,
    /// Back to front.
    children: Vec<NativeHandle>,
    frame: Rect,
    mapped: bool,
    attributes: SurfaceAttributes,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_handle: u64,
    surfaces: HashMap<NativeHandle, Surface>,
    ops: Vec<NativeOp>,
    destroy_counts: HashMap<NativeHandle, usize>,
    fail_allocations: bool,
}

impl HeadlessState {
    fn surface_mut(&mut self, handle: NativeHandle) -> Result<&mut Surface, BackendError> {
        self.surfaces
            .get_mut(&handle)
            .ok_or(BackendError::NoSuchSurface(handle))
    }

    fn parent_of(&self, handle: NativeHandle) -> Result<Option<NativeHandle>, BackendError> {
        self.surfaces
            .get(&handle)
            .map(|surface| surface.parent)
            .ok_or(BackendError::NoSuchSurface(handle))
    }

    /// Moves a surface to the top (or bottom) of its siblings.
    fn restack(&mut self, handle: NativeHandle, top: bool) -> Result<(), BackendError> {
        if let Some(parent) = self.parent_of(handle)? {
            let siblings = &mut self.surface_mut(parent)?.children;
            siblings.retain(|h| *h != handle);
            if top {
                siblings.push(handle);
            } else {
                siblings.insert(0, handle);
            }
        }
        Ok(())
    }

    fn remove_tree(&mut self, handle: NativeHandle) {
        *self.destroy_counts.entry(handle).or_insert(0) += 1;
        if let Some(surface) = self.surfaces.remove(&handle) {
            for child in surface.children {
                self.remove_tree(child);
            }
        }
    }
}

/// An in-memory backend.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    root: NativeHandle,
    screen_size: Vector2<u32>,
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    /// Creates a backend with a mapped root surface of the given size.
    pub fn new(screen_size: Vector2<u32>) -> HeadlessBackend {
        let root = NativeHandle(1);
        let mut state = HeadlessState::default();
        state.next_handle = 2;
        state.surfaces.insert(
            root,
            Surface {
                parent: None,
                children: Vec::new(),
                frame: Rect::new(Point2::new(0, 0), screen_size),
                mapped: true,
                attributes: ScreenContext::default().default_attributes(),
            },
        );

        HeadlessBackend {
            root,
            screen_size,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Returns every request made so far, in order.
    pub fn ops(&self) -> Vec<NativeOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Makes subsequent surface creation fail.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.lock().fail_allocations = fail;
    }

    /// The number of live surfaces, including the root.
    pub fn surface_count(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    pub fn contains(&self, surface: NativeHandle) -> bool {
        self.state.lock().surfaces.contains_key(&surface)
    }

    pub fn frame(&self, surface: NativeHandle) -> Option<Rect> {
        self.state.lock().surfaces.get(&surface).map(|s| s.frame)
    }

    pub fn is_mapped(&self, surface: NativeHandle) -> bool {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .map_or(false, |s| s.mapped)
    }

    /// The subsurfaces of a surface, back to front.
    pub fn stacking(&self, surface: NativeHandle) -> Vec<NativeHandle> {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .map_or_else(Vec::new, |s| s.children.clone())
    }

    pub fn attributes(&self, surface: NativeHandle) -> Option<SurfaceAttributes> {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .map(|s| s.attributes.clone())
    }

    /// How many times the surface has been destroyed, either directly or along with an ancestor.
    pub fn destroy_count(&self, surface: NativeHandle) -> usize {
        self.state
            .lock()
            .destroy_counts
            .get(&surface)
            .copied()
            .unwrap_or(0)
    }
}

impl Backend for HeadlessBackend {
    fn root_surface(&self) -> NativeHandle {
        self.root
    }

    fn screen_size(&self) -> Vector2<u32> {
        self.screen_size
    }

    fn create_surface(
        &mut self,
        parent: NativeHandle,
        frame: Rect,
        attributes: &SurfaceAttributes,
    ) -> Result<NativeHandle, BackendError> {
        let mut state = self.state.lock();
        if state.fail_allocations {
            return Err(BackendError::Allocation("allocations are disabled".into()));
        }

        let surface = NativeHandle(state.next_handle);
        state.next_handle += 1;
        state.surface_mut(parent)?.children.push(surface);
        state.surfaces.insert(
            surface,
            Surface {
                parent: Some(parent),
                children: Vec::new(),
                frame,
                mapped: false,
                attributes: attributes.clone(),
            },
        );
        state.ops.push(NativeOp::Create {
            surface,
            parent,
            frame,
        });
        trace!("created surface {:?} in {:?}", surface, parent);
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.ops.push(NativeOp::Destroy(surface));
        let parent = match state.parent_of(surface) {
            Ok(parent) => parent,
            Err(err) => {
                *state.destroy_counts.entry(surface).or_insert(0) += 1;
                return Err(err);
            }
        };
        if let Some(parent) = parent {
            if let Ok(parent) = state.surface_mut(parent) {
                parent.children.retain(|h| *h != surface);
            }
        }
        state.remove_tree(surface);
        Ok(())
    }

    fn move_surface(
        &mut self,
        surface: NativeHandle,
        origin: Point2<i32>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.frame.origin = origin;
        state.ops.push(NativeOp::Move(surface, origin));
        Ok(())
    }

    fn resize_surface(
        &mut self,
        surface: NativeHandle,
        size: Vector2<u32>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.frame.size = size;
        state.ops.push(NativeOp::Resize(surface, size));
        Ok(())
    }

    fn map_raised(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.mapped = true;
        state.restack(surface, true)?;
        state.ops.push(NativeOp::MapRaised(surface));
        Ok(())
    }

    fn unmap(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.mapped = false;
        state.ops.push(NativeOp::Unmap(surface));
        Ok(())
    }

    fn map_subsurfaces(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let children = state.surface_mut(surface)?.children.clone();
        for child in children {
            state.surface_mut(child)?.mapped = true;
        }
        state.ops.push(NativeOp::MapSubsurfaces(surface));
        Ok(())
    }

    fn unmap_subsurfaces(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let children = state.surface_mut(surface)?.children.clone();
        for child in children {
            state.surface_mut(child)?.mapped = false;
        }
        state.ops.push(NativeOp::UnmapSubsurfaces(surface));
        Ok(())
    }

    fn raise(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.restack(surface, true)?;
        state.ops.push(NativeOp::Raise(surface));
        Ok(())
    }

    fn lower(&mut self, surface: NativeHandle) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.restack(surface, false)?;
        state.ops.push(NativeOp::Lower(surface));
        Ok(())
    }

    fn reparent(
        &mut self,
        surface: NativeHandle,
        new_parent: NativeHandle,
        origin: Point2<i32>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(new_parent)?;
        if let Some(old_parent) = state.parent_of(surface)? {
            state
                .surface_mut(old_parent)?
                .children
                .retain(|h| *h != surface);
        }
        let node = state.surface_mut(surface)?;
        node.parent = Some(new_parent);
        node.frame.origin = origin;
        state.surface_mut(new_parent)?.children.push(surface);
        state.ops.push(NativeOp::Reparent {
            surface,
            parent: new_parent,
            origin,
        });
        Ok(())
    }

    fn set_background(
        &mut self,
        surface: NativeHandle,
        background: &Background,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.attributes.background = background.clone();
        state.ops.push(NativeOp::SetBackground(surface));
        Ok(())
    }

    fn set_cursor(&mut self, surface: NativeHandle, cursor: Cursor) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.surface_mut(surface)?.attributes.cursor = Some(cursor);
        state.ops.push(NativeOp::SetCursor(surface, cursor));
        Ok(())
    }

    fn destroy_input_context(&mut self, context: InputContext) -> Result<(), BackendError> {
        self.state
            .lock()
            .ops
            .push(NativeOp::DestroyInputContext(context));
        Ok(())
    }
}

#[test]
fn test_destroy_takes_subsurfaces_along() {
    let mut backend = HeadlessBackend::new(Vector2::new(100, 100));
    let root = backend.root_surface();
    let attributes = ScreenContext::default().default_attributes();
    let frame = Rect::new(Point2::new(0, 0), Vector2::new(10, 10));

    let window = backend.create_surface(root, frame, &attributes).unwrap();
    let child = backend.create_surface(window, frame, &attributes).unwrap();
    assert_eq!(backend.surface_count(), 3);

    backend.destroy_surface(window).unwrap();
    assert_eq!(backend.surface_count(), 1);
    assert_eq!(backend.stacking(root), vec![]);
    assert_eq!(backend.destroy_count(child), 1);

    assert!(backend.destroy_surface(child).is_err());
    assert_eq!(backend.destroy_count(child), 2, "double destroys are counted");
}

#[test]
fn test_failed_allocation() {
    let mut backend = HeadlessBackend::new(Vector2::new(100, 100));
    let root = backend.root_surface();
    backend.set_fail_allocations(true);
    let frame = Rect::new(Point2::new(0, 0), Vector2::new(10, 10));
    let attributes = ScreenContext::default().default_attributes();
    match backend.create_surface(root, frame, &attributes) {
        Err(BackendError::Allocation(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(backend.ops().is_empty());
}
