//! Traits for backends.

use crate::color::{Background, Color};
use crate::events::EventMask;
use crate::rect::Rect;
use cgmath::{Point2, Vector2};
use core::fmt;
use thiserror::Error;

/// An opaque reference to a surface in the backend (e.g. an X window id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(pub u64);

/// A pointer cursor known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor(pub u32);

/// An input-method context attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputContext(pub u64);

/// Attributes a surface is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAttributes {
    /// Events the surface is interested in.
    pub event_mask: EventMask,
    pub background: Background,
    pub border_color: Color,
    /// If true, the window manager must not intercept mapping or configuring this surface.
    pub override_redirect: bool,
    pub cursor: Option<Cursor>,
}

/// Errors reported by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no such native surface: {0:?}")]
    NoSuchSurface(NativeHandle),
    #[error("native surface allocation failed: {0}")]
    Allocation(String),
    #[error("backend error: {0}")]
    Other(String),
}

/// A backend implementation.
///
/// All calls happen on the thread that owns the view tree.
pub trait Backend: fmt::Debug {
    /// The screen's root surface.
    fn root_surface(&self) -> NativeHandle;

    /// The size of the screen's root surface.
    fn screen_size(&self) -> Vector2<u32>;

    /// Creates a new, unmapped surface.
    fn create_surface(
        &mut self,
        parent: NativeHandle,
        frame: Rect,
        attributes: &SurfaceAttributes,
    ) -> Result<NativeHandle, BackendError>;

    /// Destroys a surface along with all of its subsurfaces.
    fn destroy_surface(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    fn move_surface(&mut self, surface: NativeHandle, origin: Point2<i32>)
        -> Result<(), BackendError>;

    fn resize_surface(&mut self, surface: NativeHandle, size: Vector2<u32>)
        -> Result<(), BackendError>;

    /// Maps the surface and raises it to the top of its siblings.
    fn map_raised(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    fn unmap(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    /// Maps all direct subsurfaces in a single request.
    fn map_subsurfaces(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    /// Unmaps all direct subsurfaces in a single request.
    fn unmap_subsurfaces(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    fn raise(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    fn lower(&mut self, surface: NativeHandle) -> Result<(), BackendError>;

    fn reparent(
        &mut self,
        surface: NativeHandle,
        new_parent: NativeHandle,
        origin: Point2<i32>,
    ) -> Result<(), BackendError>;

    /// Sets the background and clears the surface with it.
    fn set_background(
        &mut self,
        surface: NativeHandle,
        background: &Background,
    ) -> Result<(), BackendError>;

    fn set_cursor(&mut self, surface: NativeHandle, cursor: Cursor) -> Result<(), BackendError>;

    /// Releases an input-method context.
    fn destroy_input_context(&mut self, context: InputContext) -> Result<(), BackendError> {
        let _ = context;
        Ok(())
    }
}
