//! View hierarchy for a window manager.
//!
//! # Conceptual overview
//! A `ViewTree` mirrors the native surfaces (e.g. X windows) a window manager puts on a screen.
//! Every view is a rectangle with a position relative to its parent, a size, and optionally a
//! native surface.
//!
//! ## Views
//! There are three kinds of views. The root view stands for the screen’s root surface; it exists
//! for as long as the tree and can’t be moved or destroyed. Top-level views (frames, menus,
//! icons) are children of the root; unmanaged top-level views additionally set override-redirect.
//! All other views are children inside a top-level view.
//!
//! Views are reference counted. `create_view` hands out the first reference, `retain_view` adds
//! one, and `destroy_view` drops one; a view is torn down along with its subviews once the last
//! reference is gone. Subviews retained elsewhere outlive their parent as orphans.
//!
//! ## Realization
//! Creating a view only allocates it in memory. Geometry and attributes can be changed freely
//! until the view is realized, at which point the native surface is created with everything set
//! so far. Realization runs top-down: a view can only be realized after its parent. Mapping a view
//! before it is realized is remembered and carried out when its surface appears.
//!
//! ## Events
//! Native events are addressed to surfaces. The tree maps each surface back to its view and runs
//! the view’s handlers whose masks match, synchronously and in registration order. Handlers get
//! `&mut ViewTree` and may freely restructure the tree, including destroying the view they were
//! called for.
//!
//! Each top-level view remembers which of its descendants has keyboard focus; moving focus sends
//! `FocusOut` to the old view before `FocusIn` reaches the new one.
//!
//! ## Layout
//! Views don’t lay themselves out. Delegates can veto or adjust moves and resizes, and
//! `expand_to_parent` keeps a view at fixed distances from its parent’s edges by listening for
//! the parent’s `SizeDidChange` notification.
//!
//! ## Backends
//! Everything native goes through the `Backend` trait. `HeadlessBackend` keeps surfaces in memory,
//! which is what the tests run against.

pub mod backend;
pub mod color;
mod dispatch;
mod error;
pub mod events;
mod focus;
pub mod headless;
mod host;
mod layout;
pub mod notify;
mod realize;
mod rect;
mod screen;
mod tree;
mod view;

pub use error::ViewError;
pub use host::Host;
pub use rect::{EdgeOffsets, Rect};
pub use screen::ScreenContext;
pub use tree::ViewTree;
pub use view::{ViewDelegate, ViewFlags, ViewId, ViewKind};
