//! Per-screen defaults.

use crate::backend::{Cursor, SurfaceAttributes};
use crate::color::{Background, Color};
use crate::events::EventMask;

/// Defaults new views inherit from their screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenContext {
    /// Background color of new views.
    pub background: Color,
    /// Border color of new views.
    pub border: Color,
    /// Events new surfaces select.
    pub event_mask: EventMask,
    /// Cursor new surfaces show, if any.
    pub cursor: Option<Cursor>,
}

impl Default for ScreenContext {
    fn default() -> Self {
        ScreenContext {
            background: Color::rgb(0.67, 0.67, 0.67),
            border: Color::BLACK,
            event_mask: EventMask::DEFAULT,
            cursor: None,
        }
    }
}

impl ScreenContext {
    /// Surface attributes for a new view on this screen.
    pub fn default_attributes(&self) -> SurfaceAttributes {
        SurfaceAttributes {
            event_mask: self.event_mask,
            background: Background::Color(self.background),
            border_color: self.border,
            override_redirect: false,
            cursor: self.cursor,
        }
    }
}
