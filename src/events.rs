//! Events.

use crate::backend::NativeHandle;
use crate::rect::Rect;
use crate::tree::ViewTree;
use crate::view::ViewId;
use bitflags::bitflags;
use cgmath::Point2;
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

bitflags! {
    /// Event selection mask.
    pub struct EventMask: u32 {
        const KEY_PRESS = 1 << 0;
        const KEY_RELEASE = 1 << 1;
        const BUTTON_PRESS = 1 << 2;
        const BUTTON_RELEASE = 1 << 3;
        const ENTER_WINDOW = 1 << 4;
        const LEAVE_WINDOW = 1 << 5;
        const POINTER_MOTION = 1 << 6;
        const EXPOSURE = 1 << 7;
        const VISIBILITY_CHANGE = 1 << 8;
        const FOCUS_CHANGE = 1 << 9;
        const PROPERTY_CHANGE = 1 << 10;
        const STRUCTURE_NOTIFY = 1 << 11;
        const SUBSTRUCTURE_NOTIFY = 1 << 12;
        const SUBSTRUCTURE_REDIRECT = 1 << 13;
        /// Client messages carry no native mask; handlers opt in explicitly.
        const CLIENT_MESSAGE = 1 << 14;

        /// What every non-root surface selects by default.
        const DEFAULT = Self::KEY_PRESS.bits
            | Self::KEY_RELEASE.bits
            | Self::BUTTON_PRESS.bits
            | Self::BUTTON_RELEASE.bits
            | Self::ENTER_WINDOW.bits
            | Self::LEAVE_WINDOW.bits
            | Self::POINTER_MOTION.bits
            | Self::EXPOSURE.bits
            | Self::VISIBILITY_CHANGE.bits
            | Self::FOCUS_CHANGE.bits
            | Self::PROPERTY_CHANGE.bits
            | Self::SUBSTRUCTURE_NOTIFY.bits
            | Self::SUBSTRUCTURE_REDIRECT.bits;
    }
}

/// Modifier key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    /// Whether any shift key is pressed.
    pub shift: bool,

    /// Whether any control key is pressed.
    pub control: bool,

    /// Whether any alt key is pressed.
    pub alt: bool,

    /// Whether any super/command key is pressed.
    pub command: bool,
}

/// A key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    /// Hardware keycode.
    pub code: u32,
    pub modifiers: KeyModifiers,
    /// Server timestamp in milliseconds.
    pub time: u32,
}

/// A pointer button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Button number, starting at 1.
    pub button: u8,

    /// Event location in the surface's coordinate system.
    pub location: Point2<i32>,

    /// Event location in the root coordinate system.
    pub root_location: Point2<i32>,

    pub modifiers: KeyModifiers,
    pub time: u32,
}

/// Pointer motion, or the pointer crossing a surface boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    pub location: Point2<i32>,
    pub root_location: Point2<i32>,
    pub modifiers: KeyModifiers,
    pub time: u32,
}

/// Why focus changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Normal,
    Grab,
    Ungrab,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    KeyPress(Key),
    KeyRelease(Key),
    ButtonPress(Button),
    ButtonRelease(Button),
    Motion(Motion),
    Enter(Motion),
    Leave(Motion),
    FocusIn(FocusMode),
    FocusOut(FocusMode),
    /// Part of the surface needs repainting; `count` more expose events follow.
    Expose { area: Rect, count: u32 },
    Visibility { obscured: bool },
    Property { atom: u32 },
    /// The surface's geometry changed.
    Configure { frame: Rect },
    /// The surface (or its view) is being destroyed.
    Destroy,
    ClientMessage { message_type: u32, data: [i64; 5] },
}

impl EventKind {
    /// The mask a handler must select to receive this kind of event.
    pub fn mask(&self) -> EventMask {
        match self {
            EventKind::KeyPress(_) => EventMask::KEY_PRESS,
            EventKind::KeyRelease(_) => EventMask::KEY_RELEASE,
            EventKind::ButtonPress(_) => EventMask::BUTTON_PRESS,
            EventKind::ButtonRelease(_) => EventMask::BUTTON_RELEASE,
            EventKind::Motion(_) => EventMask::POINTER_MOTION,
            EventKind::Enter(_) => EventMask::ENTER_WINDOW,
            EventKind::Leave(_) => EventMask::LEAVE_WINDOW,
            EventKind::FocusIn(_) | EventKind::FocusOut(_) => EventMask::FOCUS_CHANGE,
            EventKind::Expose { .. } => EventMask::EXPOSURE,
            EventKind::Visibility { .. } => EventMask::VISIBILITY_CHANGE,
            EventKind::Property { .. } => EventMask::PROPERTY_CHANGE,
            EventKind::Configure { .. } | EventKind::Destroy => EventMask::STRUCTURE_NOTIFY,
            EventKind::ClientMessage { .. } => EventMask::CLIENT_MESSAGE,
        }
    }
}

/// An event addressed to a native surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The target surface. Stamped by the dispatcher for synthetic events.
    pub window: Option<NativeHandle>,
    pub kind: EventKind,
}

impl Event {
    /// Creates an event that hasn’t been addressed yet.
    pub fn new(kind: EventKind) -> Event {
        Event { window: None, kind }
    }

    /// Creates an event addressed to a surface.
    pub fn to(window: NativeHandle, kind: EventKind) -> Event {
        Event {
            window: Some(window),
            kind,
        }
    }
}

/// Refers to a single registered event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(pub(crate) u64);

type HandlerFn = dyn FnMut(&mut ViewTree, ViewId, &Event);

/// An event handler closure.
///
/// Handlers get mutable access to the tree and may create, move, resize or destroy views while
/// they run. Whatever the closure captures is released when the handler is removed or its view is
/// destroyed.
pub struct EventHandler(Arc<Mutex<HandlerFn>>);

impl Clone for EventHandler {
    fn clone(&self) -> Self {
        EventHandler(Arc::clone(&self.0))
    }
}

impl EventHandler {
    pub fn new<F: 'static + FnMut(&mut ViewTree, ViewId, &Event)>(handler: F) -> Self {
        EventHandler(Arc::new(Mutex::new(handler)))
    }

    /// Runs the handler.
    ///
    /// Returns false without running anything if the handler is already running further up the
    /// stack.
    pub(crate) fn call(&self, tree: &mut ViewTree, view: ViewId, event: &Event) -> bool {
        match self.0.try_lock() {
            Some(mut handler) => {
                (&mut *handler)(tree, view, event);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventHandler")
    }
}

/// A handler registered on a view.
#[derive(Debug, Clone)]
pub(crate) struct RegisteredHandler {
    pub(crate) id: HandlerId,
    pub(crate) mask: EventMask,
    pub(crate) handler: EventHandler,
}

#[test]
fn test_event_masks() {
    let key = Key {
        code: 38,
        modifiers: KeyModifiers::default(),
        time: 0,
    };
    assert_eq!(EventKind::KeyPress(key).mask(), EventMask::KEY_PRESS);
    assert_eq!(EventKind::FocusOut(FocusMode::Normal).mask(), EventMask::FOCUS_CHANGE);
    assert_eq!(EventKind::Destroy.mask(), EventMask::STRUCTURE_NOTIFY);
    assert!(EventMask::DEFAULT.contains(EventMask::EXPOSURE));
    assert!(!EventMask::DEFAULT.contains(EventMask::STRUCTURE_NOTIFY));
}
