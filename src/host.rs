use crate::backend::Backend;
use crate::events::Event;
use crate::screen::ScreenContext;
use crate::tree::ViewTree;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, trace};
use std::time::{Duration, Instant};

/// How long `poll_until` blocks on the queue before checking its predicate again.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// Connects a view tree to the native event queue.
///
/// The native side pushes events into the queue through senders from `event_sender`, possibly
/// from other threads; the tree only sees them when the owner calls `poll`.
pub struct Host {
    pub tree: ViewTree,
    event_send: Sender<Event>,
    event_recv: Receiver<Event>,
}

impl Host {
    /// Creates a new Host with an empty view tree.
    pub fn new(backend: Box<dyn Backend>, screen: ScreenContext) -> Host {
        let (event_send, event_recv) = channel::unbounded();

        Host {
            tree: ViewTree::new(backend, screen),
            event_send,
            event_recv,
        }
    }

    /// Returns a sender for native events.
    pub fn event_sender(&self) -> Sender<Event> {
        self.event_send.clone()
    }

    /// Dispatches every queued event. Returns how many were dispatched.
    pub fn poll(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.event_recv.try_recv() {
                Ok(event) => {
                    self.recv_event(event);
                    count += 1;
                }
                // the host holds a sender itself, so the queue can’t disconnect
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Dispatches events until `done` returns true or the timeout passes.
    ///
    /// Returns true if `done` returned true. On timeout, `on_timeout` is called once and false is
    /// returned.
    pub fn poll_until<D, T>(&mut self, timeout: Duration, mut done: D, on_timeout: T) -> bool
    where
        D: FnMut(&ViewTree) -> bool,
        T: FnOnce(&mut ViewTree),
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if done(&self.tree) {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("poll timed out after {:?}", timeout);
                on_timeout(&mut self.tree);
                return false;
            }

            let slice = POLL_SLICE.min(deadline - now);
            match self.event_recv.recv_timeout(slice) {
                Ok(event) => self.recv_event(event),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => (),
            }
        }
    }

    fn recv_event(&mut self, event: Event) {
        trace!("received {:?}", event);
        self.tree.handle_event(event);
    }
}

#[test]
fn test_poll_dispatches_queued_events() {
    use crate::events::{EventKind, EventMask};
    use crate::headless::HeadlessBackend;
    use crate::view::ViewKind;
    use cgmath::Vector2;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::thread;

    let backend = HeadlessBackend::new(Vector2::new(640, 480));
    let mut host = Host::new(Box::new(backend), ScreenContext::default());
    let window = host.tree.create_view(host.tree.root(), ViewKind::TopLevel).unwrap();
    host.tree.resize_view(window, 10, 10).unwrap();
    host.tree.realize_view(window).unwrap();
    let surface = host.tree.surface(window).unwrap();

    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    host.tree
        .add_event_handler(window, EventMask::PROPERTY_CHANGE, move |_, _, _| {
            c.set(c.get() + 1)
        })
        .unwrap();

    let sender = host.event_sender();
    thread::spawn(move || {
        for atom in 0..3 {
            sender
                .send(Event::to(surface, EventKind::Property { atom }))
                .unwrap();
        }
    })
    .join()
    .unwrap();

    assert_eq!(calls.get(), 0, "nothing is dispatched before polling");
    assert_eq!(host.poll(), 3);
    assert_eq!(calls.get(), 3);
    assert_eq!(host.poll(), 0);
}

#[test]
fn test_poll_until() {
    use crate::events::EventKind;
    use crate::headless::HeadlessBackend;
    use cgmath::Vector2;
    use std::cell::Cell;

    let backend = HeadlessBackend::new(Vector2::new(640, 480));
    let mut host = Host::new(Box::new(backend), ScreenContext::default());
    let root_surface = host.tree.surface(host.tree.root()).unwrap();

    let timed_out = Cell::new(false);
    let done = host.poll_until(
        Duration::from_millis(30),
        |_| false,
        |_| timed_out.set(true),
    );
    assert!(!done);
    assert!(timed_out.get());

    host.event_sender()
        .send(Event::to(root_surface, EventKind::Destroy))
        .unwrap();
    let polls = Cell::new(0);
    let done = host.poll_until(
        Duration::from_secs(5),
        |_| {
            polls.set(polls.get() + 1);
            polls.get() > 1
        },
        |_| panic!("should not time out"),
    );
    assert!(done);
}
