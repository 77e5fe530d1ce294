use cgmath::Vector2;
use std::cell::RefCell;
use std::rc::Rc;
use wview::events::{EventKind, EventMask};
use wview::headless::{HeadlessBackend, NativeOp};
use wview::notify::NotificationKind;
use wview::{ScreenContext, ViewId, ViewKind, ViewTree};

fn setup() -> (ViewTree, HeadlessBackend) {
    let backend = HeadlessBackend::new(Vector2::new(800, 600));
    let tree = ViewTree::new(Box::new(backend.clone()), ScreenContext::default());
    (tree, backend)
}

/// A realized window with `n` realized subviews, each with one realized subview of its own.
fn window_with_subviews(tree: &mut ViewTree, n: usize) -> (ViewId, Vec<ViewId>, Vec<ViewId>) {
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 300, 200).unwrap();
    let mut children = Vec::new();
    let mut grandchildren = Vec::new();
    for _ in 0..n {
        let child = tree.create_view(window, ViewKind::Child).unwrap();
        tree.resize_view(child, 50, 50).unwrap();
        let grandchild = tree.create_view(child, ViewKind::Child).unwrap();
        tree.resize_view(grandchild, 10, 10).unwrap();
        children.push(child);
        grandchildren.push(grandchild);
    }
    tree.realize_view(window).unwrap();
    (window, children, grandchildren)
}

#[test]
fn destroying_a_window_destroys_each_surface_once() {
    let (mut tree, backend) = setup();
    let (window, children, grandchildren) = window_with_subviews(&mut tree, 3);
    let surfaces: Vec<_> = children
        .iter()
        .chain(grandchildren.iter())
        .map(|view| tree.surface(*view).unwrap())
        .collect();
    let window_surface = tree.surface(window).unwrap();
    let views_before = tree.len();
    backend.clear_ops();

    tree.destroy_view(window).unwrap();

    assert_eq!(backend.ops(), vec![NativeOp::Destroy(window_surface)]);
    assert_eq!(backend.destroy_count(window_surface), 1);
    for surface in surfaces {
        assert_eq!(backend.destroy_count(surface), 1);
        assert_eq!(tree.view_for_surface(surface), None);
    }
    assert_eq!(tree.len(), views_before - 7);
    assert_eq!(tree.children(tree.root()), &[] as &[ViewId]);
    assert_eq!(backend.surface_count(), 1);
}

#[test]
fn destroying_a_subview_removes_it_from_its_parent() {
    let (mut tree, backend) = setup();
    let (window, children, grandchildren) = window_with_subviews(&mut tree, 3);
    let surface = tree.surface(children[1]).unwrap();
    backend.clear_ops();

    tree.destroy_view(children[1]).unwrap();

    assert_eq!(tree.children(window), &[children[0], children[2]]);
    assert!(!tree.contains(grandchildren[1]));
    assert_eq!(backend.ops(), vec![NativeOp::Destroy(surface)]);
}

#[test]
fn destroy_handlers_run_children_first_while_surfaces_resolve() {
    let (mut tree, _) = setup();
    let (window, children, grandchildren) = window_with_subviews(&mut tree, 1);
    let log = Rc::new(RefCell::new(Vec::new()));

    for view in &[window, children[0], grandchildren[0]] {
        let l = Rc::clone(&log);
        tree.add_event_handler(*view, EventMask::STRUCTURE_NOTIFY, move |tree, view, event| {
            assert_eq!(event.kind, EventKind::Destroy);
            let surface = event.window.expect("destroy events carry the surface");
            assert_eq!(tree.view_for_surface(surface), Some(view));
            l.borrow_mut().push(view);
        })
        .unwrap();
    }

    tree.destroy_view(window).unwrap();
    assert_eq!(*log.borrow(), vec![grandchildren[0], children[0], window]);
}

#[test]
fn retained_subviews_outlive_their_parent() {
    let (mut tree, backend) = setup();
    let (window, children, _) = window_with_subviews(&mut tree, 2);
    let kept = tree.retain_view(children[0]).unwrap();
    assert_eq!(tree.ref_count(kept), Some(2));
    let kept_surface = tree.surface(kept).unwrap();

    tree.destroy_view(window).unwrap();
    assert!(tree.contains(kept));
    assert!(!tree.contains(children[1]));
    assert_eq!(tree.parent(kept), None);
    assert_eq!(tree.ref_count(kept), Some(1));

    // its surface went away with the window’s; it must not be destroyed again
    tree.destroy_view(kept).unwrap();
    assert!(!tree.contains(kept));
    assert_eq!(backend.destroy_count(kept_surface), 1);
}

#[test]
fn destroy_needs_every_reference_released() {
    let (mut tree, backend) = setup();
    let (window, _, _) = window_with_subviews(&mut tree, 0);
    tree.retain_view(window).unwrap();
    tree.retain_view(window).unwrap();

    tree.destroy_view(window).unwrap();
    tree.destroy_view(window).unwrap();
    assert!(tree.contains(window));
    tree.destroy_view(window).unwrap();
    assert!(!tree.contains(window));
    assert!(tree.destroy_view(window).is_err(), "stale ids are rejected");
    assert_eq!(backend.surface_count(), 1);
}

#[test]
fn removed_handlers_stop_receiving_events() {
    let (mut tree, _) = setup();
    let (window, _, _) = window_with_subviews(&mut tree, 0);
    let calls = Rc::new(RefCell::new(0));
    let c = Rc::clone(&calls);
    let id = tree
        .add_event_handler(window, EventMask::EXPOSURE, move |_, _, _| *c.borrow_mut() += 1)
        .unwrap();
    tree.map_view(window).unwrap();

    tree.redisplay_view(window).unwrap();
    assert!(tree.remove_event_handler(window, id));
    tree.redisplay_view(window).unwrap();
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn did_realize_is_posted_once_per_view() {
    let (mut tree, _) = setup();
    let realized = Rc::new(RefCell::new(Vec::new()));
    let r = Rc::clone(&realized);
    tree.subscribe(NotificationKind::DidRealize, None, None, move |_, n| {
        r.borrow_mut().push(n.source)
    });

    let (window, children, grandchildren) = window_with_subviews(&mut tree, 2);
    tree.realize_view(window).unwrap();

    let mut expected = vec![window, children[0], grandchildren[0], children[1], grandchildren[1]];
    assert_eq!(*realized.borrow(), expected);

    let late = tree.create_view(children[1], ViewKind::Child).unwrap();
    tree.resize_view(late, 4, 4).unwrap();
    tree.realize_view(window).unwrap();
    expected.push(late);
    assert_eq!(*realized.borrow(), expected);
}

#[test]
fn mapping_before_realization_is_deferred() {
    let (mut tree, backend) = setup();
    let window = tree.create_view(tree.root(), ViewKind::TopLevel).unwrap();
    tree.resize_view(window, 40, 40).unwrap();
    let child = tree.create_view(window, ViewKind::Child).unwrap();
    tree.resize_view(child, 20, 20).unwrap();

    tree.map_view(child).unwrap();
    tree.map_view(window).unwrap();
    assert!(backend.ops().is_empty());

    tree.realize_view(window).unwrap();
    let (ws, cs) = (tree.surface(window).unwrap(), tree.surface(child).unwrap());
    assert!(tree.is_mapped(window) && tree.is_mapped(child));
    assert!(backend.is_mapped(ws) && backend.is_mapped(cs));
    let maps: Vec<_> = backend
        .ops()
        .into_iter()
        .filter(|op| match op {
            NativeOp::MapRaised(_) => true,
            _ => false,
        })
        .collect();
    assert_eq!(maps, vec![NativeOp::MapRaised(ws), NativeOp::MapRaised(cs)]);
}

#[test]
fn handlers_can_destroy_their_own_window() {
    let (mut tree, backend) = setup();
    let (window, children, _) = window_with_subviews(&mut tree, 1);
    tree.add_event_handler(children[0], EventMask::BUTTON_PRESS, move |tree, _, _| {
        tree.destroy_view(window).unwrap();
    })
    .unwrap();

    let surface = tree.surface(children[0]);
    let press = wview::events::Event {
        window: surface,
        kind: EventKind::ButtonPress(wview::events::Button {
            button: 1,
            location: cgmath::Point2::new(5, 5),
            root_location: cgmath::Point2::new(5, 5),
            modifiers: Default::default(),
            time: 0,
        }),
    };
    assert!(tree.handle_event(press));
    assert!(!tree.contains(window));
    assert!(!tree.contains(children[0]));
    assert_eq!(backend.surface_count(), 1);
}
