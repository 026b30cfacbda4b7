// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::*;
use crate::error::{BackendError, ContextError};
use std::cell::Cell;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    KeyPress,
    KeyRelease,
    Expose,
    Motion,
}

#[derive(Debug)]
struct MockEvent {
    kind: Kind,
    serial: u32,
}

#[derive(Default)]
struct Stats {
    connects: usize,
    teardowns: usize,
    windows: Vec<(u32, u32, String)>,
    masks: Vec<EventMask>,
    pending: VecDeque<MockEvent>,
    fail_connect: bool,
    fail_teardown: bool,
    next_serial: u32,
}

thread_local! {
    static STATS: RefCell<Stats> = RefCell::new(Stats::default());
}

fn reset() {
    STATS.with(|s| *s.borrow_mut() = Stats::default());
}

fn stats<R>(f: impl FnOnce(&mut Stats) -> R) -> R {
    STATS.with(|s| f(&mut s.borrow_mut()))
}

fn push(kind: Kind) {
    stats(|s| {
        s.next_serial += 1;
        let serial = s.next_serial;
        s.pending.push_back(MockEvent { kind, serial });
    });
}

#[derive(Default)]
struct MockBackend {
    connected: bool,
    window: bool,
}

impl Backend for MockBackend {
    const CONTEXT_KEY: &'static str = "mock";
    const MAX_SUBSCRIBERS: usize = 3;

    type Event = MockEvent;
    type EventType = Kind;

    fn create() -> Self {
        Self::default()
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        if stats(|s| s.fail_connect) {
            return Err(BackendError::ConnectionFailed {
                backend: Self::CONTEXT_KEY,
                reason: "no display".to_string(),
            });
        }
        stats(|s| s.connects += 1);
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn has_window(&self) -> bool {
        self.window
    }

    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), BackendError> {
        stats(|s| s.windows.push((width, height, title.to_string())));
        self.window = true;
        Ok(())
    }

    fn select_input(&mut self, mask: EventMask) {
        stats(|s| s.masks.push(mask));
    }

    fn poll_event(&mut self) -> Option<MockEvent> {
        stats(|s| s.pending.pop_front())
    }

    fn event_type(event: &MockEvent) -> Kind {
        event.kind
    }

    fn teardown(&mut self) -> Result<(), BackendError> {
        stats(|s| s.teardowns += 1);
        self.connected = false;
        if stats(|s| s.fail_teardown) {
            return Err(BackendError::TeardownFailed {
                backend: Self::CONTEXT_KEY,
                reason: "display already gone".to_string(),
            });
        }
        Ok(())
    }
}

/// A backend with no subscriber slot at all.
struct Closed;

impl Backend for Closed {
    const CONTEXT_KEY: &'static str = "closed";
    const MAX_SUBSCRIBERS: usize = 0;

    type Event = ();
    type EventType = ();

    fn create() -> Self {
        Closed
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn has_window(&self) -> bool {
        false
    }

    fn create_window(&mut self, _: u32, _: u32, _: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<()> {
        None
    }

    fn event_type(_: &()) {}

    fn teardown(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

type Hook = Box<dyn FnMut()>;

/// A subscriber recording what it was notified about.
#[derive(Default)]
struct Recorder {
    sub: RefCell<Option<Subscription<MockBackend>>>,
    seen: RefCell<Vec<(Kind, u32)>>,
    last: RefCell<Option<Rc<MockEvent>>>,
    hook: RefCell<Option<Hook>>,
}

impl Recorder {
    fn seen_kinds(&self) -> Vec<Kind> {
        self.seen.borrow().iter().map(|(k, _)| *k).collect()
    }

    fn release(&self) {
        let sub = self.sub.borrow_mut().take();
        drop(sub);
    }

    fn with_sub<R>(&self, f: impl FnOnce(&Subscription<MockBackend>) -> R) -> R {
        f(self.sub.borrow().as_ref().unwrap())
    }

    fn on_each_event(&self, hook: impl FnMut() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }
}

impl EventHandler for Recorder {
    fn on_event(&self) {
        let event = self.with_sub(|s| s.current_event()).unwrap();
        self.seen.borrow_mut().push((event.kind, event.serial));
        *self.last.borrow_mut() = Some(event);

        let hook = self.hook.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook();
            *self.hook.borrow_mut() = Some(hook);
        }
    }
}

fn join(
    app: &App,
    request: SubscriptionRequest<Kind>,
) -> Result<Rc<Recorder>, MultiplexerError> {
    let recorder = Rc::new(Recorder::default());
    let handler = Rc::downgrade(&recorder);
    let handler: Weak<dyn EventHandler> = handler;
    let sub = Multiplexer::<MockBackend>::acquire(app, request.with_handler(handler))?;
    *recorder.sub.borrow_mut() = Some(sub);
    Ok(recorder)
}

fn listen(app: &App, types: &[Kind]) -> Rc<Recorder> {
    join(
        app,
        SubscriptionRequest::new(EventFilter::only(types.iter().copied())),
    )
    .unwrap()
}

fn listen_all(app: &App) -> Rc<Recorder> {
    join(app, SubscriptionRequest::new(EventFilter::All)).unwrap()
}

#[test]
fn test_capacity_is_enforced_and_slots_reused() {
    reset();
    let app = App::default();
    let subs: Vec<_> = (0..3).map(|_| listen_all(&app)).collect();

    let err = join(&app, SubscriptionRequest::default()).err().unwrap();
    assert_eq!(
        err,
        MultiplexerError::ResourceExhausted {
            backend: "mock",
            capacity: 3
        }
    );
    // The failed acquire must not have disturbed the live multiplexer.
    assert!(Multiplexer::<MockBackend>::exists(&app));
    assert_eq!(subs[0].with_sub(|s| s.subscriber_count()), 3);

    subs[1].release();
    let again = listen_all(&app);
    assert_eq!(again.with_sub(|s| s.subscriber_count()), 3);
}

#[test]
fn test_single_teardown_whatever_the_release_order() {
    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
        reset();
        let app = App::default();
        let subs: Vec<_> = (0..3).map(|_| listen_all(&app)).collect();
        app.dispatch_events().unwrap();
        assert_eq!(stats(|s| s.connects), 1);

        for (released, index) in order.into_iter().enumerate() {
            assert!(Multiplexer::<MockBackend>::exists(&app));
            subs[index].release();
            let expected = usize::from(released == 2);
            assert_eq!(stats(|s| s.teardowns), expected, "order {order:?}");
        }

        assert!(!Multiplexer::<MockBackend>::exists(&app));
        assert_eq!(app.active_dispatchers(), 0);
        assert!(app.registry().context("mock").unwrap().is_empty());
    }
}

#[test]
fn test_filtered_delivery() {
    reset();
    let app = App::default();
    let keys = listen(&app, &[Kind::KeyPress]);
    let expose = listen(&app, &[Kind::Expose]);

    push(Kind::KeyPress);
    push(Kind::Expose);
    push(Kind::KeyRelease);
    assert_eq!(app.dispatch_events(), Ok(2));

    assert_eq!(keys.seen_kinds(), vec![Kind::KeyPress]);
    assert_eq!(expose.seen_kinds(), vec![Kind::Expose]);
    assert!(stats(|s| s.pending.is_empty()));
}

#[test]
fn test_events_delivered_in_native_order() {
    reset();
    let app = App::default();
    let all = listen_all(&app);
    for kind in [Kind::Motion, Kind::KeyPress, Kind::Motion] {
        push(kind);
    }
    app.dispatch_events().unwrap();
    let serials: Vec<u32> = all.seen.borrow().iter().map(|(_, s)| *s).collect();
    assert_eq!(serials, vec![1, 2, 3]);
}

#[test]
fn test_first_window_owner_wins() {
    reset();
    let app = App::default();
    let first = join(&app, SubscriptionRequest::default().window_owner()).unwrap();
    let second = join(&app, SubscriptionRequest::default().window_owner()).unwrap();

    assert!(first.with_sub(|s| s.is_window_owner()));
    assert!(!second.with_sub(|s| s.is_window_owner()));
    assert_eq!(
        second.with_sub(|s| s.create_window(640, 480, "nope")),
        Err(MultiplexerError::NotWindowOwner { backend: "mock" })
    );

    // An owner suppresses the default window.
    app.dispatch_events().unwrap();
    assert!(stats(|s| s.windows.is_empty()));

    first
        .with_sub(|s| s.create_window(640, 480, "Game"))
        .unwrap();
    assert_eq!(stats(|s| s.windows.clone()), vec![(640, 480, "Game".to_string())]);
}

#[test]
fn test_owner_release_frees_the_claim() {
    reset();
    let app = App::default();
    let owner = join(&app, SubscriptionRequest::default().window_owner()).unwrap();
    let passive = listen_all(&app);

    owner.release();
    assert!(!passive.with_sub(|s| s.is_window_owner()));

    app.dispatch_events().unwrap();
    assert_eq!(
        stats(|s| s.windows.clone()),
        vec![(
            DEFAULT_WINDOW_WIDTH,
            DEFAULT_WINDOW_HEIGHT,
            DEFAULT_WINDOW_TITLE.to_string()
        )]
    );

    let late = join(&app, SubscriptionRequest::default().window_owner()).unwrap();
    assert!(late.with_sub(|s| s.is_window_owner()));
}

#[test]
fn test_owner_can_create_window_before_first_dispatch() {
    reset();
    let app = App::default();
    let owner = join(&app, SubscriptionRequest::default().window_owner()).unwrap();
    assert_eq!(owner.with_sub(|s| s.state()), MultiplexerState::Uninitialized);

    owner
        .with_sub(|s| s.create_window(320, 200, "Early"))
        .unwrap();
    assert_eq!(owner.with_sub(|s| s.state()), MultiplexerState::Active);

    app.dispatch_events().unwrap();
    assert_eq!(stats(|s| (s.connects, s.windows.len())), (1, 1));
}

#[test]
fn test_dispatch_without_multiplexer_is_noop() {
    reset();
    let app = App::default();
    push(Kind::KeyPress);
    assert_eq!(app.dispatch_events(), Ok(0));
    assert_eq!(stats(|s| s.connects), 0);
    assert!(!Multiplexer::<MockBackend>::exists(&app));
}

#[test]
fn test_only_keyboard_sees_key_press() {
    reset();
    let app = App::default();
    let video = join(
        &app,
        SubscriptionRequest::new(EventFilter::only([Kind::Expose])).window_owner(),
    )
    .unwrap();
    let keyboard = listen(&app, &[Kind::KeyPress, Kind::KeyRelease]);

    push(Kind::KeyPress);
    assert_eq!(app.dispatch_events(), Ok(1));
    assert_eq!(keyboard.seen_kinds(), vec![Kind::KeyPress]);
    assert!(video.seen_kinds().is_empty());
}

#[test]
fn test_connection_is_lazy_and_default_window_created_once() {
    reset();
    let app = App::default();
    let sub = listen_all(&app);
    assert_eq!(sub.with_sub(|s| s.state()), MultiplexerState::Uninitialized);
    assert_eq!(stats(|s| s.connects), 0);

    app.dispatch_events().unwrap();
    app.dispatch_events().unwrap();
    assert_eq!(sub.with_sub(|s| s.state()), MultiplexerState::Active);
    assert_eq!(stats(|s| (s.connects, s.windows.len())), (1, 1));
}

#[test]
fn test_connect_failure_is_reported_and_retried() {
    reset();
    let app = App::default();
    let sub = listen_all(&app);
    stats(|s| s.fail_connect = true);

    let err = app.dispatch_events().unwrap_err();
    assert!(matches!(
        err,
        MultiplexerError::Backend(BackendError::ConnectionFailed { backend: "mock", .. })
    ));
    assert_eq!(sub.with_sub(|s| s.state()), MultiplexerState::Uninitialized);

    stats(|s| s.fail_connect = false);
    push(Kind::Motion);
    assert_eq!(app.dispatch_events(), Ok(1));
}

#[test]
fn test_aggregate_mask_pushed_when_changed() {
    reset();
    let app = App::default();
    let a = join(&app, SubscriptionRequest::default().with_mask(0b01)).unwrap();
    let _b = join(&app, SubscriptionRequest::default().with_mask(0b10)).unwrap();
    assert_eq!(a.with_sub(|s| s.aggregate_mask()), 0b11);

    app.dispatch_events().unwrap();
    app.dispatch_events().unwrap();
    assert_eq!(stats(|s| s.masks.clone()), vec![0b11]);

    a.release();
    app.dispatch_events().unwrap();
    assert_eq!(stats(|s| s.masks.clone()), vec![0b11, 0b10]);
}

#[test]
fn test_release_during_dispatch_skips_released_slot() {
    reset();
    let app = App::default();
    let first = listen_all(&app);
    let second = listen_all(&app);

    let victim = Rc::clone(&second);
    first.on_each_event(move || victim.release());

    push(Kind::Motion);
    push(Kind::Motion);
    assert_eq!(app.dispatch_events(), Ok(2));
    assert_eq!(first.seen.borrow().len(), 2);
    assert!(second.seen.borrow().is_empty());
}

#[test]
fn test_self_release_of_last_subscriber_during_dispatch() {
    reset();
    let app = App::default();
    let only = listen_all(&app);
    let this = Rc::downgrade(&only);
    only.on_each_event(move || {
        if let Some(this) = this.upgrade() {
            this.release();
        }
    });

    push(Kind::KeyPress);
    push(Kind::KeyPress);
    assert_eq!(app.dispatch_events(), Ok(1));
    assert_eq!(stats(|s| s.teardowns), 1);
    assert!(!Multiplexer::<MockBackend>::exists(&app));
}

#[test]
fn test_acquire_during_dispatch_waits_for_next_event() {
    reset();
    let app = App::default();
    let first = listen_all(&app);

    let late: Rc<RefCell<Option<Rc<Recorder>>>> = Rc::default();
    let (slot, hook_app) = (Rc::clone(&late), app.clone());
    let joined = Cell::new(false);
    first.on_each_event(move || {
        if !joined.replace(true) {
            *slot.borrow_mut() = Some(listen_all(&hook_app));
        }
    });

    push(Kind::KeyPress);
    assert_eq!(app.dispatch_events(), Ok(1));
    let late = late.borrow_mut().take().unwrap();
    assert!(late.seen.borrow().is_empty());

    push(Kind::KeyRelease);
    app.dispatch_events().unwrap();
    assert_eq!(late.seen_kinds(), vec![Kind::KeyRelease]);
}

#[test]
fn test_event_is_shared_not_copied() {
    reset();
    let app = App::default();
    let a = listen_all(&app);
    let b = listen_all(&app);

    push(Kind::Expose);
    app.dispatch_events().unwrap();
    let seen_a = a.last.borrow().clone().unwrap();
    let seen_b = b.last.borrow().clone().unwrap();
    assert!(Rc::ptr_eq(&seen_a, &seen_b));
}

#[test]
fn test_dropped_handler_is_not_called() {
    reset();
    let app = App::default();
    let gone = Rc::new(Recorder::default());
    let handler = Rc::downgrade(&gone);
    let handler: Weak<dyn EventHandler> = handler;
    let sub = Multiplexer::<MockBackend>::acquire(
        &app,
        SubscriptionRequest::new(EventFilter::All).with_handler(handler),
    )
    .unwrap();
    drop(gone);

    push(Kind::KeyPress);
    assert_eq!(app.dispatch_events(), Ok(0));
    drop(sub);
}

#[test]
fn test_failed_first_acquire_leaves_nothing_behind() {
    let app = App::default();
    let err = Multiplexer::<Closed>::acquire(&app, SubscriptionRequest::default()).unwrap_err();
    assert_eq!(
        err,
        MultiplexerError::ResourceExhausted {
            backend: "closed",
            capacity: 0
        }
    );
    assert!(!Multiplexer::<Closed>::exists(&app));
    assert_eq!(app.active_dispatchers(), 0);
}

#[test]
fn test_foreign_value_in_context_slot_is_rejected() {
    reset();
    let app = App::default();
    app.registry().context("mock").unwrap().set(42u32);

    let err = join(&app, SubscriptionRequest::default()).err().unwrap();
    assert!(matches!(
        err,
        MultiplexerError::Context(ContextError::TypeMismatch { key: "mock", .. })
    ));
    assert_eq!(app.active_dispatchers(), 0);
}

#[test]
fn test_teardown_failure_still_unpublishes() {
    reset();
    let app = App::default();
    let sub = listen_all(&app);
    app.dispatch_events().unwrap();
    stats(|s| s.fail_teardown = true);

    sub.release();
    assert_eq!(stats(|s| s.teardowns), 1);
    assert!(!Multiplexer::<MockBackend>::exists(&app));
    assert_eq!(app.active_dispatchers(), 0);
}

#[test]
fn test_subscriptions_outliving_the_app_still_tear_down() {
    reset();
    let app = App::default();
    let sub = listen_all(&app);
    drop(app);
    sub.release();
    assert_eq!(stats(|s| s.teardowns), 1);
}

#[test]
fn test_ensure_connected_connects_once() {
    reset();
    let app = App::default();
    let sub = listen_all(&app);
    sub.with_sub(|s| s.ensure_connected()).unwrap();
    sub.with_sub(|s| s.ensure_connected()).unwrap();
    app.dispatch_events().unwrap();
    assert_eq!(stats(|s| s.connects), 1);
}
