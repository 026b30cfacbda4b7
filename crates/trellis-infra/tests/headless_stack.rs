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

use trellis_core::config::SelectionOverride;
use trellis_core::multiplexer::SubscriptionRequest;
use trellis_core::platform::select_environment;
use trellis_core::{
    App, Capacities, EventBus, InputEvent, ModifierState, ModuleRegistry, Multiplexer,
    RoleCandidates, Subscription,
};
use trellis_infra::platform::headless::{feed, HeadlessWindow};
use trellis_infra::{EnvProbeModule, HeadlessBackend, HeadlessEventKind, PlatformEvent};

fn app() -> App {
    App::with_registry(ModuleRegistry::from_inventory(Capacities::default()))
}

fn key(code: &str) -> PlatformEvent {
    PlatformEvent::Input(InputEvent::key(code, true))
}

/// A callback-less member of the headless multiplexer, used to look at the backend.
fn observer(app: &App) -> Subscription<HeadlessBackend> {
    Multiplexer::<HeadlessBackend>::acquire(app, SubscriptionRequest::default()).unwrap()
}

const META: ModifierState = ModifierState {
    shift: false,
    control: false,
    alt: false,
    meta: true,
};

#[test]
fn test_inventory_contains_every_module() {
    let registry = ModuleRegistry::from_inventory(Capacities::default());
    let ids = registry.ids();
    for id in [
        "envprobe",
        "video_winit",
        "keyboard_winit",
        "mouse_winit",
        "video_headless",
        "keyboard_headless",
        "mouse_headless",
        "mouse_virtual",
    ] {
        assert!(ids.contains(&id), "missing module '{id}'");
    }
}

#[test]
fn test_envprobe_is_probed_like_any_module() {
    let app = app();
    let probe = app.probe(&["envprobe"]).expect("envprobe should always probe");
    let candidates = probe.borrow_mut().as_env_probe().unwrap().candidates();
    assert_eq!(candidates.video.last().map(String::as_str), Some("video_headless"));
}

#[test]
fn test_headless_stack_routes_input_to_each_role() {
    // --- 1. ARRANGE ---
    let app = app();
    let candidates = EnvProbeModule::candidates_for(false);
    let env = select_environment(&app, &candidates);
    let video = env.require_video(&candidates).unwrap();
    let keyboard = env.keyboard.clone().unwrap();
    let mouse = env.mouse.clone().unwrap();
    assert!(Multiplexer::<HeadlessBackend>::exists(&app));

    let bus = EventBus::<InputEvent>::new();
    keyboard.borrow_mut().as_keyboard().unwrap().set_sink(bus.sender());
    mouse.borrow_mut().as_mouse().unwrap().set_sink(bus.sender());
    video
        .borrow_mut()
        .as_video()
        .unwrap()
        .open_window(320, 240, "Headless")
        .unwrap();
    mouse.borrow_mut().as_mouse().unwrap().set_bounds(320, 240);

    // --- 2. ACT ---
    let sender = feed();
    for event in [
        key("SuperLeft"),
        key("KeyQ"),
        PlatformEvent::Input(InputEvent::MouseMoved { x: 500.0, y: -3.0 }),
        PlatformEvent::CloseRequested,
    ] {
        sender.send(event).unwrap();
    }
    let delivered = app.dispatch_events().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(delivered, 4);
    assert_eq!(
        bus.drain(),
        vec![
            InputEvent::key("SuperLeft", true).with_modifiers(META),
            InputEvent::key("KeyQ", true).with_modifiers(META),
            InputEvent::MouseMoved { x: 320.0, y: 0.0 },
        ]
    );
    assert!(keyboard.borrow_mut().as_keyboard().unwrap().modifier_state().meta);
    assert_eq!(mouse.borrow_mut().as_mouse().unwrap().position(), (320.0, 0.0));

    let mut video = video.borrow_mut();
    let video = video.as_video().unwrap();
    assert!(video.close_requested());
    assert_eq!(video.screen_size(), (320, 240));
    assert!(video.window_handle().is_none());

    let observer = observer(&app);
    let expected_mask = [
        HeadlessEventKind::Key,
        HeadlessEventKind::Mouse,
        HeadlessEventKind::Resized,
        HeadlessEventKind::CloseRequested,
    ]
    .iter()
    .fold(0, |acc, kind| acc | kind.mask());
    observer.with_backend(|backend| {
        assert_eq!(backend.selected_mask(), expected_mask);
        assert_eq!(
            backend.window(),
            Some(&HeadlessWindow {
                width: 320,
                height: 240,
                title: "Headless".to_string()
            })
        );
    });
}

#[test]
fn test_key_events_carry_modifiers_of_their_own_moment() {
    let app = app();
    let keyboard = app.probe(&["keyboard_headless"]).unwrap();
    let bus = EventBus::<InputEvent>::new();
    keyboard.borrow_mut().as_keyboard().unwrap().set_sink(bus.sender());

    let sender = feed();
    for (code, pressed) in [("SuperLeft", true), ("KeyQ", true), ("SuperLeft", false), ("KeyW", true)] {
        sender.send(PlatformEvent::Input(InputEvent::key(code, pressed))).unwrap();
    }
    app.dispatch_events().unwrap();

    let none = ModifierState::default();
    assert_eq!(
        bus.drain(),
        vec![
            InputEvent::key("SuperLeft", true).with_modifiers(META),
            InputEvent::key("KeyQ", true).with_modifiers(META),
            InputEvent::key("SuperLeft", false).with_modifiers(none),
            InputEvent::key("KeyW", true).with_modifiers(none),
        ]
    );
}

#[test]
fn test_mouse_meta_key_toggles_grab() {
    let app = app();
    let mouse = app.probe(&["mouse_headless"]).unwrap();
    let observer = observer(&app);
    let grabbed = || observer.with_backend(HeadlessBackend::is_grabbed);
    let mut mouse = mouse.borrow_mut();

    assert!(!mouse.handle_meta("KeyM", true), "press is not consumed");
    assert!(!grabbed());
    assert!(mouse.handle_meta("KeyM", false));
    assert!(grabbed());
    assert!(!mouse.handle_meta("KeyK", false));
    assert!(grabbed());

    assert!(mouse.handle_meta("KeyM", false));
    assert!(!grabbed());

    mouse.handle_meta("KeyM", false);
    mouse.cleanup();
    assert!(!grabbed(), "cleanup releases the grab");
}

#[test]
fn test_override_can_leave_roles_unserved() {
    let app = app();
    let selection: SelectionOverride = "video_headless,,".parse().unwrap();
    let candidates: RoleCandidates = selection.into_candidates();
    let env = select_environment(&app, &candidates);
    assert!(env.video.is_some());
    assert!(env.keyboard.is_none());
    assert!(env.mouse.is_none());
}

#[test]
fn test_cleanup_tears_the_backend_down() {
    let app = app();
    let candidates = EnvProbeModule::candidates_for(false);
    let env = select_environment(&app, &candidates);
    assert_eq!(app.active_dispatchers(), 1);

    for module in env.cleanup_order() {
        module.borrow_mut().cleanup();
    }
    assert!(!Multiplexer::<HeadlessBackend>::exists(&app));
    assert_eq!(app.active_dispatchers(), 0);

    // Probing again after cleanup builds a fresh multiplexer.
    let env = select_environment(&app, &candidates);
    assert!(env.keyboard.is_some());
    assert!(Multiplexer::<HeadlessBackend>::exists(&app));
}
