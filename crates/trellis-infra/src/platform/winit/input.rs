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

//! Reads `winit` window events as role events.

use trellis_core::input::{InputEvent, MouseButton};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Translates user input. Returns `None` for anything else (resize, focus,
/// key repeats, zero scrolls, unidentified keys).
pub fn translate_input(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::KeyboardInput { event: key, .. } => {
            let PhysicalKey::Code(code) = key.physical_key else {
                return None;
            };
            let key_code = key_name(code);
            match key.state {
                ElementState::Pressed if !key.repeat => Some(InputEvent::key(key_code, true)),
                ElementState::Released => Some(InputEvent::key(key_code, false)),
                ElementState::Pressed => None,
            }
        }
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::MouseMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_button(*button);
            Some(match state {
                ElementState::Pressed => InputEvent::MouseButtonPressed { button },
                ElementState::Released => InputEvent::MouseButtonReleased { button },
            })
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let (delta_x, delta_y) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                MouseScrollDelta::PixelDelta(pos) => (pos.x as f32, pos.y as f32),
            };
            (delta_x != 0.0 || delta_y != 0.0)
                .then_some(InputEvent::MouseWheelScrolled { delta_x, delta_y })
        }
        _ => None,
    }
}

/// Key names follow `winit`'s `KeyCode` variants (`"KeyA"`, `"SuperLeft"`...).
fn key_name(code: KeyCode) -> String {
    format!("{code:?}")
}

fn map_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}
