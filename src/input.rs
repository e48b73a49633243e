// Copyright 2025 Dustin McAfee
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

//! Input injector: owns pressed-keycode tracking and layout-group
//! switching, delegating the actual keysym lookup and synthetic-input
//! call to the `Input` collaborator. The teacher forwards raw
//! keysym/button events straight to the embedding application
//! (`ClientEvent::KeyPress`/`PointerMove` in `client.rs`) and does no
//! keycode mapping itself; this module is the engine's own share of that
//! work, kept here so XCB/X11 stays out of this crate.

use crate::collaborators::Input;
use log::debug;
use std::collections::HashMap;

const MAX_GROUPS: u32 = 4;

/// Tracks currently-pressed keys and the active keyboard layout group,
/// delegating keycode resolution and injection to an `Input`
/// collaborator.
pub struct InputInjector {
    collaborator: Box<dyn Input>,
    active_group: u32,
    pressed: HashMap<u32, u32>,
    last_pointer: (u16, u16, u8),
}

impl InputInjector {
    /// Creates an injector delegating to `collaborator`, starting in
    /// layout group 0.
    #[must_use]
    pub fn new(collaborator: Box<dyn Input>) -> Self {
        Self { collaborator, active_group: 0, pressed: HashMap::new(), last_pointer: (0, 0, 0) }
    }

    /// Handles one `KeyEvent`. On press, resolves `keysym` in the active
    /// group; if not reachable there, tries the other groups in order and
    /// switches to the first one that can produce it. On release, looks
    /// up the keycode this session last pressed for `keysym` (so a group
    /// switch between press and release still releases the right key).
    pub fn key_event(&mut self, down: bool, keysym: u32) {
        if down {
            let Some((group, keycode)) = self.resolve_keysym(keysym) else {
                debug!("keysym {keysym:#x} not reachable in any layout group");
                return;
            };
            if group != self.active_group {
                self.collaborator.switch_layout_group(group);
                self.active_group = group;
            }
            self.collaborator.key_press_release(keycode, true);
            self.pressed.insert(keysym, keycode);
        } else if let Some(keycode) = self.pressed.remove(&keysym) {
            self.collaborator.key_press_release(keycode, false);
        }
    }

    /// Handles one `PointerEvent`, always emitting motion even when the
    /// button mask is unchanged (per spec, wheel events reuse buttons
    /// 4-7 and must not be swallowed as "no change").
    pub fn pointer_event(&mut self, x: u16, y: u16, buttons: u8) {
        self.collaborator.pointer(x, y, buttons);
        self.last_pointer = (x, y, buttons);
    }

    /// Releases every currently-pressed key. Call on session disconnect
    /// to leave the display in a clean state.
    pub fn release_all(&mut self) {
        for (_, keycode) in self.pressed.drain() {
            self.collaborator.key_press_release(keycode, false);
        }
    }

    /// Keycodes currently held down, for tests and diagnostics.
    #[must_use]
    pub fn pressed_keycodes(&self) -> Vec<u32> {
        self.pressed.values().copied().collect()
    }

    fn resolve_keysym(&self, keysym: u32) -> Option<(u32, u32)> {
        if let Some(kc) = self.collaborator.keysym_to_keycode(keysym, self.active_group) {
            return Some((self.active_group, kc));
        }
        for group in 0..MAX_GROUPS {
            if group == self.active_group {
                continue;
            }
            if let Some(kc) = self.collaborator.keysym_to_keycode(keysym, group) {
                return Some((group, kc));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeInput {
        groups: Vec<HashMap<u32, u32>>,
        switched_to: RefCell<Vec<u32>>,
        events: RefCell<Vec<(u32, bool)>>,
    }

    impl Input for FakeInput {
        fn key_press_release(&self, keycode: u32, down: bool) {
            self.events.borrow_mut().push((keycode, down));
        }
        fn pointer(&self, _x: u16, _y: u16, _buttons: u8) {}
        fn switch_layout_group(&self, index: u32) {
            self.switched_to.borrow_mut().push(index);
        }
        fn keysym_to_keycode(&self, keysym: u32, group: u32) -> Option<u32> {
            self.groups.get(group as usize)?.get(&keysym).copied()
        }
    }

    #[test]
    fn press_and_release_in_current_group_needs_no_switch() {
        let mut us = HashMap::new();
        us.insert(0x61, 38);
        let fake = FakeInput { groups: vec![us], switched_to: RefCell::new(Vec::new()), events: RefCell::new(Vec::new()) };
        let mut injector = InputInjector::new(Box::new(fake));
        injector.key_event(true, 0x61);
        assert_eq!(injector.pressed_keycodes(), vec![38]);
        injector.key_event(false, 0x61);
        assert!(injector.pressed_keycodes().is_empty());
    }

    #[test]
    fn press_in_other_group_switches_then_presses() {
        let mut group0 = HashMap::new();
        group0.insert(0x61, 38);
        let mut group1 = HashMap::new();
        group1.insert(0x6E6, 53);
        let fake = FakeInput { groups: vec![group0, group1], switched_to: RefCell::new(Vec::new()), events: RefCell::new(Vec::new()) };
        let mut injector = InputInjector::new(Box::new(fake));
        injector.key_event(true, 0x6E6);
        assert_eq!(injector.pressed_keycodes(), vec![53]);
        assert_eq!(injector.active_group, 1);
    }

    #[test]
    fn release_all_clears_every_pressed_key() {
        let mut us = HashMap::new();
        us.insert(0x61, 38);
        us.insert(0x62, 39);
        let fake = FakeInput { groups: vec![us], switched_to: RefCell::new(Vec::new()), events: RefCell::new(Vec::new()) };
        let mut injector = InputInjector::new(Box::new(fake));
        injector.key_event(true, 0x61);
        injector.key_event(true, 0x62);
        injector.release_all();
        assert!(injector.pressed_keycodes().is_empty());
    }

    #[test]
    fn unreachable_keysym_is_a_no_op() {
        let fake = FakeInput { groups: vec![HashMap::new()], switched_to: RefCell::new(Vec::new()), events: RefCell::new(Vec::new()) };
        let mut injector = InputInjector::new(Box::new(fake));
        injector.key_event(true, 0x61);
        assert!(injector.pressed_keycodes().is_empty());
    }
}
