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

//! Interfaces the engine consumes but never implements: screen capture,
//! synthetic input, and the clipboard host of the captured display. The
//! embedding application supplies concrete types; XCB/X11, RandR and PAM
//! glue live entirely on the far side of these traits and are out of
//! scope for this crate. Methods are synchronous: the engine calls them
//! from its own tokio tasks and expects them to return promptly (an
//! embedder whose capture/injection calls block on X11 IPC is expected to
//! keep those calls fast, the same assumption libvncserver's callback
//! table makes of its host application).

use crate::clipboard::SelectionKind;
use crate::framebuffer::Framebuffer;
use crate::geometry::Region;

/// A monitor's placement and size, used by `Capture::resize`'s monitor
/// list and by the `ExtendedDesktopSize` pseudo-rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorLayout {
    /// X offset of this monitor's top-left corner.
    pub x: i16,
    /// Y offset of this monitor's top-left corner.
    pub y: i16,
    /// Monitor width in pixels.
    pub width: u16,
    /// Monitor height in pixels.
    pub height: u16,
}

/// Screen capture collaborator: owns the real display connection the
/// engine has no knowledge of.
pub trait Capture: Send + Sync {
    /// Returns a full-resolution snapshot of `region`, in whatever pixel
    /// format the capture side natively produces.
    fn snapshot(&self, region: Region) -> Framebuffer;

    /// Current screen dimensions.
    fn screen_size(&self) -> (u16, u16);

    /// Requests a screen resize to accommodate `monitors`, returning the
    /// realized layout (which may differ from the request if the
    /// collaborator clamped it).
    fn resize(&self, monitors: &[MonitorLayout]) -> crate::error::Result<Vec<MonitorLayout>>;
}

/// Synthetic input collaborator: the engine decides *what* to inject,
/// this trait performs the actual OS call.
pub trait Input: Send + Sync {
    /// Presses or releases `keycode`.
    fn key_press_release(&self, keycode: u32, down: bool);

    /// Moves the pointer and/or updates its button mask.
    fn pointer(&self, x: u16, y: u16, buttons: u8);

    /// Switches the active keyboard layout group.
    fn switch_layout_group(&self, index: u32);

    /// Resolves `keysym` to a keycode under layout group `group`, if that
    /// group's keymap can produce it.
    fn keysym_to_keycode(&self, keysym: u32, group: u32) -> Option<u32>;
}

/// Clipboard host collaborator: the captured display's X selections.
pub trait ClipboardHost: Send + Sync {
    /// Sets `kind`'s selection content, tagged with `cookie` so the
    /// engine can recognize its own echo.
    fn set_selection(&self, kind: SelectionKind, bytes: Vec<u8>, cookie: u64);

    /// Registers a callback the host invokes whenever the captured
    /// display's own selection changes, so the engine can relay it to the
    /// viewer. `cookie` should echo the value from a prior `set_selection`
    /// call when this is just confirming the server's own change, or a
    /// fresh value for a genuine foreign update. A host that never
    /// observes out-of-band selection changes (nothing else on the
    /// display ever sets the selection) can leave this a no-op.
    fn observe_selection(&self, on_change: Box<dyn Fn(SelectionKind, Vec<u8>, u64) + Send + Sync>);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullInput;
    impl Input for NullInput {
        fn key_press_release(&self, _keycode: u32, _down: bool) {}
        fn pointer(&self, _x: u16, _y: u16, _buttons: u8) {}
        fn switch_layout_group(&self, _index: u32) {}
        fn keysym_to_keycode(&self, _keysym: u32, _group: u32) -> Option<u32> {
            None
        }
    }

    #[test]
    fn trait_object_is_usable_behind_a_box() {
        let input: Box<dyn Input> = Box::new(NullInput);
        input.key_press_release(1, true);
        assert_eq!(input.keysym_to_keycode(0x41, 0), None);
    }
}
