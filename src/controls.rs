//! Input state, independent of the windowing library.
//!
//! The window layer translates its events into an [`InputState`] once per frame; the
//! [`FrameRenderer`](crate::render::frame::FrameRenderer) turns that into camera movement and
//! [`Requests`] for the window layer.

use fxhash::FxHashSet;
use glam::Vec2;

use crate::render::camera::Movement;

/// A discrete command triggered by a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Lock or release the cursor.
    ToggleCursor,
    /// Switch between filled and wireframe polygons.
    ToggleWireframe,
    /// Rebuild the shader programs from their source files.
    ReloadShaders,
    Quit,
}

/// The input gathered during one frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Movement keys currently held down.
    pub held: FxHashSet<Movement>,
    /// Actions triggered this frame, in order.
    pub actions: Vec<Action>,
    /// Mouse movement this frame. Positive `y` is up.
    pub mouse_delta: Vec2,
    /// Vertical scroll this frame.
    pub scroll_delta: f32,
}

impl InputState {
    /// Forgets everything that only lasts one frame. Held keys stay held.
    pub fn begin_frame(&mut self) {
        self.actions.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn press(&mut self, movement: Movement) {
        self.held.insert(movement);
    }

    pub fn release(&mut self, movement: Movement) {
        self.held.remove(&movement);
    }

    pub fn trigger(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Accumulates a mouse offset. Positive `dy` is up.
    pub fn mouse_moved(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    pub fn scrolled(&mut self, dy: f32) {
        self.scroll_delta += dy;
    }

    pub fn is_held(&self, movement: Movement) -> bool {
        self.held.contains(&movement)
    }

    /// Returns how many times `action` was triggered this frame.
    pub fn count(&self, action: Action) -> usize {
        self.actions.iter().filter(|a| **a == action).count()
    }
}

/// Things the window layer has to do after a frame's input was processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Requests {
    pub quit: bool,
    /// New cursor lock state, if it changed.
    pub cursor_locked: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_keeps_held_keys() {
        let mut input = InputState::default();
        input.press(Movement::Forward);
        input.trigger(Action::ToggleWireframe);
        input.mouse_moved(3.0, -1.0);
        input.mouse_moved(1.0, 0.5);
        input.scrolled(1.0);

        assert_eq!(input.mouse_delta, Vec2::new(4.0, -0.5));
        assert_eq!(input.count(Action::ToggleWireframe), 1);

        input.begin_frame();
        assert!(input.is_held(Movement::Forward));
        assert!(input.actions.is_empty());
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        assert_eq!(input.scroll_delta, 0.0);

        input.release(Movement::Forward);
        assert!(!input.is_held(Movement::Forward));
    }
}
