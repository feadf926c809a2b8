//! Keyboard bindings and display toggles

use crate::camera::Movement;
use penumbra::PipelineVariant;
use winit::keyboard::KeyCode;

/// Held keys that move the free camera
pub const MOVEMENT_KEYS: [(KeyCode, Movement); 6] = [
    (KeyCode::KeyW, Movement::Forward),
    (KeyCode::KeyS, Movement::Backward),
    (KeyCode::KeyA, Movement::Left),
    (KeyCode::KeyD, Movement::Right),
    (KeyCode::KeyQ, Movement::Up),
    (KeyCode::KeyE, Movement::Down),
];

/// State flipped by one-shot key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub variant: PipelineVariant,
    pub plain_model: bool,
    pub camera_free: bool,
    pub show_status: bool,
}

impl Default for Toggles {
    /// Free camera, textured model, status shown
    fn default() -> Self {
        Self {
            variant: PipelineVariant::Plain,
            plain_model: false,
            camera_free: true,
            show_status: true,
        }
    }
}

impl Toggles {
    /// Apply a pressed key; false when the key is not a toggle
    pub fn apply(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Digit1 => self.variant = PipelineVariant::Plain,
            KeyCode::Digit2 => self.variant = PipelineVariant::Ssao,
            KeyCode::Digit3 => self.variant = PipelineVariant::Ssdo,
            KeyCode::Digit4 => self.variant = PipelineVariant::Combined,
            KeyCode::KeyK => self.plain_model = true,
            KeyCode::KeyL => self.plain_model = false,
            KeyCode::KeyU => self.camera_free = true,
            KeyCode::KeyI => self.camera_free = false,
            KeyCode::KeyO => self.show_status = true,
            KeyCode::KeyP => self.show_status = false,
            _ => return false,
        }
        true
    }
}

pub fn movement_for(key: KeyCode) -> Option<Movement> {
    MOVEMENT_KEYS.iter().find(|(k, _)| *k == key).map(|(_, m)| *m)
}
