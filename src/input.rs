use egui::{Key, KeyboardShortcut, Modifiers, PointerButton, Pos2, Rect, Vec2};

use crate::event::CanvasEvent;

/// A raw pointer happening, in screen coordinates. Mouse and touch both
/// arrive here; egui already folds the first touch into pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Pressed(Pos2),
    Moved(Pos2),
    Released(Pos2),
    /// Pointer left the window or the touch ended
    Gone,
}

pub const UNDO_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Z);
pub const REDO_SHORTCUT: KeyboardShortcut =
    KeyboardShortcut::new(Modifiers::COMMAND.plus(Modifiers::SHIFT), Key::Z);
pub const REDO_SHORTCUT_ALT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Y);

/// Map a screen position into canvas pixels.
///
/// `canvas_rect` is where the surface is shown on screen and `surface_size`
/// its size in pixels; the two differ when the canvas is displayed scaled.
pub fn to_canvas_local(pos: Pos2, canvas_rect: Rect, surface_size: Vec2) -> Pos2 {
    let offset = pos - canvas_rect.min;
    let shown = canvas_rect.size();
    let scale = Vec2::new(
        if shown.x > 0.0 { surface_size.x / shown.x } else { 1.0 },
        if shown.y > 0.0 { surface_size.y / shown.y } else { 1.0 },
    );
    (offset * scale).to_pos2()
}

/// Turns pointer input over the canvas into gesture events.
///
/// A gesture starts on a press inside the canvas and ends on release, when
/// the pointer leaves the canvas, or when it disappears.
#[derive(Debug, Clone)]
pub struct InputHandler {
    canvas_rect: Rect,
    surface_size: Vec2,
    gesture_active: bool,
    last_pointer_pos: Option<Pos2>,
}

impl InputHandler {
    pub fn new(canvas_rect: Rect, surface_size: Vec2) -> Self {
        Self {
            canvas_rect,
            surface_size,
            gesture_active: false,
            last_pointer_pos: None,
        }
    }

    /// Update the canvas rectangle (e.g. if window is resized)
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    fn local(&self, pos: Pos2) -> Pos2 {
        to_canvas_local(pos, self.canvas_rect, self.surface_size)
    }

    /// Feed one pointer input, getting back the gesture event it causes.
    pub fn feed(&mut self, input: PointerInput) -> Option<CanvasEvent> {
        match input {
            PointerInput::Pressed(pos) => {
                if self.gesture_active || !self.canvas_rect.contains(pos) {
                    return None;
                }
                self.gesture_active = true;
                self.last_pointer_pos = Some(pos);
                Some(CanvasEvent::GestureStart(self.local(pos)))
            }
            PointerInput::Moved(pos) => {
                if !self.gesture_active || self.last_pointer_pos == Some(pos) {
                    return None;
                }
                if !self.canvas_rect.contains(pos) {
                    return self.end_gesture();
                }
                self.last_pointer_pos = Some(pos);
                Some(CanvasEvent::GestureMove(self.local(pos)))
            }
            PointerInput::Released(_) | PointerInput::Gone => self.end_gesture(),
        }
    }

    fn end_gesture(&mut self) -> Option<CanvasEvent> {
        if !self.gesture_active {
            return None;
        }
        self.gesture_active = false;
        self.last_pointer_pos = None;
        Some(CanvasEvent::GestureEnd)
    }

    /// Process this frame's raw egui input into canvas events
    pub fn process_input(&mut self, ctx: &egui::Context) -> Vec<CanvasEvent> {
        let pointer_inputs: Vec<PointerInput> = ctx.input(|input| {
            input
                .raw
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::PointerButton {
                        pos,
                        button: PointerButton::Primary,
                        pressed,
                        ..
                    } => Some(if *pressed {
                        PointerInput::Pressed(*pos)
                    } else {
                        PointerInput::Released(*pos)
                    }),
                    egui::Event::PointerMoved(pos) => Some(PointerInput::Moved(*pos)),
                    egui::Event::PointerGone => Some(PointerInput::Gone),
                    _ => None,
                })
                .collect()
        });

        let mut events: Vec<CanvasEvent> = pointer_inputs
            .into_iter()
            .filter_map(|input| self.feed(input))
            .collect();

        // Check the shifted redo first; the plain undo shortcut would match it too.
        ctx.input_mut(|input| {
            if input.consume_shortcut(&REDO_SHORTCUT) || input.consume_shortcut(&REDO_SHORTCUT_ALT) {
                events.push(CanvasEvent::Redo);
            } else if input.consume_shortcut(&UNDO_SHORTCUT) {
                events.push(CanvasEvent::Undo);
            }
        });

        events
    }
}
