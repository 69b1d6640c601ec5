//! Pointer drag panning as an explicit state machine
//!
//! ```text
//!            press (listen Move + Release)
//!   Idle ─────────────────────────────────► Dragging { origin, start_offset }
//!    ▲                                          │
//!    └──────────────────────────────────────────┘
//!        release / teardown (unlisten both)
//! ```
//!
//! While dragging, move and release events are taken from a surface wider
//! than the map itself, so the pointer may leave the map mid-drag. Both
//! listeners are removed on every path back to `Idle`; a controller dropped
//! mid-drag reports the leak.

use egui::{Pos2, Vec2};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Events a drag subscribes to on the pointer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerEventKind {
    Move,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Where pointer listeners are registered.
pub trait PointerSurface {
    fn listen(&mut self, kind: PointerEventKind) -> ListenerId;
    /// Returns false if the listener was not registered.
    fn unlisten(&mut self, id: ListenerId) -> bool;
}

/// In-process listener table; the map widget polls it each frame.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    active: BTreeMap<ListenerId, PointerEventKind>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_listening(&self, kind: PointerEventKind) -> bool {
        self.active.values().any(|k| *k == kind)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl PointerSurface for ListenerRegistry {
    fn listen(&mut self, kind: PointerEventKind) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.active.insert(id, kind);
        id
    }

    fn unlisten(&mut self, id: ListenerId) -> bool {
        self.active.remove(&id).is_some()
    }
}

// =============================================================================
// DRAG STATE MACHINE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Pointer position at press.
        origin: Pos2,
        /// View offset at press.
        start_offset: Vec2,
        on_move: ListenerId,
        on_release: ListenerId,
    },
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// `Idle → Dragging`. A press while already dragging is ignored.
    pub fn press(&mut self, surface: &mut dyn PointerSurface, pointer: Pos2, offset: Vec2) -> bool {
        if self.is_dragging() {
            return false;
        }
        let on_move = surface.listen(PointerEventKind::Move);
        let on_release = surface.listen(PointerEventKind::Release);
        self.state = DragState::Dragging {
            origin: pointer,
            start_offset: offset,
            on_move,
            on_release,
        };
        debug!(x = pointer.x, y = pointer.y, "drag started");
        true
    }

    /// Offset the view should take for the current pointer position.
    pub fn pointer_moved(&self, pointer: Pos2) -> Option<Vec2> {
        match self.state {
            DragState::Dragging {
                origin,
                start_offset,
                ..
            } => Some(start_offset + (pointer - origin)),
            DragState::Idle => None,
        }
    }

    /// `Dragging → Idle`, removing both listeners. Returns whether a drag ended.
    pub fn release(&mut self, surface: &mut dyn PointerSurface) -> bool {
        let DragState::Dragging {
            on_move,
            on_release,
            ..
        } = std::mem::take(&mut self.state)
        else {
            return false;
        };
        let removed_move = surface.unlisten(on_move);
        let removed_release = surface.unlisten(on_release);
        if !(removed_move && removed_release) {
            error!(
                removed_move,
                removed_release, "drag listeners were already gone at release"
            );
        }
        debug!("drag ended");
        true
    }

    /// Release any drag in progress; for widget shutdown.
    pub fn teardown(&mut self, surface: &mut dyn PointerSurface) {
        if self.release(surface) {
            debug!("drag cancelled by teardown");
        }
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        if self.is_dragging() {
            error!("drag controller dropped mid-drag, pointer listeners leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn press_registers_and_release_removes_listeners() {
        let mut surface = ListenerRegistry::new();
        let mut drag = DragController::new();

        assert!(drag.press(&mut surface, Pos2::new(10.0, 10.0), Vec2::ZERO));
        assert!(surface.is_listening(PointerEventKind::Move));
        assert!(surface.is_listening(PointerEventKind::Release));
        assert_eq!(surface.active_count(), 2);

        assert!(drag.release(&mut surface));
        assert_eq!(surface.active_count(), 0);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn move_offsets_from_press_origin() {
        let mut surface = ListenerRegistry::new();
        let mut drag = DragController::new();
        assert_eq!(drag.pointer_moved(Pos2::new(5.0, 5.0)), None);

        drag.press(&mut surface, Pos2::new(100.0, 50.0), Vec2::new(20.0, -10.0));
        assert_eq!(
            drag.pointer_moved(Pos2::new(130.0, 40.0)),
            Some(Vec2::new(50.0, -20.0))
        );
        // outside any map bounds still tracks
        assert_eq!(
            drag.pointer_moved(Pos2::new(-500.0, 50.0)),
            Some(Vec2::new(-580.0, -10.0))
        );
        drag.teardown(&mut surface);
    }

    #[test]
    fn second_press_does_not_stack_listeners() {
        let mut surface = ListenerRegistry::new();
        let mut drag = DragController::new();
        drag.press(&mut surface, Pos2::ZERO, Vec2::ZERO);
        assert!(!drag.press(&mut surface, Pos2::new(1.0, 1.0), Vec2::ZERO));
        assert_eq!(surface.active_count(), 2);
        drag.release(&mut surface);
        assert_eq!(surface.active_count(), 0);
    }

    #[test]
    fn release_when_idle_is_harmless() {
        let mut surface = ListenerRegistry::new();
        let mut drag = DragController::new();
        assert!(!drag.release(&mut surface));
        drag.teardown(&mut surface);
        assert_eq!(surface.active_count(), 0);
    }

    #[test]
    fn teardown_mid_drag_cleans_up() {
        let mut surface = ListenerRegistry::new();
        {
            let mut drag = DragController::new();
            drag.press(&mut surface, Pos2::ZERO, Vec2::ZERO);
            drag.teardown(&mut surface);
            assert!(!drag.is_dragging());
        }
        assert_eq!(surface.active_count(), 0);
    }
}
