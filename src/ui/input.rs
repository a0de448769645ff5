/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a direction key is held
///   - Edge-triggered menu/phase actions (only fire on a fresh press)
///
/// Terminals that do not report Release events get a timeout-based
/// fallback: a key counts as held until it goes quiet for a moment.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEventKind, KeyModifiers};

/// After this long without a Press/Repeat event, the key is considered
/// released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of the last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the most recent
    /// `drain_events` call.
    fresh_presses: Vec<KeyCode>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Release {
                    self.last_active.remove(&key.code);
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
                {
                    self.ctrl_c = true;
                }
                let was_held = self.held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }

        // Expire keys that timed out (terminals without Release events).
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Is any of these keys currently held? (continuous actions)
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.held(*c))
    }

    /// Was any of these keys freshly pressed this frame? (edge trigger)
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Was anything at all freshly pressed this frame?
    pub fn anything_pressed(&self) -> bool {
        !self.fresh_presses.is_empty()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }
}
