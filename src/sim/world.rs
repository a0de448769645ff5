/// WorldState: the complete snapshot of a running game.
///
/// ## Phase machine
///
/// The control flow is an explicit finite state machine. Every phase
/// change goes through `set_phase`, which enforces the transition
/// table below.
///
///   Title      → Playing
///   Playing    → Dialog | ExitPrompt | GameOver | Won | Playing*
///   Dialog     → Playing
///   ExitPrompt → Playing
///   GameOver   → Playing | Title
///   Won        → Title
///
///   *Playing → Playing covers descending into the next level.
///   Quitting is not a phase; the loop just ends.
///
/// ## Camera / Viewport
///
/// World and screen coordinates are separate: the camera is a viewport
/// (top-left corner + size) that follows the hero with a dead zone,
/// and maps smaller than the viewport are centered.

use std::collections::HashMap;

use crate::config::SpeedConfig;
use crate::domain::entity::{Hero, Warden};
use crate::domain::grid::{Labyrinth, Pos, TileId};
use crate::sim::level::{DialogDef, Goal, LevelDef, PickupDef, TileStyle};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    Dialog,
    ExitPrompt,
    GameOver,
    Won,
}

impl Phase {
    /// The transition table: which phases may follow this one.
    pub fn successors(self) -> &'static [Phase] {
        match self {
            Phase::Title => &[Phase::Playing],
            Phase::Playing => &[
                Phase::Dialog,
                Phase::ExitPrompt,
                Phase::GameOver,
                Phase::Won,
                Phase::Playing,
            ],
            Phase::Dialog => &[Phase::Playing],
            Phase::ExitPrompt => &[Phase::Playing],
            Phase::GameOver => &[Phase::Playing, Phase::Title],
            Phase::Won => &[Phase::Title],
        }
    }

    pub fn can_transition_to(self, next: Phase) -> bool {
        self.successors().contains(&next)
    }
}

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world coordinate of the top-left visible cell (can
/// be negative when a small map is centered). `(view_w, view_h)` come
/// from the terminal size and are set during `render()`.
#[derive(Clone, Debug)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Scroll one axis so `target` stays inside the dead zone, or
    /// center the world when it fits the viewport. Returns the new
    /// top-left coordinate for that axis.
    fn scroll_axis(origin: i32, target: usize, world: usize, view: usize, center: bool) -> i32 {
        if view == 0 {
            return origin;
        }
        if world <= view {
            return -((view as i32 - world as i32) / 2);
        }
        let max_origin = world as i32 - view as i32;
        if center {
            return (target as i32 - view as i32 / 2).clamp(0, max_origin);
        }
        // Dead zone: scroll only when the target nears the edge.
        let margin = view as i32 / 5;
        let t = target as i32;
        let mut o = origin;
        if t < o + margin {
            o = t - margin;
        } else if t > o + view as i32 - margin - 1 {
            o = t - view as i32 + margin + 1;
        }
        o.clamp(0, max_origin)
    }

    /// Follow a target with the dead-zone behavior.
    pub fn follow(&mut self, tx: usize, ty: usize, world_w: usize, world_h: usize) {
        self.x = Self::scroll_axis(self.x, tx, world_w, self.view_w, false);
        self.y = Self::scroll_axis(self.y, ty, world_h, self.view_h, false);
    }

    /// Snap directly to center on a position. Used on level entry.
    pub fn center_on(&mut self, tx: usize, ty: usize, world_w: usize, world_h: usize) {
        self.x = Self::scroll_axis(self.x, tx, world_w, self.view_w, true);
        self.y = Self::scroll_axis(self.y, ty, world_h, self.view_h, true);
    }

    /// World → viewport coordinate, None when outside the visible area.
    #[allow(dead_code)]
    pub fn world_to_view(&self, wx: usize, wy: usize) -> Option<(usize, usize)> {
        let vx = wx as i32 - self.x;
        let vy = wy as i32 - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

pub struct WorldState {
    // ── Labyrinth ──
    pub labyrinth: Labyrinth,
    pub tile_styles: HashMap<TileId, TileStyle>,

    // ── Entities ──
    pub hero: Hero,
    pub warden: Option<Warden>,
    pub sentries: Vec<Pos>,

    // ── Level-event table state ──
    pub pickups: Vec<PickupDef>,
    pub pickups_taken: usize,
    pub dialog: Option<DialogDef>,
    pub dialog_seen: bool,
    pub goal: Goal,

    // ── Level sequence ──
    pub levels: Vec<LevelDef>,
    pub current_level: usize,
    pub level_name: String,

    // ── Speed config ──
    pub speed: SpeedConfig,

    // ── Meta ──
    phase: Phase,
    /// Hero moves taken this session (shown on the victory screen).
    pub steps: u64,
    pub anim_tick: u32,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub camera: Camera,
}

impl WorldState {
    pub fn new(levels: Vec<LevelDef>, speed: SpeedConfig) -> Self {
        WorldState {
            labyrinth: Labyrinth::empty(),
            tile_styles: HashMap::new(),
            hero: Hero::new((0, 0)),
            warden: None,
            sentries: vec![],
            pickups: vec![],
            pickups_taken: 0,
            dialog: None,
            dialog_seen: false,
            goal: Goal::Victory,
            levels,
            current_level: 0,
            level_name: String::new(),
            speed,
            phase: Phase::Title,
            steps: 0,
            anim_tick: 0,
            message: String::new(),
            message_timer: 0,
            camera: Camera::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Change phase, enforcing the transition table.
    pub fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase transition {:?} → {:?}",
            self.phase,
            next,
        );
        self.phase = next;
        self.anim_tick = 0;
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// The active (next-to-collect) pickup, if any remain.
    pub fn active_pickup(&self) -> Option<&PickupDef> {
        self.pickups.get(self.pickups_taken)
    }

    /// Is there a sentry holding this cell?
    pub fn sentry_at(&self, pos: Pos) -> bool {
        self.sentries.contains(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_accepts_the_game_flow() {
        // Title → play → dialog → back → pause prompt → back →
        // descend → lose → retry → lose again → title.
        let flow = [
            (Phase::Title, Phase::Playing),
            (Phase::Playing, Phase::Dialog),
            (Phase::Dialog, Phase::Playing),
            (Phase::Playing, Phase::ExitPrompt),
            (Phase::ExitPrompt, Phase::Playing),
            (Phase::Playing, Phase::Playing),
            (Phase::Playing, Phase::GameOver),
            (Phase::GameOver, Phase::Playing),
            (Phase::Playing, Phase::GameOver),
            (Phase::GameOver, Phase::Title),
            (Phase::Playing, Phase::Won),
            (Phase::Won, Phase::Title),
        ];
        for (from, to) in flow {
            assert!(from.can_transition_to(to), "{from:?} → {to:?} should be legal");
        }
    }

    #[test]
    fn transition_table_rejects_shortcuts() {
        let illegal = [
            (Phase::Title, Phase::Won),
            (Phase::Title, Phase::Dialog),
            (Phase::Dialog, Phase::GameOver),
            (Phase::Dialog, Phase::ExitPrompt),
            (Phase::ExitPrompt, Phase::Won),
            (Phase::Won, Phase::Playing),
            (Phase::GameOver, Phase::Won),
        ];
        for (from, to) in illegal {
            assert!(!from.can_transition_to(to), "{from:?} → {to:?} should be illegal");
        }
    }

    #[test]
    fn camera_centers_small_worlds() {
        let mut cam = Camera::new();
        cam.view_w = 20;
        cam.view_h = 10;
        cam.center_on(2, 2, 10, 4);
        assert_eq!(cam.x, -5);
        assert_eq!(cam.y, -3);
        assert_eq!(cam.world_to_view(0, 0), Some((5, 3)));
    }

    #[test]
    fn camera_follow_scrolls_within_bounds() {
        let mut cam = Camera::new();
        cam.view_w = 10;
        cam.view_h = 10;
        cam.center_on(0, 0, 40, 40);
        assert_eq!((cam.x, cam.y), (0, 0));

        // Deep in the middle: dead zone keeps the target inside.
        cam.follow(20, 20, 40, 40);
        assert!(cam.x >= 0 && cam.x <= 30);
        let (vx, _) = cam.world_to_view(20, 20).unwrap();
        assert!(vx >= 2 && vx <= 7);

        // Far corner: clamped to the world edge.
        cam.follow(39, 39, 40, 40);
        assert_eq!((cam.x, cam.y), (30, 30));
    }
}
