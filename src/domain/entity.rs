/// Entities: the hero and the dungeon warden.

use super::grid::Pos;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Movement direction (continuous while key held).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Input for one simulation tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
}

#[derive(Clone, Debug)]
pub struct Hero {
    pub x: usize,
    pub y: usize,
    pub facing: Facing,
    pub move_cooldown: u32,
}

impl Hero {
    pub fn new((x, y): Pos) -> Self {
        Hero { x, y, facing: Facing::Right, move_cooldown: 0 }
    }

    pub fn pos(&self) -> Pos {
        (self.x, self.y)
    }

    pub fn set_pos(&mut self, (x, y): Pos) {
        self.x = x;
        self.y = y;
    }
}

/// The roaming chaser. Takes one shortest-path step toward the hero
/// each time its cooldown elapses; touching the hero ends the run.
#[derive(Clone, Debug)]
pub struct Warden {
    pub x: usize,
    pub y: usize,
    pub facing: Facing,
    pub move_cooldown: u32,
    pub spawn: Pos,
}

impl Warden {
    pub fn new((x, y): Pos) -> Self {
        Warden { x, y, facing: Facing::Left, move_cooldown: 0, spawn: (x, y) }
    }

    pub fn pos(&self) -> Pos {
        (self.x, self.y)
    }
}
