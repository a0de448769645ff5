/// Events emitted during a simulation step.
/// The presentation layer consumes these for HUD messages.

use crate::domain::grid::{Pos, TileId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PickupCollected { pos: Pos, kind: PickupKind },
    TileUnlocked { id: TileId },
    DialogStarted,
    SentryContact { pos: Pos },
    WardenContact { pos: Pos },
    Descended,
    Victory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickupKind {
    Key,
    Gem,
}

impl PickupKind {
    pub fn noun(self) -> &'static str {
        match self {
            PickupKind::Key => "key",
            PickupKind::Gem => "gem",
        }
    }
}
