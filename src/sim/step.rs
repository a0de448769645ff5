/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Hero movement (bounds + free-tile check)
///   2. Level-event triggers (pickup, dialog, sentry)
///   3. Warden chase (one BFS step toward the hero)
///   4. Goal check (finish tile → descend or victory)
///
/// Everything runs to completion inside one call; a trigger that
/// leaves the Playing phase stops the rest of the pipeline.

use crate::domain::entity::{Facing, FrameInput, MoveDir};
use crate::domain::path;
use crate::sim::level::{enter_level, Goal};
use super::event::{GameEvent, PickupKind};
use super::world::{Phase, WorldState};

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    if world.phase() != Phase::Playing {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.anim_tick = world.anim_tick.wrapping_add(1);

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 {
            world.message.clear();
        }
    }

    let moved = resolve_hero_movement(world, input.movement);
    if moved {
        resolve_triggers(world, &mut events);
    }
    if world.phase() != Phase::Playing {
        return events;
    }

    resolve_warden(world, &mut events);
    if world.phase() != Phase::Playing {
        return events;
    }

    resolve_goal(world, &mut events);
    events
}

// ══════════════════════════════════════════════════════════════
// Hero movement
// ══════════════════════════════════════════════════════════════

fn resolve_hero_movement(world: &mut WorldState, movement: Option<MoveDir>) -> bool {
    if world.hero.move_cooldown > 0 {
        world.hero.move_cooldown -= 1;
        return false;
    }

    let dir = match movement {
        Some(d) => d,
        None => return false,
    };

    let (dx, dy) = dir.delta();
    let nx = world.hero.x as i32 + dx;
    let ny = world.hero.y as i32 + dy;
    // Bounds first: is_free on an out-of-bounds cell is a contract
    // violation, not a blocked move.
    if nx < 0 || ny < 0 {
        return false;
    }
    let next = (nx as usize, ny as usize);
    if !world.labyrinth.in_bounds(next) || !world.labyrinth.is_free(next) {
        return false;
    }

    world.hero.set_pos(next);
    if dx < 0 {
        world.hero.facing = Facing::Left;
    }
    if dx > 0 {
        world.hero.facing = Facing::Right;
    }
    world.hero.move_cooldown = world.speed.hero_move_rate;
    world.steps += 1;
    true
}

// ══════════════════════════════════════════════════════════════
// Level-event triggers
// ══════════════════════════════════════════════════════════════

fn resolve_triggers(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let pos = world.hero.pos();

    // Sentries first: stepping onto a held cell ends the run even if
    // something else sits there.
    if world.sentry_at(pos) {
        events.push(GameEvent::SentryContact { pos });
        lose(world, "A warden caught you!");
        return;
    }

    if let Some(p) = world.active_pickup() {
        if p.pos == pos {
            let kind = p.kind;
            let unlock = p.unlock;
            world.pickups_taken += 1;
            events.push(GameEvent::PickupCollected { pos, kind });

            if let Some(id) = unlock {
                world.labyrinth.add_free_tile(id);
                events.push(GameEvent::TileUnlocked { id });
                world.set_message(unlock_message(kind), 60);
            } else {
                world.set_message(
                    &format!(
                        "Picked up a {} ({}/{})",
                        kind.noun(),
                        world.pickups_taken,
                        world.pickups.len()
                    ),
                    40,
                );
            }
        }
    }

    if let Some(d) = &world.dialog {
        if !world.dialog_seen && d.pos == pos {
            world.dialog_seen = true;
            events.push(GameEvent::DialogStarted);
            world.set_phase(Phase::Dialog);
        }
    }
}

fn unlock_message(kind: PickupKind) -> &'static str {
    match kind {
        PickupKind::Key => "The vine door creaks open!",
        PickupKind::Gem => "The gate rumbles aside!",
    }
}

// ══════════════════════════════════════════════════════════════
// Warden chase
// ══════════════════════════════════════════════════════════════

/// Beyond this many steps the warden loses interest and walks home.
const CHASE_RADIUS: u32 = 12;

fn resolve_warden(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let hero_pos = world.hero.pos();

    let Some(warden) = world.warden.as_mut() else { return };

    // The hero may have walked into the warden.
    if warden.pos() == hero_pos {
        let pos = hero_pos;
        events.push(GameEvent::WardenContact { pos });
        lose(world, "The warden caught you!");
        return;
    }

    if warden.move_cooldown > 0 {
        warden.move_cooldown -= 1;
        return;
    }

    let from = warden.pos();
    let home = warden.spawn;
    let target = match path::distance_to(&world.labyrinth, from, hero_pos) {
        Some(d) if d <= CHASE_RADIUS => hero_pos,
        // Too far or cut off: drift back to the spawn post.
        _ => home,
    };
    let hop = path::next_step(&world.labyrinth, from, target);
    if hop == from {
        return;
    }

    let warden = world.warden.as_mut().unwrap();
    if hop.0 < from.0 {
        warden.facing = Facing::Left;
    }
    if hop.0 > from.0 {
        warden.facing = Facing::Right;
    }
    warden.x = hop.0;
    warden.y = hop.1;
    warden.move_cooldown = world.speed.warden_move_rate;

    if hop == hero_pos {
        events.push(GameEvent::WardenContact { pos: hop });
        lose(world, "The warden caught you!");
    }
}

// ══════════════════════════════════════════════════════════════
// Goal
// ══════════════════════════════════════════════════════════════

fn resolve_goal(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.labyrinth.is_finish(world.hero.pos()) {
        return;
    }
    match world.goal {
        Goal::Descend => {
            events.push(GameEvent::Descended);
            let next = world.current_level + 1;
            enter_level(world, next);
        }
        Goal::Victory => {
            events.push(GameEvent::Victory);
            world.set_phase(Phase::Won);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Lose / retry
// ══════════════════════════════════════════════════════════════

fn lose(world: &mut WorldState, msg: &str) {
    world.set_phase(Phase::GameOver);
    world.set_message(msg, 0);
}

/// GameOver retry: the level restarts from scratch — pickups return,
/// unlocked tiles relock, the hero and warden respawn.
pub fn restart_level(world: &mut WorldState) {
    enter_level(world, world.current_level);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedConfig;
    use crate::sim::level::parse_map;

    fn speed() -> SpeedConfig {
        // Zero cooldowns so every tick can act.
        SpeedConfig { tick_rate_ms: 0, hero_move_rate: 0, warden_move_rate: 0 }
    }

    fn world_from(maps: &[&str]) -> WorldState {
        let levels = maps
            .iter()
            .enumerate()
            .map(|(i, m)| parse_map(m, &format!("<fixture {i}>")).expect("fixture parses"))
            .collect();
        let mut w = WorldState::new(levels, speed());
        enter_level(&mut w, 0);
        w
    }

    fn go(w: &mut WorldState, dir: MoveDir) -> Vec<GameEvent> {
        step(w, FrameInput { movement: Some(dir) })
    }

    const CORRIDOR: &str = "\
# Corridor
= . 1 free
= # 2
= G 9 free gate
@ finish G
@ goal victory
@ spawn 1,1
---
#####
#..G#
#####
";

    #[test]
    fn hero_walks_free_tiles_only() {
        let mut w = world_from(&[CORRIDOR]);
        go(&mut w, MoveDir::Up);
        assert_eq!(w.hero.pos(), (1, 1), "wall above");
        go(&mut w, MoveDir::Left);
        assert_eq!(w.hero.pos(), (1, 1), "wall left");
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (2, 1));
    }

    #[test]
    fn finish_tile_wins_on_a_victory_level() {
        let mut w = world_from(&[CORRIDOR]);
        go(&mut w, MoveDir::Right);
        let ev = go(&mut w, MoveDir::Right);
        assert!(ev.contains(&GameEvent::Victory));
        assert_eq!(w.phase(), Phase::Won);
    }

    #[test]
    fn descend_advances_to_the_next_level() {
        const UPPER: &str = "\
# Upper
= . 1 free
= G 9 free gate
@ finish G
@ goal descend
@ spawn 0,0
---
.G
";
        let mut w = world_from(&[UPPER, CORRIDOR]);
        let ev = go(&mut w, MoveDir::Right);
        assert!(ev.contains(&GameEvent::Descended));
        assert_eq!(w.current_level, 1);
        assert_eq!(w.phase(), Phase::Playing);
        assert_eq!(w.hero.pos(), (1, 1), "spawned at the lower level's spawn");
    }

    #[test]
    fn pickups_collect_in_order_only() {
        const CHAIN: &str = "\
# Chain
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ pickup key 2,0
@ pickup key 1,0
---
...G
";
        let mut w = world_from(&[CHAIN]);
        // Walking over the second pickup's cell first collects nothing.
        let ev = go(&mut w, MoveDir::Right);
        assert!(ev.is_empty());
        assert_eq!(w.pickups_taken, 0);

        let ev = go(&mut w, MoveDir::Right);
        assert_eq!(w.pickups_taken, 1);
        assert!(matches!(ev[0], GameEvent::PickupCollected { kind: PickupKind::Key, .. }));

        // Now the cell at 1,0 is active; walking back collects it.
        let ev = go(&mut w, MoveDir::Left);
        assert_eq!(w.pickups_taken, 2);
        assert_eq!(ev.len(), 1);
    }

    #[test]
    fn last_pickup_unlocks_the_door() {
        const LOCKED: &str = "\
# Locked
= . 1 free
= D 5 door
= G 9 free gate
@ finish G
@ goal victory
@ spawn 2,0
@ pickup key 0,0 unlock D
---
...DG
";
        let mut w = world_from(&[LOCKED]);
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (2, 0), "door still shut");

        // Fetch the key from the far end.
        let ev = go(&mut w, MoveDir::Left);
        assert!(ev.is_empty());
        let ev = go(&mut w, MoveDir::Left);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::TileUnlocked { id: 5 })));

        go(&mut w, MoveDir::Right);
        go(&mut w, MoveDir::Right);
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (3, 0), "door opened");
    }

    #[test]
    fn sentry_contact_loses() {
        const TRAP: &str = "\
# Trap
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ hazard 1,0
---
..G
";
        let mut w = world_from(&[TRAP]);
        let ev = go(&mut w, MoveDir::Right);
        assert!(matches!(ev[0], GameEvent::SentryContact { pos: (1, 0) }));
        assert_eq!(w.phase(), Phase::GameOver);
    }

    #[test]
    fn dialog_fires_once() {
        const TALK: &str = "\
# Talk
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ dialog 1,0
> hello
---
...G
";
        let mut w = world_from(&[TALK]);
        let ev = go(&mut w, MoveDir::Right);
        assert!(ev.contains(&GameEvent::DialogStarted));
        assert_eq!(w.phase(), Phase::Dialog);

        w.set_phase(Phase::Playing);
        go(&mut w, MoveDir::Right);
        let ev = go(&mut w, MoveDir::Left);
        assert!(ev.is_empty(), "dialog does not re-fire");
        assert_eq!(w.phase(), Phase::Playing);
    }

    #[test]
    fn warden_takes_one_shortest_path_step() {
        const HUNT: &str = "\
# Hunt
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ warden 4,0
---
.....
....G
";
        let mut w = world_from(&[HUNT]);
        // Hero stands still; warden closes in one cell per tick.
        step(&mut w, FrameInput { movement: None });
        assert_eq!(w.warden.as_ref().unwrap().pos(), (3, 0));
        step(&mut w, FrameInput { movement: None });
        assert_eq!(w.warden.as_ref().unwrap().pos(), (2, 0));
    }

    #[test]
    fn warden_contact_loses() {
        const CLOSE: &str = "\
# Close
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ warden 1,0
---
...G
";
        let mut w = world_from(&[CLOSE]);
        let ev = step(&mut w, FrameInput { movement: None });
        assert!(ev.iter().any(|e| matches!(e, GameEvent::WardenContact { .. })));
        assert_eq!(w.phase(), Phase::GameOver);
    }

    #[test]
    fn warden_ignores_a_distant_hero() {
        const FAR: &str = "\
# Far
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ warden 14,0
---
...............G
";
        let mut w = world_from(&[FAR]);
        // 14 steps away is outside the chase radius; the warden is
        // already at its post and holds.
        step(&mut w, FrameInput { movement: None });
        assert_eq!(w.warden.as_ref().unwrap().pos(), (14, 0));
    }

    #[test]
    fn walled_off_warden_stays_put() {
        const WALLED: &str = "\
# Walled
= . 1 free
= # 2
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ warden 4,0
---
..#.G
";
        let mut w = world_from(&[WALLED]);
        step(&mut w, FrameInput { movement: None });
        assert_eq!(w.warden.as_ref().unwrap().pos(), (4, 0));
        assert_eq!(w.phase(), Phase::Playing);
    }

    #[test]
    fn restart_resets_pickups_and_relocks_tiles() {
        const LOCKED: &str = "\
# Locked
= . 1 free
= D 5 door
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
@ pickup key 1,0 unlock D
@ hazard 1,1
---
..DG
..DG
";
        let mut w = world_from(&[LOCKED]);
        go(&mut w, MoveDir::Right);
        assert_eq!(w.pickups_taken, 1);
        assert!(w.labyrinth.is_free((2, 0)));

        go(&mut w, MoveDir::Down);
        assert_eq!(w.phase(), Phase::GameOver);

        restart_level(&mut w);
        assert_eq!(w.phase(), Phase::Playing);
        assert_eq!(w.hero.pos(), (0, 0));
        assert_eq!(w.pickups_taken, 0);
        assert!(!w.labyrinth.is_free((2, 0)), "door relocked");
    }

    #[test]
    fn move_cooldown_paces_the_hero() {
        const CORR: &str = "\
# Corr
= . 1 free
= G 9 free gate
@ finish G
@ goal victory
@ spawn 0,0
---
.....G
";
        let levels = vec![parse_map(CORR, "<fixture>").unwrap()];
        let mut w = WorldState::new(
            levels,
            SpeedConfig { tick_rate_ms: 0, hero_move_rate: 2, warden_move_rate: 0 },
        );
        enter_level(&mut w, 0);
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (1, 0));
        // Two cooldown ticks pass before the next step lands.
        go(&mut w, MoveDir::Right);
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (1, 0));
        go(&mut w, MoveDir::Right);
        assert_eq!(w.hero.pos(), (2, 0));
    }
}
