/// Map assets and the per-level event table.
///
/// ## Sources (priority order):
///   1. `maps/` directory (individual `.map` files, sorted by name)
///   2. Built-in embedded maps (jungle, dungeon)
///
/// A configured maps directory must parse: any unreadable or malformed
/// file aborts the run. The embedded maps go through the same parser.
///
/// ## Map format:
///   ```
///   # Level Name
///   = <glyph> <tile id> [free] [<style>]
///   @ finish <glyph>
///   @ goal descend|victory
///   @ spawn x,y
///   @ pickup key|gem x,y [unlock <glyph>]
///   @ dialog x,y
///   > dialog text line
///   @ hazard x,y
///   @ warden x,y
///   ---
///   <glyph grid rows>
///   ```
///
/// Pickups form an ordered chain: only the first uncollected one is
/// active. `unlock` names a legend glyph whose tile id is added to the
/// free set when that pickup is taken (vine door, exit gate).

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::GameConfig;
use crate::domain::entity::{Hero, Warden};
use crate::domain::grid::{Labyrinth, Pos, TileId, TileSource};
use crate::sim::event::PickupKind;
use crate::sim::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════

/// How a tile renders. Pure presentation; the simulation only reads
/// the free set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileStyle {
    Ground,
    Accent,
    Scrub,
    Tree,
    Water,
    Rock,
    Door,
    Gate,
    Wall,
    Stair,
    Crystal,
}

#[derive(Clone, Debug)]
pub struct LegendEntry {
    pub glyph: char,
    pub id: TileId,
    pub free: bool,
    pub style: TileStyle,
}

#[derive(Clone, Debug)]
pub struct PickupDef {
    pub pos: Pos,
    pub kind: PickupKind,
    pub unlock: Option<TileId>,
}

#[derive(Clone, Debug)]
pub struct DialogDef {
    pub pos: Pos,
    pub lines: Vec<String>,
}

/// What stepping on the finish tile does.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Goal {
    Descend,
    Victory,
}

/// A parsed, validated level.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub legend: Vec<LegendEntry>,
    pub grid: Vec<Vec<TileId>>,
    pub width: usize,
    pub height: usize,
    pub finish_id: TileId,
    pub goal: Goal,
    pub spawn: Pos,
    pub pickups: Vec<PickupDef>,
    pub dialog: Option<DialogDef>,
    pub hazards: Vec<Pos>,
    pub warden: Option<Pos>,
}

impl TileSource for LevelDef {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn tile_id_at(&self, x: usize, y: usize) -> TileId {
        self.grid[y][x]
    }
}

impl LevelDef {
    /// Initial free-tile set (legend entries marked `free`).
    pub fn free_set(&self) -> std::collections::HashSet<TileId> {
        self.legend.iter().filter(|e| e.free).map(|e| e.id).collect()
    }

    /// Tile id → style lookup for the renderer.
    pub fn style_map(&self) -> HashMap<TileId, TileStyle> {
        self.legend.iter().map(|e| (e.id, e.style)).collect()
    }
}

// ══════════════════════════════════════════════════════════════
// Errors — asset failures are fatal (propagated to main)
// ══════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum MapError {
    Io { path: PathBuf, source: io::Error },
    Parse { origin: String, line: usize, msg: String },
    Invalid { origin: String, msg: String },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => {
                write!(f, "cannot read map {}: {}", path.display(), source)
            }
            MapError::Parse { origin, line, msg } => {
                write!(f, "{}:{}: {}", origin, line, msg)
            }
            MapError::Invalid { origin, msg } => write!(f, "{}: {}", origin, msg),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the level sequence: `maps/*.map` if the directory has any,
/// otherwise the embedded maps.
pub fn load_levels(config: &GameConfig) -> Result<Vec<LevelDef>, MapError> {
    let dir = &config.maps_dir;
    let levels = if dir.is_dir() && dir_has_maps(dir) {
        load_from_directory(dir)?
    } else {
        embedded_maps()
            .into_iter()
            .map(|(origin, text)| parse_map(text, origin))
            .collect::<Result<Vec<_>, _>>()?
    };

    if levels.is_empty() {
        return Err(MapError::Invalid {
            origin: dir.display().to_string(),
            msg: "no levels found".to_string(),
        });
    }
    if levels.last().map(|l| l.goal) == Some(Goal::Descend) {
        return Err(MapError::Invalid {
            origin: levels.last().unwrap().name.clone(),
            msg: "last level descends but there is nothing below".to_string(),
        });
    }
    Ok(levels)
}

/// Enter a level: build the labyrinth, place entities, reset the
/// trigger state. Used both for advancing and for GameOver retry.
pub fn enter_level(world: &mut WorldState, idx: usize) {
    let def = world.levels[idx].clone();

    world.current_level = idx;
    world.level_name = def.name.clone();
    world.labyrinth = Labyrinth::new(&def, def.free_set(), def.finish_id);
    world.tile_styles = def.style_map();
    world.hero = Hero::new(def.spawn);
    world.warden = def.warden.map(Warden::new);
    world.sentries = def.hazards.clone();
    world.pickups = def.pickups.clone();
    world.pickups_taken = 0;
    world.dialog = def.dialog.clone();
    world.dialog_seen = false;
    world.goal = def.goal;

    world.set_phase(Phase::Playing);
    world.set_message(&def.name, 40);
    world.camera.center_on(def.spawn.0, def.spawn.1, def.width, def.height);
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn parse_map(text: &str, origin: &str) -> Result<LevelDef, MapError> {
    let mut name = String::new();
    let mut legend: Vec<LegendEntry> = vec![];
    let mut finish_glyph: Option<char> = None;
    let mut goal: Option<Goal> = None;
    let mut spawn: Option<Pos> = None;
    let mut pickups: Vec<PickupDef> = vec![];
    let mut pickup_unlocks: Vec<Option<char>> = vec![];
    let mut dialog: Option<DialogDef> = None;
    let mut hazards: Vec<Pos> = vec![];
    let mut warden: Option<Pos> = None;
    let mut rows: Vec<String> = vec![];
    let mut in_grid = false;

    let err = |line: usize, msg: String| MapError::Parse {
        origin: origin.to_string(),
        line,
        msg,
    };

    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;

        if in_grid {
            rows.push(raw.to_string());
            continue;
        }

        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if line.trim() == "---" {
            in_grid = true;
        } else if let Some(rest) = line.strip_prefix("# ") {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
        } else if let Some(rest) = line.strip_prefix("= ") {
            legend.push(parse_legend_line(rest).map_err(|m| err(lineno, m))?);
        } else if let Some(rest) = line.strip_prefix("@ ") {
            parse_directive(
                rest,
                &mut finish_glyph,
                &mut goal,
                &mut spawn,
                &mut pickups,
                &mut pickup_unlocks,
                &mut dialog,
                &mut hazards,
                &mut warden,
            )
            .map_err(|m| err(lineno, m))?;
        } else if let Some(rest) = line.strip_prefix("> ") {
            match dialog.as_mut() {
                Some(d) => d.lines.push(rest.to_string()),
                None => return Err(err(lineno, "dialog text before @ dialog".to_string())),
            }
        } else {
            return Err(err(lineno, format!("unrecognized line: {line:?}")));
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    // Resolve and validate.
    let origin_s = origin.to_string();
    let inv = |msg: String| MapError::Invalid { origin: origin_s.clone(), msg };

    if rows.is_empty() {
        return Err(inv("map has no grid rows".to_string()));
    }
    if legend.is_empty() {
        return Err(inv("map has no legend".to_string()));
    }
    let mut by_glyph: HashMap<char, &LegendEntry> = HashMap::new();
    for e in &legend {
        if by_glyph.insert(e.glyph, e).is_some() {
            return Err(inv(format!("duplicate legend glyph {:?}", e.glyph)));
        }
    }

    let width = rows[0].chars().count();
    let height = rows.len();
    let mut grid = vec![vec![0; width]; height];
    for (y, row) in rows.iter().enumerate() {
        if row.chars().count() != width {
            return Err(inv(format!("grid row {} is not {width} cells wide", y + 1)));
        }
        for (x, ch) in row.chars().enumerate() {
            let entry = by_glyph
                .get(&ch)
                .ok_or_else(|| inv(format!("glyph {ch:?} at {x},{y} not in legend")))?;
            grid[y][x] = entry.id;
        }
    }

    let finish_glyph =
        finish_glyph.ok_or_else(|| inv("missing @ finish directive".to_string()))?;
    let finish_id = by_glyph
        .get(&finish_glyph)
        .ok_or_else(|| inv(format!("finish glyph {finish_glyph:?} not in legend")))?
        .id;
    let goal = goal.ok_or_else(|| inv("missing @ goal directive".to_string()))?;
    let spawn = spawn.ok_or_else(|| inv("missing @ spawn directive".to_string()))?;

    let in_bounds = |(x, y): Pos| x < width && y < height;
    let check = |pos: Pos, what: &str| -> Result<(), MapError> {
        if in_bounds(pos) {
            Ok(())
        } else {
            Err(inv(format!("{what} at {},{} is out of bounds", pos.0, pos.1)))
        }
    };

    check(spawn, "spawn")?;
    let free_ids: std::collections::HashSet<TileId> =
        legend.iter().filter(|e| e.free).map(|e| e.id).collect();
    if !free_ids.contains(&grid[spawn.1][spawn.0]) {
        return Err(inv("spawn tile is not free".to_string()));
    }
    for (p, u) in pickups.iter_mut().zip(&pickup_unlocks) {
        check(p.pos, "pickup")?;
        if let Some(g) = u {
            p.unlock = Some(
                by_glyph
                    .get(g)
                    .ok_or_else(|| inv(format!("unlock glyph {g:?} not in legend")))?
                    .id,
            );
        }
    }
    if let Some(d) = &dialog {
        check(d.pos, "dialog")?;
    }
    for &h in &hazards {
        check(h, "hazard")?;
    }
    if let Some(w) = warden {
        check(w, "warden")?;
        if !free_ids.contains(&grid[w.1][w.0]) {
            return Err(inv("warden spawn tile is not free".to_string()));
        }
    }

    if name.is_empty() {
        name = "Unnamed Place".to_string();
    }

    Ok(LevelDef {
        name,
        legend,
        grid,
        width,
        height,
        finish_id,
        goal,
        spawn,
        pickups,
        dialog,
        hazards,
        warden,
    })
}

/// `<glyph> <id> [free] [<style>]`
fn parse_legend_line(rest: &str) -> Result<LegendEntry, String> {
    let mut tokens = rest.split_whitespace();
    let glyph_tok = tokens.next().ok_or("empty legend line")?;
    let mut chars = glyph_tok.chars();
    let glyph = chars.next().ok_or("empty legend glyph")?;
    if chars.next().is_some() {
        return Err(format!("legend glyph {glyph_tok:?} must be one character"));
    }
    let id: TileId = tokens
        .next()
        .ok_or("legend line missing tile id")?
        .parse()
        .map_err(|_| "tile id is not a number".to_string())?;

    let mut free = false;
    let mut style: Option<TileStyle> = None;
    for tok in tokens {
        if tok == "free" {
            free = true;
        } else {
            style = Some(parse_style(tok)?);
        }
    }
    // Unstyled tiles fall back on their walkability.
    let style = style.unwrap_or(if free { TileStyle::Ground } else { TileStyle::Wall });
    Ok(LegendEntry { glyph, id, free, style })
}

fn parse_style(word: &str) -> Result<TileStyle, String> {
    Ok(match word {
        "ground" => TileStyle::Ground,
        "accent" => TileStyle::Accent,
        "scrub" => TileStyle::Scrub,
        "tree" => TileStyle::Tree,
        "water" => TileStyle::Water,
        "rock" => TileStyle::Rock,
        "door" => TileStyle::Door,
        "gate" => TileStyle::Gate,
        "wall" => TileStyle::Wall,
        "stair" => TileStyle::Stair,
        "crystal" => TileStyle::Crystal,
        other => return Err(format!("unknown tile style {other:?}")),
    })
}

#[allow(clippy::too_many_arguments)]
fn parse_directive(
    rest: &str,
    finish_glyph: &mut Option<char>,
    goal: &mut Option<Goal>,
    spawn: &mut Option<Pos>,
    pickups: &mut Vec<PickupDef>,
    pickup_unlocks: &mut Vec<Option<char>>,
    dialog: &mut Option<DialogDef>,
    hazards: &mut Vec<Pos>,
    warden: &mut Option<Pos>,
) -> Result<(), String> {
    let mut tokens = rest.split_whitespace();
    let kind = tokens.next().ok_or("empty directive")?;
    match kind {
        "finish" => {
            let tok = tokens.next().ok_or("finish needs a glyph")?;
            let mut chars = tok.chars();
            let g = chars.next().ok_or("finish needs a glyph")?;
            if chars.next().is_some() {
                return Err(format!("finish glyph {tok:?} must be one character"));
            }
            *finish_glyph = Some(g);
        }
        "goal" => {
            *goal = Some(match tokens.next() {
                Some("descend") => Goal::Descend,
                Some("victory") => Goal::Victory,
                other => return Err(format!("goal must be descend or victory, got {other:?}")),
            });
        }
        "spawn" => *spawn = Some(parse_pos(tokens.next().ok_or("spawn needs x,y")?)?),
        "pickup" => {
            let kind = match tokens.next() {
                Some("key") => PickupKind::Key,
                Some("gem") => PickupKind::Gem,
                other => return Err(format!("pickup kind must be key or gem, got {other:?}")),
            };
            let pos = parse_pos(tokens.next().ok_or("pickup needs x,y")?)?;
            let unlock = match tokens.next() {
                None => None,
                Some("unlock") => {
                    let tok = tokens.next().ok_or("unlock needs a glyph")?;
                    let mut chars = tok.chars();
                    let g = chars.next().ok_or("unlock needs a glyph")?;
                    if chars.next().is_some() {
                        return Err(format!("unlock glyph {tok:?} must be one character"));
                    }
                    Some(g)
                }
                Some(other) => return Err(format!("unexpected token {other:?} after pickup")),
            };
            pickups.push(PickupDef { pos, kind, unlock: None });
            pickup_unlocks.push(unlock);
        }
        "dialog" => {
            if dialog.is_some() {
                return Err("a level has at most one dialog".to_string());
            }
            let pos = parse_pos(tokens.next().ok_or("dialog needs x,y")?)?;
            *dialog = Some(DialogDef { pos, lines: vec![] });
        }
        "hazard" => hazards.push(parse_pos(tokens.next().ok_or("hazard needs x,y")?)?),
        "warden" => {
            if warden.is_some() {
                return Err("a level has at most one warden".to_string());
            }
            *warden = Some(parse_pos(tokens.next().ok_or("warden needs x,y")?)?);
        }
        other => return Err(format!("unknown directive {other:?}")),
    }
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected trailing token {extra:?}"));
    }
    Ok(())
}

fn parse_pos(tok: &str) -> Result<Pos, String> {
    let (xs, ys) = tok
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {tok:?}"))?;
    let x = xs.parse().map_err(|_| format!("bad x coordinate {xs:?}"))?;
    let y = ys.parse().map_err(|_| format!("bad y coordinate {ys:?}"))?;
    Ok((x, y))
}

// ══════════════════════════════════════════════════════════════
// Directory loading
// ══════════════════════════════════════════════════════════════

fn dir_has_maps(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|e| {
            e.flatten()
                .any(|f| f.path().extension().map_or(false, |x| x == "map"))
        })
        .unwrap_or(false)
}

fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, MapError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MapError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |x| x == "map"))
        .collect();
    paths.sort();

    let mut levels = vec![];
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| MapError::Io {
            path: path.clone(),
            source: e,
        })?;
        levels.push(parse_map(&text, &path.display().to_string())?);
    }
    Ok(levels)
}

// ══════════════════════════════════════════════════════════════
// Embedded maps
// ══════════════════════════════════════════════════════════════

fn embedded_maps() -> [(&'static str, &'static str); 2] {
    [("<jungle>", JUNGLE_MAP), ("<dungeon>", DUNGEON_MAP)]
}

/// The overworld: three keys, the last opens the vine door in front of
/// the stone gate down to the dungeon.
const JUNGLE_MAP: &str = "\
# Jungle of the Past
= . 1 free ground
= , 2 free accent
= ; 3 free scrub
= T 930 tree
= ~ 1197 water
= o 1284 rock
= D 562 door
= G 1371 free gate
@ finish G
@ goal descend
@ spawn 13,14
@ pickup key 26,1
@ pickup key 3,12
@ pickup key 22,5 unlock D
@ dialog 4,14
> Hail, traveler. I am Dimka the mammoth.
> You have wandered into the deep past of the Earth.
> To leave this jungle and open the way below,
> you must gather three keys, one after another.
> Beware the wardens of the old places:
> their touch ends your journey.
> Good luck!
---
TTTTTTTTTTTTTTTTTTTTTTTTTTTT
T.............o............T
T.TTTTTTTTTTT.TTTTTTTTTTTT.T
T.T;...................;.T.T
T.T.TTTTTTTTTTTTTTTTTTTT.T.T
T.T.T;.................T.T.T
T.T.T.TDTTTTTTTTTTTTTT.T.T.T
T.T.T.T,,,,,,,,,,,,,,T.T.T.T
T.T.T.T,,,,,,,G,,,,,,T.T.T.T
T.T.T.TTTTTTTTTTTTTTTT.T.T.T
T.T.T;................;T.T.T
T.T.TTTTTTTTTT.TTTTTTTTT.T.T
T.T.......o..............T.T
T.~~~~~~~~~~~~~~~~~~~~~~~~.T
T,,,,,,,,,,,,,,,,,,,,,,,,,,T
TTTTTTTTTTTTTTTTTTTTTTTTTTTT
";

/// The dungeon: four gems, the last opens the exit gate. Sentries hold
/// fixed cells; the warden hunts.
const DUNGEON_MAP: &str = "\
# Dungeon of the Wardens
= . 810 free ground
= , 811 free accent
= * 3354 free crystal
= S 987 free stair
= # 950 wall
= G 989 gate
@ finish G
@ goal victory
@ spawn 7,1
@ pickup gem 11,11
@ pickup gem 7,5
@ pickup gem 1,7
@ pickup gem 1,3 unlock G
@ hazard 5,9
@ hazard 1,13
@ hazard 13,6
@ warden 13,13
---
###############
#......S......#
#.#####.#####.#
#........*....#
#.#.#####.#.#.#
#..,..........#
#####.#.#.###.#
#....*........#
#.###.#.#.#.###
#..........,..#
#.#.#.###.#.#.#
#............G#
#.#####.#.###.#
#......,......#
###############
";

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LevelDef {
        parse_map(text, "<test>").expect("map should parse")
    }

    const MINIMAL: &str = "\
# Tiny
= . 1 free
= # 2
= G 9 free gate
@ finish G
@ goal victory
@ spawn 1,1
---
####
#.G#
####
";

    #[test]
    fn minimal_map_parses() {
        let def = parse(MINIMAL);
        assert_eq!(def.name, "Tiny");
        assert_eq!((def.width, def.height), (4, 3));
        assert_eq!(def.spawn, (1, 1));
        assert_eq!(def.finish_id, 9);
        assert_eq!(def.goal, Goal::Victory);
        assert_eq!(def.tile_id_at(2, 1), 9);
        assert_eq!(def.tile_id_at(0, 0), 2);
        assert!(def.free_set().contains(&1));
        assert!(!def.free_set().contains(&2));
    }

    #[test]
    fn pickup_chain_and_unlock_resolve() {
        let def = parse(
            "\
# Chain
= . 1 free
= D 5 door
= G 9 free
@ finish G
@ goal victory
@ spawn 0,0
@ pickup key 2,0
@ pickup gem 1,0 unlock D
---
..DG
",
        );
        assert_eq!(def.pickups.len(), 2);
        assert_eq!(def.pickups[0].kind, PickupKind::Key);
        assert_eq!(def.pickups[0].unlock, None);
        assert_eq!(def.pickups[1].unlock, Some(5));
    }

    #[test]
    fn dialog_text_attaches() {
        let def = parse(
            "\
# Talky
= . 1 free
= G 9 free
@ finish G
@ goal victory
@ spawn 0,0
@ dialog 1,0
> line one
> line two
---
..G
",
        );
        let d = def.dialog.unwrap();
        assert_eq!(d.pos, (1, 0));
        assert_eq!(d.lines, vec!["line one", "line two"]);
    }

    #[test]
    fn unknown_glyph_is_an_error() {
        let text = MINIMAL.replace("#.G#", "#.X#");
        assert!(parse_map(&text, "<test>").is_err());
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let text = MINIMAL.replace("#.G#", "#.G##");
        assert!(parse_map(&text, "<test>").is_err());
    }

    #[test]
    fn spawn_on_wall_is_an_error() {
        let text = MINIMAL.replace("@ spawn 1,1", "@ spawn 0,0");
        assert!(parse_map(&text, "<test>").is_err());
    }

    #[test]
    fn missing_goal_is_an_error() {
        let text = MINIMAL.replace("@ goal victory\n", "");
        assert!(parse_map(&text, "<test>").is_err());
    }

    #[test]
    fn out_of_bounds_trigger_is_an_error() {
        let text = MINIMAL.replace("@ spawn 1,1", "@ spawn 1,1\n@ hazard 9,9");
        assert!(parse_map(&text, "<test>").is_err());
    }

    // ── Embedded maps stay coherent ──

    #[test]
    fn embedded_maps_parse_and_validate() {
        for (origin, text) in embedded_maps() {
            let def = parse_map(text, origin).expect("embedded map must parse");
            assert!(!def.pickups.is_empty(), "{origin} has no pickups");
            let free = def.free_set();
            for p in &def.pickups {
                assert!(
                    free.contains(&def.tile_id_at(p.pos.0, p.pos.1)),
                    "{origin}: pickup at {:?} is not on a free tile",
                    p.pos
                );
            }
            for &h in &def.hazards {
                assert!(
                    free.contains(&def.tile_id_at(h.0, h.1)),
                    "{origin}: hazard at {h:?} is not on a free tile"
                );
            }
        }
    }

    #[test]
    fn jungle_gate_sits_behind_the_vine_door() {
        let def = parse_map(JUNGLE_MAP, "<jungle>").unwrap();
        let mut laby = Labyrinth::new(&def, def.free_set(), def.finish_id);

        // Gate position from the grid.
        let gate = find_tile(&def, def.finish_id);

        // Locked: no path from spawn to the gate.
        use crate::domain::path::distance_to;
        assert_eq!(distance_to(&laby, def.spawn, gate), None);

        // The last key unlocks the door; the gate becomes reachable.
        let door = def.pickups.last().unwrap().unlock.expect("last key unlocks");
        laby.add_free_tile(door);
        assert!(distance_to(&laby, def.spawn, gate).is_some());
    }

    #[test]
    fn dungeon_gate_opens_with_the_last_gem() {
        let def = parse_map(DUNGEON_MAP, "<dungeon>").unwrap();
        let mut laby = Labyrinth::new(&def, def.free_set(), def.finish_id);
        let gate = find_tile(&def, def.finish_id);

        use crate::domain::path::distance_to;
        assert_eq!(distance_to(&laby, def.spawn, gate), None);

        let unlock = def.pickups.last().unwrap().unlock.unwrap();
        assert_eq!(unlock, def.finish_id);
        laby.add_free_tile(unlock);
        assert!(distance_to(&laby, def.spawn, gate).is_some());
    }

    #[test]
    fn dungeon_warden_can_reach_the_spawn() {
        let def = parse_map(DUNGEON_MAP, "<dungeon>").unwrap();
        let laby = Labyrinth::new(&def, def.free_set(), def.finish_id);
        let w = def.warden.unwrap();
        use crate::domain::path::next_step;
        assert_ne!(next_step(&laby, w, def.spawn), w);
    }

    #[test]
    fn every_pickup_in_the_chain_is_reachable() {
        for (origin, text) in embedded_maps() {
            let def = parse_map(text, origin).unwrap();
            let mut laby = Labyrinth::new(&def, def.free_set(), def.finish_id);
            let mut from = def.spawn;
            use crate::domain::path::distance_to;
            for p in &def.pickups {
                assert!(
                    distance_to(&laby, from, p.pos).is_some(),
                    "{origin}: pickup at {:?} unreachable from {from:?}",
                    p.pos
                );
                if let Some(id) = p.unlock {
                    laby.add_free_tile(id);
                }
                from = p.pos;
            }
        }
    }

    fn find_tile(def: &LevelDef, id: TileId) -> Pos {
        for y in 0..def.height {
            for x in 0..def.width {
                if def.tile_id_at(x, y) == id {
                    return (x, y);
                }
            }
        }
        panic!("tile {id} not in grid");
    }
}
