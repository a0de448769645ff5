/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or
/// incomplete. Map assets are the one thing that is NOT forgiving:
/// a configured maps directory that fails to parse aborts the run.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub maps_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// Ticks between hero steps while a direction is held.
    pub hero_move_rate: u32,
    /// Ticks between warden steps.
    pub warden_move_rate: u32,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_hero_move")]
    hero_move_rate: u32,
    #[serde(default = "default_warden_move")]
    warden_move_rate: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_maps_dir")]
    maps_dir: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 66 }   // ~15 ticks/s
fn default_hero_move() -> u32 { 2 }
fn default_warden_move() -> u32 { 4 }  // slower than the hero
fn default_maps_dir() -> String { "maps".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            hero_move_rate: default_hero_move(),
            warden_move_rate: default_warden_move(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { maps_dir: default_maps_dir() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`, searching the exe directory
    /// then the current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        let maps_dir_str = &toml_cfg.general.maps_dir;
        let maps_dir = if PathBuf::from(maps_dir_str).is_absolute() {
            PathBuf::from(maps_dir_str)
        } else {
            search_dirs
                .iter()
                .map(|d| d.join(maps_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(maps_dir_str))
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms,
                hero_move_rate: toml_cfg.speed.hero_move_rate,
                warden_move_rate: toml_cfg.speed.warden_move_rate,
            },
            maps_dir,
        }
    }
}

/// Candidate directories: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so data is found next to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
