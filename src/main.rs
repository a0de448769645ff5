/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::entity::{FrameInput, MoveDir};
use sim::level::{enter_level, load_levels};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();

    // Map assets are fatal on failure: report and bail before the
    // terminal is switched to raw mode.
    let levels = match load_levels(&config) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("Map loading failed: {e}");
            std::process::exit(1);
        }
    };

    let mut world = WorldState::new(levels, config.speed.clone());

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Land of the Past!");
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(world.speed.tick_rate_ms);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            match world.phase() {
                Phase::Playing => {
                    let input = FrameInput { movement: detect_movement(&kb) };
                    let _events = step::step(world, input);
                }
                // Non-playing phases only advance the blink timer.
                _ => world.anim_tick = world.anim_tick.wrapping_add(1),
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn detect_movement(kb: &InputState) -> Option<MoveDir> {
    if kb.any_held(KEYS_UP) || kb.any_pressed(KEYS_UP) {
        Some(MoveDir::Up)
    } else if kb.any_held(KEYS_DOWN) || kb.any_pressed(KEYS_DOWN) {
        Some(MoveDir::Down)
    } else if kb.any_held(KEYS_LEFT) || kb.any_pressed(KEYS_LEFT) {
        Some(MoveDir::Left)
    } else if kb.any_held(KEYS_RIGHT) || kb.any_pressed(KEYS_RIGHT) {
        Some(MoveDir::Right)
    } else {
        None
    }
}

/// Phase-driven meta input: everything that is not in-level movement.
/// Returns true to quit the program.
fn handle_meta(world: &mut WorldState, kb: &InputState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM);
    let esc = kb.any_pressed(&[KeyCode::Esc]);

    match world.phase() {
        // ── Title Screen ──
        Phase::Title => {
            if confirm {
                world.steps = 0;
                enter_level(world, 0);
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc {
                world.set_phase(Phase::ExitPrompt);
            }
        }

        // ── Dialog (any key closes) ──
        Phase::Dialog => {
            if kb.anything_pressed() {
                world.set_phase(Phase::Playing);
            }
        }

        // ── Exit prompt: SPACE quits, anything else resumes ──
        Phase::ExitPrompt => {
            if kb.any_pressed(&[KeyCode::Char(' ')]) {
                return true;
            }
            if kb.anything_pressed() {
                world.set_phase(Phase::Playing);
            }
        }

        // ── Game Over: retry the level or back out ──
        Phase::GameOver => {
            if confirm {
                step::restart_level(world);
            } else if esc {
                world.set_phase(Phase::Title);
            }
        }

        // ── Won ──
        Phase::Won => {
            if confirm || esc {
                world.set_phase(Phase::Title);
            }
        }
    }

    false
}
