/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer (array of Cell)
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. Commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker from full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Facing;
use crate::domain::grid::Pos;
use crate::sim::event::PickupKind;
use crate::sim::level::TileStyle;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, used
    /// for both `Clear` and cell backgrounds so inter-row gap pixels
    /// match exactly on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 14, g: 18, b: 14 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer: differs from any
    /// real cell, so every position gets diff'd.
    const INVALID: Cell = Cell { ch: '\0', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }

    fn fill_row(&mut self, y: usize, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
    }
}

// ── Renderer ──

/// Each game cell spans 2 terminal columns: game cell gx maps to
/// columns (gx*2, gx*2+1).
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 18, g: 40, b: 18 };
const BANNER_FG: Color = Color::Rgb { r: 230, g: 200, b: 80 };
const MSG_BG: Color = Color::Rgb { r: 190, g: 165, b: 60 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        // Detect terminal resize.
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport dimensions from terminal size, capped to the world.
        let reserved_rows = MAP_ROW + 4; // HUD + gap + msg + help
        world.camera.view_w = self.term_w / CELL_W;
        let max_view_h = if self.term_h > reserved_rows { self.term_h - reserved_rows } else { 1 };
        let (ww, wh) = (world.labyrinth.width(), world.labyrinth.height());
        if ww > 0 {
            world.camera.view_w = world.camera.view_w.min(ww);
        }
        world.camera.view_h = if wh > 0 { max_view_h.min(wh) } else { max_view_h };

        // Phase change → clear for a clean transition.
        let phase = world.phase();
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(phase);
        }

        // Keep the hero in view while any in-level phase shows the map.
        if phase != Phase::Title && phase != Phase::Won {
            world.camera.follow(world.hero.x, world.hero.y, ww, wh);
        }

        self.front.clear();

        match phase {
            Phase::Title => self.compose_title(world),
            Phase::Won => self.compose_won(world),
            Phase::Playing => self.compose_game(world),
            Phase::Dialog => {
                self.compose_game(world);
                self.compose_dialog_overlay(world);
            }
            Phase::ExitPrompt => {
                self.compose_game(world);
                self.compose_exit_prompt(world);
            }
            Phase::GameOver => {
                self.compose_game(world);
                self.compose_game_over_overlay(world);
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at frame start; ResetColor would fall
        // back to the terminal default and cause line artifacts.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: the in-level view ──

    fn compose_game(&mut self, w: &WorldState) {
        let cam = &w.camera;

        // ── HUD row ──
        self.front.fill_row(HUD_ROW, Color::White, HUD_BG);
        let mut hud = format!(" {}", w.level_name);
        if let Some(first) = w.pickups.first() {
            let label = match first.kind {
                PickupKind::Key => "Keys",
                PickupKind::Gem => "Gems",
            };
            hud.push_str(&format!(
                "   {} {}/{}",
                label,
                w.pickups_taken,
                w.pickups.len()
            ));
        }
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        for vy in 0..cam.view_h {
            let wy = cam.y + vy as i32;
            let row = MAP_ROW + vy;
            if row >= self.front.height {
                break;
            }
            for vx in 0..cam.view_w {
                let wx = cam.x + vx as i32;
                let col = vx * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                if wx < 0
                    || wy < 0
                    || wx >= w.labyrinth.width() as i32
                    || wy >= w.labyrinth.height() as i32
                {
                    self.put_pair(col, row, ' ', ' ', Color::White, Cell::BASE_BG);
                } else {
                    self.compose_cell(w, (wx as usize, wy as usize), col, row);
                }
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + cam.view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, Color::Black, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + cam.view_h + 3;
        if help_row < self.front.height {
            let help = " Arrows/WASD: Move   ESC: Leave";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn put_pair(&mut self, col: usize, row: usize, c0: char, c1: char, fg: Color, bg: Color) {
        self.front.set(col, row, Cell::new(c0, fg, bg));
        self.front.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    /// Write the visual for game cell (gx, gy) at buffer (col, row).
    /// Entities draw over the tile: hero, warden, sentries, the
    /// mammoth, then the active pickup.
    fn compose_cell(&mut self, w: &WorldState, pos: Pos, col: usize, row: usize) {
        let ground = self.tile_colors(w, pos).3;
        let face = |f: Facing| match f {
            Facing::Left => '‹',
            Facing::Right => '›',
        };

        if w.hero.pos() == pos {
            let fg = Color::Rgb { r: 255, g: 230, b: 120 };
            self.put_pair(col, row, '@', face(w.hero.facing), fg, ground);
            return;
        }
        if let Some(warden) = &w.warden {
            if warden.pos() == pos {
                let fg = Color::Rgb { r: 255, g: 70, b: 70 };
                self.put_pair(col, row, 'W', face(warden.facing), fg, ground);
                return;
            }
        }
        if w.sentry_at(pos) {
            self.put_pair(col, row, 'Ω', ' ', Color::Rgb { r: 220, g: 90, b: 60 }, ground);
            return;
        }
        if let Some(d) = &w.dialog {
            if d.pos == pos {
                self.put_pair(col, row, 'M', ' ', Color::Rgb { r: 230, g: 230, b: 230 }, ground);
                return;
            }
        }
        if let Some(p) = w.active_pickup() {
            if p.pos == pos {
                // Glint so the next target catches the eye.
                let bright = (w.anim_tick / 4) % 2 == 0;
                let (ch, fg) = match (p.kind, bright) {
                    (PickupKind::Key, true) => ('K', Color::Rgb { r: 255, g: 225, b: 110 }),
                    (PickupKind::Key, false) => ('K', Color::Rgb { r: 200, g: 160, b: 40 }),
                    (PickupKind::Gem, true) => ('◆', Color::Rgb { r: 150, g: 235, b: 255 }),
                    (PickupKind::Gem, false) => ('◆', Color::Rgb { r: 70, g: 160, b: 200 }),
                };
                self.put_pair(col, row, ch, ' ', fg, ground);
                return;
            }
        }

        let (c0, c1, fg, bg) = self.tile_colors(w, pos);
        self.put_pair(col, row, c0, c1, fg, bg);
    }

    fn tile_colors(&self, w: &WorldState, pos: Pos) -> (char, char, Color, Color) {
        let style = w
            .tile_styles
            .get(&w.labyrinth.tile_at(pos))
            .copied()
            .unwrap_or(TileStyle::Ground);
        match style {
            TileStyle::Ground => (' ', ' ', Color::Reset, Color::Rgb { r: 24, g: 32, b: 24 }),
            TileStyle::Accent => ('·', ' ', Color::Rgb { r: 150, g: 140, b: 90 }, Color::Rgb { r: 24, g: 32, b: 24 }),
            TileStyle::Scrub => ('"', '"', Color::Rgb { r: 90, g: 160, b: 70 }, Color::Rgb { r: 24, g: 32, b: 24 }),
            TileStyle::Tree => ('▓', '▓', Color::Rgb { r: 45, g: 130, b: 55 }, Color::Rgb { r: 18, g: 55, b: 25 }),
            TileStyle::Water => ('~', '~', Color::Rgb { r: 90, g: 160, b: 220 }, Color::Rgb { r: 20, g: 40, b: 90 }),
            TileStyle::Rock => ('▒', '▒', Color::Rgb { r: 130, g: 130, b: 120 }, Color::Rgb { r: 60, g: 60, b: 55 }),
            TileStyle::Door => ('║', '║', Color::Rgb { r: 130, g: 200, b: 90 }, Color::Rgb { r: 70, g: 50, b: 25 }),
            TileStyle::Gate => ('Π', ' ', Color::Rgb { r: 255, g: 220, b: 80 }, Color::Rgb { r: 60, g: 50, b: 10 }),
            TileStyle::Wall => ('█', '█', Color::Rgb { r: 110, g: 110, b: 115 }, Color::Rgb { r: 65, g: 65, b: 70 }),
            TileStyle::Stair => ('≡', '≡', Color::Rgb { r: 200, g: 200, b: 180 }, Color::Rgb { r: 50, g: 50, b: 45 }),
            TileStyle::Crystal => ('*', ' ', Color::Rgb { r: 170, g: 220, b: 255 }, Color::Rgb { r: 24, g: 32, b: 24 }),
        }
    }

    // ── Overlays ──

    /// Centered box over the map area; returns (x, y, w) of the
    /// interior for the caller to fill.
    fn overlay_box(&mut self, lines: usize, width: usize, bg: Color) -> (usize, usize, usize) {
        let cam_rows = self.front.height.saturating_sub(MAP_ROW + 4);
        let box_w = width.min(self.front.width.saturating_sub(2));
        let box_h = lines;
        let x0 = (self.front.width.saturating_sub(box_w)) / 2;
        let y0 = MAP_ROW + cam_rows.saturating_sub(box_h) / 2;
        for y in y0..(y0 + box_h).min(self.front.height) {
            for x in x0..x0 + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }
        (x0, y0, box_w)
    }

    fn compose_dialog_overlay(&mut self, w: &WorldState) {
        let lines: Vec<String> = match &w.dialog {
            Some(d) => d.lines.clone(),
            None => return,
        };
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let bg = Color::Rgb { r: 30, g: 30, b: 45 };
        let (x0, y0, box_w) = self.overlay_box(lines.len() + 4, widest + 6, bg);

        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x0 + 3, y0 + 1 + i, line, Color::Rgb { r: 225, g: 225, b: 210 }, bg);
        }
        let hint = "— press any key —";
        let hx = x0 + box_w.saturating_sub(hint.chars().count()) / 2;
        self.front.put_str(hx, y0 + lines.len() + 2, hint, Color::DarkGrey, bg);
    }

    fn compose_exit_prompt(&mut self, _w: &WorldState) {
        let bg = Color::Rgb { r: 45, g: 30, b: 25 };
        let (x0, y0, _) = self.overlay_box(3, 46, bg);
        self.front.put_str(
            x0 + 2,
            y0 + 1,
            "Leave the past?  SPACE: quit   any key: stay",
            Color::Rgb { r: 255, g: 210, b: 140 },
            bg,
        );
    }

    fn compose_game_over_overlay(&mut self, w: &WorldState) {
        let bg = Color::Rgb { r: 50, g: 18, b: 18 };
        let (x0, y0, box_w) = self.overlay_box(5, 40, bg);
        let title = "✕  THE WARDENS GOT YOU  ✕";
        let tx = x0 + box_w.saturating_sub(title.chars().count()) / 2;
        self.front.put_str(tx, y0 + 1, title, Color::Rgb { r: 255, g: 90, b: 90 }, bg);
        if !w.message.is_empty() {
            let mx = x0 + box_w.saturating_sub(w.message.chars().count()) / 2;
            let msg = w.message.clone();
            self.front.put_str(mx, y0 + 2, &msg, Color::White, bg);
        }
        self.front.put_str(
            x0 + 4,
            y0 + 3,
            "ENTER: Try Again      ESC: Title",
            Color::Rgb { r: 120, g: 230, b: 120 },
            bg,
        );
    }

    // ── Static screens ──

    fn compose_title(&mut self, _w: &WorldState) {
        let title = [
            r"  _                  _      __  _   _          ___          _   ",
            r" | |    __ _ _ _  __| |    /  \| |_| |_  ___  | _ \__ _ ___| |_ ",
            r" | |__ / _` | ' \/ _` |   | () |  _| ' \/ -_) |  _/ _` (_-<  _|",
            r" |____|\__,_|_||_\__,_|    \__/ \__|_||_\___| |_| \__,_/__/\__|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, BANNER_FG, Color::Reset);
        }

        let subtitle = "◈◈  A Journey into the Deep Past  ◈◈";
        self.front.put_str(14, 7, subtitle, Color::Rgb { r: 110, g: 230, b: 110 }, Color::Reset);

        let menu_base = 10;
        self.front.put_str(
            8,
            menu_base,
            "ENTER   Begin the Journey",
            Color::Rgb { r: 110, g: 230, b: 110 },
            Color::Reset,
        );
        self.front.put_str(8, menu_base + 1, "  Q     Quit", Color::White, Color::Reset);

        let help = [
            "Controls",
            "  ←→↑↓ / WASD   Move",
            "  ESC           Leave prompt",
            "",
            "Gather the keys, open the vine door, and",
            "descend to the dungeon. Mind the wardens.",
        ];
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { BANNER_FG } else { Color::White };
            self.front.put_str(8, menu_base + 3 + i, line, color, Color::Reset);
        }
    }

    fn compose_won(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════════════════╗",
            "║   ★  YOU ESCAPED THE DEEP PAST!  ★   ║",
            "╚══════════════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, BANNER_FG, Color::Reset);
        }
        let levels = format!("◈ {} places crossed in {} steps", w.levels.len(), w.steps);
        self.front.put_str(8, 9, &levels, Color::White, Color::Reset);
        self.front.put_str(
            8,
            11,
            "▸ ENTER / ESC: Back to Title",
            Color::Rgb { r: 120, g: 230, b: 120 },
            Color::Reset,
        );
    }
}
