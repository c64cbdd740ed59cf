/// Double-buffered, diff-based terminal renderer.
///
/// Each frame is composed into `front`, compared cell by cell with `back`
/// (the previous frame), and only changed cells are written. Commands are
/// batched with `queue!` and flushed once, then the buffers swap.
///
/// Layers, bottom to top: HUD, map (terrain, tiles, pickups, door, player,
/// effect flashes), then whatever panels the presenter has visible.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{CollectibleKind, PlatformKind, Vec2};
use crate::domain::tile::Tile;
use crate::sim::bridge::{EffectKind, PanelId};
use crate::sim::controller::{LevelController, Phase};
use crate::sim::world::Scene;
use crate::ui::presenter::TerminalPresenter;

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 8],
    ch_len: u8,
    fg: Color,
    bg: Color,
    /// Occupies two terminal columns.
    wide: bool,
    /// Right half of a wide cell; never printed.
    cont: bool,
}

impl Cell {
    /// Explicit background for every cell, so terminals that paint row gaps
    /// with the last clear color show no seams.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 20, b: 30 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell { ch: [0; 8], ch_len: 0, cont: true, ..Cell::BLANK };

    /// Differs from any real cell; filling `back` with it forces a repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    fn new(c: char, fg: Color, bg: Color, wide: bool) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        cell.wide = wide;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer ──

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
            *self = FrameBuffer::new(w, h);
        }
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
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell::new(ch, fg, bg, false));
        }
    }

    /// One map cell = two terminal columns: a wide glyph or two narrow ones.
    fn put_glyph(&mut self, col: usize, row: usize, glyph: Glyph) {
        match glyph {
            Glyph::Wide(c, fg) => {
                self.set(col, row, Cell::new(c, fg, Color::Reset, true));
                self.set(col + 1, row, Cell::WIDE_CONT);
            }
            Glyph::Pair(c, fg, bg) => {
                self.set(col, row, Cell::new(c, fg, bg, false));
                self.set(col + 1, row, Cell::new(c, fg, bg, false));
            }
        }
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::new(' ', Color::White, bg, false));
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Glyph {
    Wide(char, Color),
    Pair(char, Color, Color),
}

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const GOLD: Color = Color::Rgb { r: 255, g: 210, b: 60 };
const GREEN: Color = Color::Rgb { r: 90, g: 230, b: 110 };
const RED: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const PANEL_BG: Color = Color::Rgb { r: 38, g: 40, b: 58 };

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
        self.fit_terminal();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Returns true when the size changed (and `back` was invalidated).
    fn fit_terminal(&mut self) -> bool {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let (tw, th) = (tw as usize, th as usize);
        if tw == self.term_w && th == self.term_h {
            return false;
        }
        self.term_w = tw;
        self.term_h = th;
        self.front.resize(tw, th);
        self.back.resize(tw, th);
        self.back.cells.fill(Cell::INVALID);
        true
    }

    pub fn render(&mut self, scene: &Scene, ctrl: &LevelController, ui: &TerminalPresenter) -> io::Result<()> {
        let resized = self.fit_terminal();
        let phase_changed = self.last_phase != Some(ctrl.phase());
        if resized || phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(ctrl.phase());
        }

        self.front.cells.fill(Cell::BLANK);
        match ctrl.phase() {
            Phase::MainMenu => self.compose_title(),
            Phase::GameComplete => self.compose_game_complete(ctrl),
            _ => {
                self.compose_hud(scene, ctrl);
                self.compose_map(scene, ui);
            }
        }
        self.compose_panels(ui);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // No ResetColor: the terminal default may differ from BASE_BG
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                if cell.cont {
                    x += 1;
                    continue;
                }
                let cont_changed = cell.wide && self.front.get(x + 1, y) != self.back.get(x + 1, y);
                if cell == self.back.get(x, y) && !cont_changed {
                    x += 1;
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.as_str()))?;

                x += if cell.wide { 2 } else { 1 };
                cursor_at = Some((x, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, scene: &Scene, ctrl: &LevelController) {
        let rules = ctrl.rules();
        let picked = match rules.max_collectibles {
            Some(max) => format!("{}/{}", ctrl.collected(), max),
            None => ctrl.collected().to_string(),
        };
        let mut hud = format!(" {}  ◈ apples {}", scene.name, picked);
        if let Some(max) = rules.max_collapsed_tiles {
            hud.push_str(&format!("  ◈ broken {}/{}", ctrl.collapsed_tiles(), max));
        }
        if !ctrl.can_exit() {
            hud.push_str("  ◈ door shut");
        }
        self.front.put_str(0, HUD_ROW, &hud, GOLD, Color::Reset);

        let help = " ←→/AD walk  SPACE jump  ESC pause";
        self.front.put_str(0, self.term_h.saturating_sub(1), help, Color::DarkGrey, Color::Reset);
    }

    /// Leftmost map column shown, keeping the player in view.
    fn camera_x(&self, scene: &Scene) -> usize {
        let view = self.term_w / CELL_W;
        if scene.width <= view {
            return 0;
        }
        let px = scene.player.as_ref().map_or(0.0, |p| p.pos.x.max(0.0)) as usize;
        px.saturating_sub(view / 2).min(scene.width - view)
    }

    fn compose_map(&mut self, scene: &Scene, ui: &TerminalPresenter) {
        let cam = self.camera_x(scene);
        let view_rows = self.term_h.saturating_sub(MAP_ROW + 2).min(scene.height);

        for row in 0..view_rows {
            for gx in cam..scene.width {
                let col = (gx - cam) * CELL_W;
                if col + 1 >= self.term_w {
                    break;
                }
                if scene.tiles[row][gx] == Tile::Ground {
                    self.front.put_glyph(col, MAP_ROW + row, Glyph::Pair('█', Color::Rgb { r: 120, g: 90, b: 60 }, Color::Reset));
                }
            }
        }

        let draw = |front: &mut FrameBuffer, pos: Vec2, glyph: Glyph| {
            if let Some((col, row)) = screen_cell(scene, pos, cam) {
                if row < view_rows && col + 1 < front.width {
                    front.put_glyph(col, MAP_ROW + row, glyph);
                }
            }
        };

        for p in scene.platforms.values().filter(|p| p.visible) {
            let glyph = match p.kind {
                PlatformKind::Crumbling => Glyph::Pair('▒', Color::Rgb { r: 190, g: 140, b: 90 }, Color::Reset),
                PlatformKind::Vanishing => Glyph::Pair('░', Color::Rgb { r: 140, g: 200, b: 255 }, Color::Reset),
                PlatformKind::Sliding => Glyph::Pair('═', Color::Rgb { r: 200, g: 200, b: 220 }, Color::Reset),
            };
            draw(&mut self.front, p.pos, glyph);
        }
        for c in scene.collectibles.values().filter(|c| c.visible) {
            let glyph = match c.kind {
                CollectibleKind::Normal => Glyph::Wide('🍎', RED),
                CollectibleKind::Poison => Glyph::Wide('🍏', GREEN),
            };
            draw(&mut self.front, c.pos, glyph);
        }
        if let Some(door) = scene.door.as_ref().filter(|d| d.visible) {
            draw(&mut self.front, door.pos, Glyph::Wide('🚪', GOLD));
        }
        if let Some(player) = scene.player.as_ref().filter(|p| p.is_visible()) {
            draw(&mut self.front, player.pos, Glyph::Wide('🏃', Color::White));
        }
        for flash in ui.flashes() {
            let color = match flash.kind {
                EffectKind::Death | EffectKind::Poison => RED,
                EffectKind::Collect => GOLD,
                EffectKind::Collapse => Color::Rgb { r: 190, g: 140, b: 90 },
                EffectKind::Exit => GREEN,
            };
            draw(&mut self.front, flash.pos, Glyph::Pair('✦', color, Color::Reset));
        }
    }

    fn compose_title(&mut self) {
        let title = [
            r" ___  _     _     _ _       ___                         ",
            r"| _ \(_) __| | __| | | ___ | _ \ _  _  _ _   _ _   ___  _ _ ",
            r"|   /| |/ _` |/ _` | |/ -_)|   /| || || ' \ | ' \ / -_)| '_|",
            r"|_|_\|_|\__,_|\__,_|_|\___||_|_\ \_,_||_||_||_||_|\___||_|  ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, GOLD, Color::Reset);
        }
        self.front.put_str(4, 8, "Read the riddle. Mind the apples. Find the door.", GREEN, Color::Reset);
        self.front.put_str(8, 11, "ENTER   Start", Color::White, Color::Reset);
        self.front.put_str(8, 12, "  Q     Quit", Color::White, Color::Reset);
    }

    fn compose_game_complete(&mut self, ctrl: &LevelController) {
        let lines = [
            "╔══════════════════════════════════╗",
            "║   ★  EVERY RIDDLE SOLVED!  ★     ║",
            "╚══════════════════════════════════╝",
        ];
        for (i, l) in lines.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, GOLD, Color::Reset);
        }
        let cleared = format!("◈ {} levels cleared", ctrl.table().final_level());
        self.front.put_str(6, 9, &cleared, GREEN, Color::Reset);
        self.front.put_str(6, 11, "▸ Q: Quit", Color::White, Color::Reset);
    }

    fn compose_panels(&mut self, ui: &TerminalPresenter) {
        if ui.is_shown(PanelId::Intro) {
            let text = ui.panel_text(PanelId::Intro).unwrap_or("");
            self.compose_box("RIDDLE", text, "ENTER to begin", GOLD);
        }
        if ui.is_shown(PanelId::Death) {
            let text = ui.panel_text(PanelId::Death).unwrap_or("You died.");
            self.compose_box("YOU DIED", text, "press any key", RED);
        }
        if ui.is_shown(PanelId::Pause) {
            self.compose_box("PAUSED", "ESC resume   R restart   M menu   Q quit", "", Color::Rgb { r: 100, g: 200, b: 255 });
        }
        if let Some(text) = ui.panel_text(PanelId::Message) {
            let row = self.term_h.saturating_sub(2);
            let msg = format!(" ◈ {} ", text);
            self.front.fill(0, row, self.term_w, 1, GOLD);
            self.front.put_str(0, row, &msg, Color::Black, GOLD);
        }
    }

    /// Centred panel: title bar, wrapped body, optional footer.
    fn compose_box(&mut self, title: &str, body: &str, footer: &str, accent: Color) {
        let box_w = 44.min(self.term_w);
        let inner = box_w.saturating_sub(4).max(1);
        let lines = wrap(body, inner);
        let box_h = lines.len() + if footer.is_empty() { 4 } else { 6 };
        let x = self.term_w.saturating_sub(box_w) / 2;
        let y = MAP_ROW + self.term_h.saturating_sub(MAP_ROW + box_h) / 2;

        self.front.fill(x, y, box_w, box_h, PANEL_BG);
        let tx = x + box_w.saturating_sub(title.chars().count()) / 2;
        self.front.put_str(tx, y + 1, title, accent, PANEL_BG);
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x + 2, y + 3 + i, line, Color::White, PANEL_BG);
        }
        if !footer.is_empty() {
            self.front.put_str(x + 2, y + 4 + lines.len(), footer, Color::DarkGrey, PANEL_BG);
        }
    }
}

/// Map a world position to (terminal column, map row), y-up world.
fn screen_cell(scene: &Scene, pos: Vec2, cam: usize) -> Option<(usize, usize)> {
    let gx = pos.x.round();
    let gy = pos.y.round();
    if gx < cam as f32 || gy < 0.0 || gy >= scene.height as f32 {
        return None;
    }
    let row = scene.height - 1 - gy as usize;
    Some(((gx as usize - cam) * CELL_W, row))
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
            if needed > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}
