//! Software-rendered preview window using `minifb`.
//!
//! Layout (frame-sized window):
//!
//! ```text
//! ┌────────────────────────┬────────────────────────┐
//! │ LEFT  ■ ■ ■            ┆            ■ ■ ■ RIGHT │
//! │                        ┆                        │
//! │    ( hand )   •  →     ┆     ←  •   ( hand )    │
//! │                        ┆                        │
//! │        [ priming bar / banner ]                 │
//! │ key legend                                      │
//! └────────────────────────┴────────────────────────┘
//! ```
//!
//! The window only reads [`ArenaSnapshot`]s; keyboard input is forwarded to
//! the simulated pose source as [`SimInput`].

use std::sync::mpsc::Sender;

use enum_map::EnumMap;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use duel_core::{HandPose, Point, Side};

use crate::error::ArenaError;
use crate::source::SimInput;
use crate::worker::ArenaSnapshot;

// ════════════════════════════════════════════════════════════════════════════
// Palette
// ════════════════════════════════════════════════════════════════════════════

const BG_COLOR:      u32 = 0xFF1A1A2E;
const MIDLINE_COLOR: u32 = 0xFF3A3A5E;
const LEFT_COLOR:    u32 = 0xFF4FC3F7;
const RIGHT_COLOR:   u32 = 0xFFFF8A65;
const HP_EMPTY:      u32 = 0xFF444444;
const PRIMED_COLOR:  u32 = 0xFFFFD700;  // gold
const TEXT_BG:       u32 = 0xFF0F3460;
const TEXT_COLOR:    u32 = 0xFFEEEEEE;

/// Pixels a hand moves per key repeat.
const NUDGE_PX: f32 = 8.0;

fn side_color(side: Side) -> u32 {
    match side {
        Side::Left  => LEFT_COLOR,
        Side::Right => RIGHT_COLOR,
    }
}

/// What the window wants from the app after polling input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    None,
    Reset,
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:   Window,
    canvas:   Canvas,
    sim_tx:   Sender<SimInput>,
    /// Trigger keys held on the previous poll, to send only changes.
    triggers: EnumMap<Side, bool>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, width: usize, height: usize) -> Result<Self, ArenaError> {
        let mut window = Window::new(
            "Gun Duel — prime with both fingers up, flick to fire",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| ArenaError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(width, height),
            sim_tx,
            triggers: EnumMap::default(),
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard inputs and translate to SimInput events.
    pub fn poll_input(&mut self) -> WindowEvent {
        if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            return WindowEvent::Quit;
        }

        // Keys that trigger on first press only
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        // Keys that repeat while held
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        let mut inputs = Vec::new();
        if one_shot(Key::Key1) { inputs.push(SimInput::ToggleHand(Side::Left)); }
        if one_shot(Key::Key0) { inputs.push(SimInput::ToggleHand(Side::Right)); }
        if held(Key::W)    { inputs.push(SimInput::Nudge { side: Side::Left,  dy: -NUDGE_PX }); }
        if held(Key::S)    { inputs.push(SimInput::Nudge { side: Side::Left,  dy:  NUDGE_PX }); }
        if held(Key::Up)   { inputs.push(SimInput::Nudge { side: Side::Right, dy: -NUDGE_PX }); }
        if held(Key::Down) { inputs.push(SimInput::Nudge { side: Side::Right, dy:  NUDGE_PX }); }
        let reset = one_shot(Key::R);

        // Triggers are level-sensitive: report press and release.
        for (side, key) in [(Side::Left, Key::D), (Side::Right, Key::Left)] {
            let pulled = self.window.is_key_down(key);
            if pulled != self.triggers[side] {
                self.triggers[side] = pulled;
                inputs.push(SimInput::Trigger { side, pulled });
            }
        }

        for input in inputs {
            // The source may be hardware-backed and not listening.
            let _ = self.sim_tx.send(input);
        }
        if reset { WindowEvent::Reset } else { WindowEvent::None }
    }

    /// Render one frame.
    pub fn render(&mut self, snap: &ArenaSnapshot) {
        self.canvas.draw_snapshot(snap);
        let (w, h) = (self.canvas.width, self.canvas.height);
        self.window.update_with_buffer(&self.canvas.buf, w, h).ok();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the pixel buffer, kept apart from the window for testing
// ════════════════════════════════════════════════════════════════════════════

struct Canvas {
    buf:    Vec<u32>,
    width:  usize,
    height: usize,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; width * height], width, height }
    }

    fn draw_snapshot(&mut self, snap: &ArenaSnapshot) {
        let status = &snap.status;
        self.buf.fill(BG_COLOR);

        // ── Centre line ───────────────────────────────────────────────────
        let mid = self.width / 2;
        for y in (0..self.height).step_by(6) {
            self.fill_rect(mid, y, 1, 3, MIDLINE_COLOR);
        }

        // ── Hands ─────────────────────────────────────────────────────────
        for hand in &snap.hands {
            let side = hand.side(self.width as f32);
            let color = if status.is_primed { PRIMED_COLOR } else { side_color(side) };
            self.draw_hand(hand, color);
        }

        // ── Projectiles ───────────────────────────────────────────────────
        for p in &snap.projectiles {
            self.fill_circle(p.position, 4, side_color(p.owner));
        }

        // ── HP pips ───────────────────────────────────────────────────────
        self.draw_label("LEFT", 10, 10, LEFT_COLOR);
        self.draw_label("RIGHT", self.width.saturating_sub(30), 10, RIGHT_COLOR);
        for i in 0..snap.full_hp as usize {
            let l = if i < status.left_hp as usize  { LEFT_COLOR }  else { HP_EMPTY };
            let r = if i < status.right_hp as usize { RIGHT_COLOR } else { HP_EMPTY };
            self.fill_rect(10 + i * 14, 20, 10, 10, l);
            self.fill_rect(self.width.saturating_sub(20 + i * 14), 20, 10, 10, r);
        }

        // ── Banner ────────────────────────────────────────────────────────
        let banner_y = self.height.saturating_sub(60);
        let text = match (status.winning_side, status.is_playing) {
            (Some(w), _) => format!("{} WINS - PRIME TO REMATCH", w.name().to_uppercase()),
            (None, true) => "FIGHT".to_string(),
            (None, false) if status.is_primed => "HOLD...".to_string(),
            (None, false) => "RAISE BOTH INDEX FINGERS".to_string(),
        };
        self.fill_rect(0, banner_y, self.width, 20, TEXT_BG);
        self.draw_label(&text, 10, banner_y + 8, TEXT_COLOR);

        if snap.hold_progress > 0.0 {
            let bar = ((self.width - 20) as f32 * snap.hold_progress) as usize;
            self.fill_rect(10, banner_y + 22, bar, 4, PRIMED_COLOR);
        }

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "1/0=hand  W/S Up/Down=move  D/Left=fire  R=reset  Esc=quit",
            10, self.height.saturating_sub(16), 0xFF888888,
        );
    }

    fn draw_hand(&mut self, hand: &HandPose, color: u32) {
        let radius = hand.hitbox_radius().round() as usize;
        self.draw_circle(hand.secondary_base_pos, radius, color);
        self.draw_line(hand.wrist_pos, hand.finger_base_pos, color);
        self.draw_line(hand.finger_base_pos, hand.fingertip_pos, color);
        self.fill_circle(hand.fingertip_pos, 3, TEXT_COLOR);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(self.height) {
            for col in x..(x+w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    fn fill_circle(&mut self, c: Point, r: usize, color: u32) {
        let (cx, cy, r) = (c.x as isize, c.y as isize, r as isize);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Midpoint circle outline.
    fn draw_circle(&mut self, c: Point, r: usize, color: u32) {
        let (cx, cy) = (c.x as isize, c.y as isize);
        let (mut x, mut y, mut err) = (r as isize, 0isize, 1 - r as isize);
        while x >= y {
            for &(px, py) in &[(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
                self.set_pixel(cx + px, cy + py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    fn draw_line(&mut self, a: Point, b: Point, color: u32) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            self.set_pixel(x as isize, y as isize, color);
        }
    }

    /// Minimal bitmap font — 3×5 characters for labels.
    /// Each character is encoded as 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel((cx + col) as isize, (y + row) as isize, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > self.width { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{DuelConfig, DuelEngine, Projectile};
    use crate::source::sim_hand_pose;

    fn pixel(c: &Canvas, p: Point) -> u32 {
        c.buf[p.y as usize * c.width + p.x as usize]
    }

    fn idle(starting_hp: u8) -> ArenaSnapshot {
        ArenaSnapshot::idle(&DuelEngine::new(DuelConfig { starting_hp, ..DuelConfig::default() }))
    }

    #[test]
    fn projectile_is_drawn_in_its_owner_colour() {
        let mut c = Canvas::new(640, 480);
        let snap = ArenaSnapshot {
            projectiles: vec![Projectile::fire(Side::Right, Point::new(300.0, 200.0), 20.0)],
            ..idle(3)
        };
        c.draw_snapshot(&snap);
        assert_eq!(pixel(&c, Point::new(300.0, 200.0)), RIGHT_COLOR);
    }

    #[test]
    fn hands_turn_gold_when_primed() {
        let mut c = Canvas::new(640, 480);
        let hand = sim_hand_pose(Side::Left, Point::new(128.0, 240.0), false);
        let mut snap = ArenaSnapshot { hands: vec![hand], ..idle(3) };
        c.draw_snapshot(&snap);
        assert_eq!(pixel(&c, hand.wrist_pos), LEFT_COLOR);

        snap.status.is_primed = true;
        c.draw_snapshot(&snap);
        assert_eq!(pixel(&c, hand.wrist_pos), PRIMED_COLOR);
    }

    #[test]
    fn lost_hp_pips_are_greyed() {
        let mut c = Canvas::new(640, 480);
        let mut snap = idle(3);
        snap.status.left_hp = 1;
        c.draw_snapshot(&snap);
        assert_eq!(pixel(&c, Point::new(12.0, 22.0)), LEFT_COLOR);
        assert_eq!(pixel(&c, Point::new(26.0, 22.0)), HP_EMPTY);
    }

    #[test]
    fn pip_row_always_shows_the_full_hp() {
        let mut c = Canvas::new(640, 480);
        let mut snap = idle(5);
        snap.status.left_hp = 1;
        snap.status.right_hp = 1;
        c.draw_snapshot(&snap);
        // Fifth pip still drawn, greyed.
        assert_eq!(pixel(&c, Point::new(68.0, 22.0)), HP_EMPTY);

        let single = idle(1);
        c.draw_snapshot(&single);
        assert_eq!(pixel(&c, Point::new(12.0, 22.0)), LEFT_COLOR);
        assert_eq!(pixel(&c, Point::new(26.0, 22.0)), BG_COLOR);
    }

    #[test]
    fn shapes_past_the_edge_are_clipped() {
        let mut c = Canvas::new(64, 48);
        c.fill_circle(Point::new(-5.0, -5.0), 20, LEFT_COLOR);
        c.draw_circle(Point::new(60.0, 40.0), 30, LEFT_COLOR);
        c.draw_line(Point::new(-100.0, 10.0), Point::new(100.0, 10.0), LEFT_COLOR);
        assert_eq!(c.buf.len(), 64 * 48);
    }
}
