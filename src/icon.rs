//! Tray icon pixels.
//!
//! Labels use a built-in 5x7 bitmap font, white with a one-pixel black
//! outline so they stay readable on light and dark taskbars. Ninja mode uses a
//! 3x3 grid: letters A-H sit on the outer ring clockwise from the top-left
//! cell and the centre cell is the "processing" marker.

use image::{Rgba, RgbaImage};

use crate::constants::indicator::ICON_SIZE;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 3;
const GLYPH_SPACING: u32 = 3;
const PADDING: u32 = 4;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Letters that have a dot position, in ring order.
const DOT_RING: [(char, DotCell); 8] = [
    ('A', DotCell { col: 0, row: 0 }),
    ('B', DotCell { col: 1, row: 0 }),
    ('C', DotCell { col: 2, row: 0 }),
    ('D', DotCell { col: 2, row: 1 }),
    ('E', DotCell { col: 2, row: 2 }),
    ('F', DotCell { col: 1, row: 2 }),
    ('G', DotCell { col: 0, row: 2 }),
    ('H', DotCell { col: 0, row: 1 }),
];

const MARKER_CELL: DotCell = DotCell { col: 1, row: 1 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotCell {
    pub col: u8,
    pub row: u8,
}

/// Grid position of an answer letter, if it has one.
pub fn dot_cell(letter: char) -> Option<DotCell> {
    let letter = letter.to_ascii_uppercase();
    DOT_RING
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|(_, cell)| *cell)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconFace {
    Label(String),
    Dots { lit: Vec<DotCell>, marker: bool },
}

impl IconFace {
    /// One dot per distinct A-H letter in `answer`, in answer order.
    pub fn dots(answer: &str, marker: bool) -> Self {
        let mut lit = Vec::new();
        for cell in answer.chars().filter_map(dot_cell) {
            if !lit.contains(&cell) {
                lit.push(cell);
            }
        }
        IconFace::Dots { lit, marker }
    }

    pub fn render(&self) -> RgbaImage {
        match self {
            IconFace::Label(text) => render_label(text),
            IconFace::Dots { lit, marker } => render_dots(lit, *marker),
        }
    }
}

/// Rows of a glyph, high bit on the left. Unsupported characters fall back to `?`.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ' ' => [0; 7],
        _ => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
    }
}

/// Width of a label icon holding `chars` glyphs.
pub fn label_width(chars: u32) -> u32 {
    let glyphs = chars.max(1);
    PADDING * 2 + glyphs * GLYPH_WIDTH * GLYPH_SCALE + (glyphs - 1) * GLYPH_SPACING
}

fn render_label(text: &str) -> RgbaImage {
    let chars: Vec<char> = text.chars().collect();
    let width = label_width(chars.len() as u32);
    let height = ICON_SIZE;

    // Rasterize the glyph mask first, then outline it
    let mut mask = vec![false; (width * height) as usize];
    let top = (height - GLYPH_HEIGHT * GLYPH_SCALE) / 2;

    for (i, c) in chars.iter().enumerate() {
        let left = PADDING + i as u32 * (GLYPH_WIDTH * GLYPH_SCALE + GLYPH_SPACING);
        for (row, bits) in glyph(*c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = left + col * GLYPH_SCALE;
                let y0 = top + row as u32 * GLYPH_SCALE;
                for y in y0..y0 + GLYPH_SCALE {
                    for x in x0..x0 + GLYPH_SCALE {
                        mask[(y * width + x) as usize] = true;
                    }
                }
            }
        }
    }

    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for y in 0..height {
        for x in 0..width {
            if mask[(y * width + x) as usize] {
                img.put_pixel(x, y, WHITE);
            } else if touches_mask(&mask, width, height, x, y) {
                img.put_pixel(x, y, BLACK);
            }
        }
    }
    img
}

fn touches_mask(mask: &[bool], width: u32, height: u32, x: u32, y: u32) -> bool {
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            if mask[(ny as u32 * width + nx as u32) as usize] {
                return true;
            }
        }
    }
    false
}

/// Centre of a grid cell in a square icon.
pub fn cell_center(cell: DotCell) -> (u32, u32) {
    let pitch = ICON_SIZE / 3;
    let offset = pitch / 2 + (ICON_SIZE - pitch * 3) / 2;
    (
        offset + cell.col as u32 * pitch,
        offset + cell.row as u32 * pitch,
    )
}

fn render_dots(lit: &[DotCell], marker: bool) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, Rgba([0, 0, 0, 0]));
    let radius = ICON_SIZE / 8;

    for cell in lit {
        let (cx, cy) = cell_center(*cell);
        draw_circle(&mut img, cx, cy, radius + 1, BLACK);
        draw_circle(&mut img, cx, cy, radius, WHITE);
    }

    if marker {
        let (cx, cy) = cell_center(MARKER_CELL);
        draw_circle(&mut img, cx, cy, radius / 2 + 1, BLACK);
        draw_circle(&mut img, cx, cy, radius / 2, WHITE);
    }
    img
}

fn draw_circle(img: &mut RgbaImage, cx: u32, cy: u32, radius: u32, color: Rgba<u8>) {
    let width = img.width();
    let height = img.height();
    let r_sq = (radius * radius) as i32;

    for dy in -(radius as i32)..=(radius as i32) {
        for dx in -(radius as i32)..=(radius as i32) {
            if dx * dx + dy * dy > r_sq {
                continue;
            }
            let px = cx as i32 + dx;
            let py = cy as i32 + dy;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_cells_for_ac() {
        assert_eq!(
            IconFace::dots("AC", false),
            IconFace::Dots {
                lit: vec![DotCell { col: 0, row: 0 }, DotCell { col: 2, row: 0 }],
                marker: false,
            }
        );
    }

    #[test]
    fn test_dots_skip_unknown_and_repeated_letters() {
        match IconFace::dots("aaZ#h", true) {
            IconFace::Dots { lit, marker } => {
                assert_eq!(lit, vec![DotCell { col: 0, row: 0 }, DotCell { col: 0, row: 1 }]);
                assert!(marker);
            }
            other => panic!("Expected dots, got {:?}", other),
        }
    }

    #[test]
    fn test_ring_positions_are_distinct_and_avoid_marker() {
        let cells: Vec<DotCell> = "ABCDEFGH".chars().filter_map(dot_cell).collect();
        assert_eq!(cells.len(), 8);
        for (i, a) in cells.iter().enumerate() {
            assert_ne!(*a, MARKER_CELL);
            assert!(cells[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn test_label_grows_with_text() {
        let one = IconFace::Label("A".to_string()).render();
        let two = IconFace::Label("AC".to_string()).render();
        assert_eq!(one.height(), ICON_SIZE);
        assert_eq!(two.width(), one.width() + GLYPH_WIDTH * GLYPH_SCALE + GLYPH_SPACING);
    }

    #[test]
    fn test_label_has_white_core_and_black_outline() {
        let img = IconFace::Label("I".to_string()).render();
        let pixels: Vec<&Rgba<u8>> = img.pixels().collect();
        assert!(pixels.iter().any(|p| **p == WHITE));
        assert!(pixels.iter().any(|p| **p == BLACK));
    }

    #[test]
    fn test_lit_dots_are_drawn() {
        let img = IconFace::dots("AC", false).render();
        let (ax, ay) = cell_center(DotCell { col: 0, row: 0 });
        let (cx, cy) = cell_center(DotCell { col: 2, row: 0 });
        let (mx, my) = cell_center(MARKER_CELL);

        assert_eq!(*img.get_pixel(ax, ay), WHITE);
        assert_eq!(*img.get_pixel(cx, cy), WHITE);
        assert_eq!(img.get_pixel(mx, my)[3], 0);
    }

    #[test]
    fn test_empty_label_still_has_size() {
        let img = IconFace::Label(String::new()).render();
        assert!(img.width() > 0);
    }
}
