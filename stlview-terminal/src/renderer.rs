/// Presentation of a rendered framebuffer as terminal cells
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use stlview_core::Framebuffer;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: char = '\u{2580}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Two truecolor pixels per cell
    HalfBlock,
    /// Two pixels per cell blended into one luminosity ramp character
    Ascii,
}

/// Framebuffer pixels stacked in one terminal cell. Cells are roughly twice
/// as tall as wide, so this keeps framebuffer pixels square.
pub const PIXELS_PER_CELL: u32 = 2;

impl PresentMode {
    /// Framebuffer rows needed for `rows` terminal lines
    pub fn pixel_rows(self, rows: u16) -> u32 {
        rows as u32 * PIXELS_PER_CELL
    }
}

fn to_term_color(c: stlview_core::Color) -> Color {
    let [r, g, b] = c.to_rgb8();
    Color::Rgb { r, g, b }
}

/// Draw `framebuffer` starting at terminal row `top`.
pub fn present<W: Write + ?Sized>(
    framebuffer: &Framebuffer,
    mode: PresentMode,
    top: u16,
    writer: &mut W,
) -> std::io::Result<()> {
    match mode {
        PresentMode::HalfBlock => present_half_blocks(framebuffer, top, writer)?,
        PresentMode::Ascii => present_ascii(framebuffer, top, writer)?,
    }
    writer.queue(ResetColor)?;
    Ok(())
}

fn present_half_blocks<W: Write + ?Sized>(
    framebuffer: &Framebuffer,
    top: u16,
    writer: &mut W,
) -> std::io::Result<()> {
    let rows = framebuffer.height() / PIXELS_PER_CELL;
    for row in 0..rows {
        writer.queue(cursor::MoveTo(0, top + row as u16))?;
        let mut current: Option<(Color, Color)> = None;
        for x in 0..framebuffer.width() {
            let upper = to_term_color(framebuffer.pixel(x, row * 2));
            let lower = to_term_color(framebuffer.pixel(x, row * 2 + 1));
            // Only emit color changes
            if current != Some((upper, lower)) {
                writer.queue(SetForegroundColor(upper))?;
                writer.queue(SetBackgroundColor(lower))?;
                current = Some((upper, lower));
            }
            writer.queue(Print(HALF_BLOCK))?;
        }
    }
    Ok(())
}

fn present_ascii<W: Write + ?Sized>(
    framebuffer: &Framebuffer,
    top: u16,
    writer: &mut W,
) -> std::io::Result<()> {
    let rows = framebuffer.height() / PIXELS_PER_CELL;
    for row in 0..rows {
        writer.queue(cursor::MoveTo(0, top + row as u16))?;
        for x in 0..framebuffer.width() {
            let c = match cell_luminance(framebuffer, x, row) {
                Some(luminance) => ramp_char(luminance),
                None => ' ',
            };

            // Color based on character intensity
            let color = match c {
                ' ' | '.' | ':' => Color::DarkGrey,
                '-' | '=' => Color::Grey,
                '+' | '*' => Color::White,
                '#' | '%' | '@' => Color::Cyan,
                _ => Color::White,
            };

            writer.queue(SetForegroundColor(color))?;
            writer.queue(Print(c))?;
        }
    }
    Ok(())
}

/// Mean luminance of the covered pixels in a cell, if any are covered
fn cell_luminance(framebuffer: &Framebuffer, x: u32, row: u32) -> Option<f32> {
    let (sum, count) = (row * PIXELS_PER_CELL..(row + 1) * PIXELS_PER_CELL)
        .filter(|&y| framebuffer.is_covered(x, y))
        .fold((0.0, 0u32), |(sum, count), y| {
            (sum + framebuffer.pixel(x, y).luminance(), count + 1)
        });
    (count > 0).then(|| sum / count as f32)
}

fn ramp_char(luminance: f32) -> char {
    let index = (luminance.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_bounds() {
        assert_eq!(ramp_char(0.0), '.');
        assert_eq!(ramp_char(1.0), '@');
        assert_eq!(ramp_char(7.0), '@');
    }

    #[test]
    fn test_pixel_rows() {
        assert_eq!(PresentMode::HalfBlock.pixel_rows(10), 20);
        assert_eq!(PresentMode::Ascii.pixel_rows(10), 20);
    }

    #[test]
    fn test_half_block_output_contains_cells() {
        let mut fb = Framebuffer::new(3, 2);
        fb.clear(stlview_core::Color::from_hex(0xf5f5f5));
        let mut out = Vec::new();
        present(&fb, PresentMode::HalfBlock, 1, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(HALF_BLOCK).count(), 3);
        // Uniform row sets its colors once
        assert_eq!(text.matches("38;2;245;245;245").count(), 1);
    }

    #[test]
    fn test_ascii_background_is_blank() {
        let mut fb = Framebuffer::new(4, 2);
        fb.clear(stlview_core::Color::WHITE);
        let mut out = Vec::new();
        present(&fb, PresentMode::Ascii, 0, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains('@'));
        assert_eq!(text.matches(' ').count(), 4);
    }
}
