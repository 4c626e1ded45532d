//! Text helpers for the standard Helvetica font.
//!
//! Output documents only use the base-14 Helvetica face with
//! `WinAnsiEncoding`, so no font program is embedded. Widths come from the
//! Helvetica AFM metrics and drive word wrapping.

pub const FONT_RESOURCE: &str = "F1";
pub const BASE_FONT: &str = "Helvetica";

/// Advance widths for `' '..='~'`, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

fn char_width(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - ' ' as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Width of `text` in points at `font_size`.
pub fn string_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    units as f32 * font_size / 1000.0
}

/// Encode `text` for a `WinAnsiEncoding` font. Characters outside the
/// encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if c.is_control() => b'?',
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Break `text` into lines no wider than `max_width` points. Explicit line
/// breaks are kept; words longer than a line are split at characters.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space_width = string_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_width = 0.0f32;

        for word in paragraph.split_whitespace() {
            let word_width = string_width(word, font_size);

            if word_width > max_width {
                if !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                }
                let mut chunk = String::new();
                let mut chunk_width = 0.0f32;
                for c in word.chars() {
                    let width = f32::from(char_width(c)) * font_size / 1000.0;
                    if chunk_width + width > max_width && !chunk.is_empty() {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_width = 0.0;
                    }
                    chunk.push(c);
                    chunk_width += width;
                }
                current_line = chunk;
                current_width = chunk_width;
                continue;
            }

            if current_line.is_empty() {
                current_line.push_str(word);
                current_width = word_width;
            } else if current_width + space_width + word_width <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
                current_width += space_width + word_width;
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
                current_width = word_width;
            }
        }

        lines.push(current_line);
    }

    lines
}
