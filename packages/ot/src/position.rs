//! Conversion between flat char offsets and line/column pairs.
//!
//! `\r\n`, `\r` and `\n` all end a line. Offsets count chars, so a `\r\n`
//! separator occupies two positions.

use serde::Serialize;
use std::fmt;

/// 0-based line and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineCh {
    pub line: usize,
    pub ch: usize,
}

impl LineCh {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

impl fmt::Display for LineCh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.ch + 1)
    }
}

/// Line/column of `pos`. Offsets past the end map to the end of the text.
pub fn pos_to_line_ch(text: &str, pos: usize) -> LineCh {
    let mut line = 0;
    let mut ch = 0;

    let mut chars = text.chars().take(pos).peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                // A lone `\r` ends the line; in `\r\n` the `\n` does
                if chars.peek() == Some(&'\n') {
                    ch += 1;
                } else {
                    line += 1;
                    ch = 0;
                }
            }
            '\n' => {
                line += 1;
                ch = 0;
            }
            _ => ch += 1,
        }
    }

    LineCh { line, ch }
}

/// Offset of `line_ch`. Columns past the end of a line clamp to the line
/// end, lines past the end clamp to the end of the text.
pub fn line_ch_to_pos(text: &str, line_ch: LineCh) -> usize {
    let mut pos = 0;
    let mut line = 0;

    let mut chars = text.chars().peekable();
    while line < line_ch.line {
        match chars.next() {
            Some('\r') => {
                pos += 1;
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    pos += 1;
                }
                line += 1;
            }
            Some('\n') => {
                pos += 1;
                line += 1;
            }
            Some(_) => pos += 1,
            None => return pos,
        }
    }

    let line_len = chars.take_while(|c| *c != '\r' && *c != '\n').count();
    pos + line_ch.ch.min(line_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_to_line_ch() {
        let text = "ab\ncd\r\nef\rg";

        assert_eq!(pos_to_line_ch(text, 0), LineCh::new(0, 0));
        assert_eq!(pos_to_line_ch(text, 2), LineCh::new(0, 2));
        assert_eq!(pos_to_line_ch(text, 3), LineCh::new(1, 0));
        assert_eq!(pos_to_line_ch(text, 7), LineCh::new(2, 0));
        assert_eq!(pos_to_line_ch(text, 10), LineCh::new(3, 0));
        assert_eq!(pos_to_line_ch(text, 99), LineCh::new(3, 1));
    }

    #[test]
    fn test_line_ch_to_pos() {
        let text = "ab\ncd\r\nef\rg";

        assert_eq!(line_ch_to_pos(text, LineCh::new(0, 1)), 1);
        assert_eq!(line_ch_to_pos(text, LineCh::new(1, 1)), 4);
        assert_eq!(line_ch_to_pos(text, LineCh::new(2, 0)), 7);
        assert_eq!(line_ch_to_pos(text, LineCh::new(3, 0)), 10);
        assert_eq!(line_ch_to_pos(text, LineCh::new(1, 40)), 5);
        assert_eq!(line_ch_to_pos(text, LineCh::new(9, 0)), 11);
    }

    #[test]
    fn test_conversions_agree_on_multibyte_text() {
        let text = "한글\n🦀 rust";
        for pos in 0..=text.chars().count() {
            assert_eq!(line_ch_to_pos(text, pos_to_line_ch(text, pos)), pos);
        }
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(LineCh::new(0, 4).to_string(), "1:5");
    }
}
