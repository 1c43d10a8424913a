//! Line sanitizer: turn one raw input line into terminal-safe, width-bounded text.
//!
//! Truncation is byte oriented: every visible byte counts as one column.
//! In [`SanitizeMode::Passthrough`], escape sequences are copied through
//! without consuming the column budget and a reset is appended so styling
//! never bleeds into the next row.

/// Tab stops are every 8 columns.
const TAB_WIDTH: usize = 8;

/// ESC byte.
const ESC: u8 = 0x1b;

/// SGR reset emitted after passthrough content.
pub const SGR_RESET: &[u8] = b"\x1b[0m";

/// How escape bytes in the input are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeMode {
    /// Every byte is visible; ESC is replaced like any other control byte.
    #[default]
    Plain,
    /// CSI and two-byte escape sequences pass through uncounted.
    Passthrough,
}

impl SanitizeMode {
    /// Pick the mode for a color setting.
    pub const fn for_color(color: bool) -> Self {
        if color {
            Self::Passthrough
        } else {
            Self::Plain
        }
    }
}

/// Sanitize `raw` into a new buffer. See [`sanitize_into`].
pub fn sanitize(raw: &[u8], max_columns: usize, mode: SanitizeMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len().min(max_columns) + SGR_RESET.len());
    sanitize_into(&mut out, raw, max_columns, mode);
    out
}

/// Append the sanitized form of `raw` to `out`.
///
/// - `\n` and `\r` are dropped and never counted.
/// - `\t` expands to spaces up to the next 8-column stop, clipped at `max_columns`.
/// - Other control bytes (`< 0x20`, `0x7f`) become `.`.
/// - Output stops once `max_columns` visible columns were produced.
///
/// Returns the number of visible columns appended.
pub fn sanitize_into(
    out: &mut Vec<u8>,
    raw: &[u8],
    max_columns: usize,
    mode: SanitizeMode,
) -> usize {
    let mut col = 0;
    let mut i = 0;

    while i < raw.len() && col < max_columns {
        let byte = raw[i];
        match byte {
            b'\n' | b'\r' => {}
            b'\t' => {
                let stop = ((col / TAB_WIDTH) + 1) * TAB_WIDTH;
                let end = stop.min(max_columns);
                out.resize(out.len() + (end - col), b' ');
                col = end;
            }
            ESC if mode == SanitizeMode::Passthrough => {
                if let Some(len) = escape_len(&raw[i..]) {
                    out.extend_from_slice(&raw[i..i + len]);
                    i += len;
                    continue;
                }
                out.push(b'.');
                col += 1;
            }
            0x00..=0x1f | 0x7f => {
                out.push(b'.');
                col += 1;
            }
            _ => {
                out.push(byte);
                col += 1;
            }
        }
        i += 1;
    }

    if mode == SanitizeMode::Passthrough {
        out.extend_from_slice(SGR_RESET);
    }

    col
}

/// Length of the escape sequence at the start of `bytes` (which begins with ESC).
///
/// A CSI (`ESC [`) runs through its final byte in `0x40..=0x7e`; a CSI cut
/// short by the end of input or by a control byte is copied as far as it
/// goes. `ESC` plus one printable byte is a two-byte sequence. Anything
/// else is not an escape sequence.
fn escape_len(bytes: &[u8]) -> Option<usize> {
    match bytes.get(1) {
        Some(b'[') => {
            let mut len = 2;
            for &byte in &bytes[2..] {
                if byte < 0x20 || byte == 0x7f {
                    break;
                }
                len += 1;
                if (0x40..=0x7e).contains(&byte) {
                    break;
                }
            }
            Some(len)
        }
        Some(0x20..=0x7e) => Some(2),
        _ => None,
    }
}
