// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Diagnostic hex-dump helper (SPEC_FULL §4.8, resolving spec.md Open
//! Question (b)). Deliberately reproduces the original framework's
//! printable-range cutoff, `32 < b < 128`, rather than the more
//! conventional `0x20..=0x7E`: it excludes space and includes DEL as
//! non-printable, which isn't standard but is what bit-for-bit compatible
//! diagnostic output requires.

/// Renders `data` as `offset  hex bytes  ascii` rows, 16 bytes per row.
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4);
    for (row, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}  ", row * 16));
        for (i, byte) in chunk.iter().enumerate() {
            out.push_str(&format!("{byte:02x} "));
            if i == 7 {
                out.push(' ');
            }
        }
        let missing = 16usize.saturating_sub(chunk.len());
        for _ in 0..missing {
            out.push_str("   ");
        }
        out.push_str(" |");
        for &byte in chunk {
            out.push(printable_or_dot(byte));
        }
        out.push_str("|\n");
    }
    out
}

fn printable_or_dot(b: u8) -> char {
    if b > 32 && b < 128 {
        b as char
    } else {
        '.'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_and_del_are_rendered_as_dots() {
        let dump = hexdump(&[b' ', 0x7F, b'A']);
        let ascii = dump.split('|').nth(1).expect("ascii column");
        assert_eq!(ascii, "..A");
    }

    #[test]
    fn printable_range_matches_printables() {
        assert_eq!(printable_or_dot(b'0'), '0');
        assert_eq!(printable_or_dot(0x20), '.');
        assert_eq!(printable_or_dot(0x7F), '.');
        assert_eq!(printable_or_dot(0x21), '!');
    }
}
