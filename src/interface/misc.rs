// Misc functions for interface
// Literal parsing and argument splitting
use crate::interface::MmapError;

/// Parses an unsigned literal. A leading `0x` selects base 16, anything else is base 10.
pub fn parse_literal(literal: &str) -> Result<u64, MmapError> {
    let (digits, radix) = match literal.strip_prefix("0x") {
        Some(hex) => (hex, 16),
        None => (literal, 10),
    };
    u64::from_str_radix(digits, radix).map_err(|_| MmapError::BadLiteral(literal.to_string()))
}

/// Splits a command argument string on whitespace
pub fn split_args(args: &str) -> Vec<&str> {
    args.split_whitespace().collect()
}

/// Formats bytes as `addr: xx xx ..  |ascii|` lines of 16 bytes
pub fn hexdump(base: u64, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let line_addr = base.wrapping_add((i * 16) as u64);
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:#018x}: {:<47}  |{}|\n", line_addr, hex.join(" "), ascii));
    }
    out
}
