//! Color token translation.
//!
//! The rendering layer consumes colors as `"H S% L%"` tokens. Stored
//! configuration may hold either hex literals or tokens that are already in
//! that form; [`to_hsl_token`] normalizes both.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Well-formed `#rgb` or `#rrggbb` literal.
static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}% {}%", self.h, self.s, self.l)
    }
}

/// Convert a color into a canonical `"H S% L%"` token.
///
/// Hex input is converted; anything else is returned trimmed. Never fails:
/// a malformed hex literal produces a best-effort token with unreadable
/// channels treated as zero.
pub fn to_hsl_token(input: &str) -> String {
    let trimmed = input.trim();
    if !trimmed.starts_with('#') {
        return trimmed.to_string();
    }
    rgb_to_hsl(parse_hex(trimmed)).to_string()
}

fn parse_hex(literal: &str) -> Rgb {
    let digits = &literal[1..];
    if HEX_RE.is_match(literal) && digits.len() == 3 {
        let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
        return parse_channels(&expanded);
    }
    parse_channels(digits)
}

fn parse_channels(digits: &str) -> Rgb {
    let channel = |i: usize| {
        digits
            .get(i * 2..i * 2 + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0)
    };
    Rgb {
        r: channel(0),
        g: channel(1),
        b: channel(2),
    }
}

/// Standard RGB -> HSL conversion, rounded to whole degrees and percents.
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    let (h, s) = if max == min {
        (0.0, 0.0)
    } else {
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0, s)
    };

    Hsl {
        h: ((h * 360.0).round() as u16) % 360,
        s: (s * 100.0).round() as u8,
        l: (l * 100.0).round() as u8,
    }
}

/// Standard HSL -> RGB conversion.
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let s = f64::from(hsl.s.min(100)) / 100.0;
    let l = f64::from(hsl.l.min(100)) / 100.0;
    let h = f64::from(hsl.h % 360) / 60.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h as u8 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    Rgb {
        r: to_u8(r1),
        g: to_u8(g1),
        b: to_u8(b1),
    }
}

/// Parse a `"H S% L%"` token back into RGB.
///
/// Returns `None` unless the token has exactly three numeric components.
pub fn parse_hsl_token(token: &str) -> Option<Rgb> {
    let mut parts = token.split_whitespace();
    let h = parts.next()?.parse::<f64>().ok()?;
    let s = parts.next()?.trim_end_matches('%').parse::<f64>().ok()?;
    let l = parts.next()?.trim_end_matches('%').parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hsl_to_rgb(Hsl {
        h: h.round().rem_euclid(360.0) as u16,
        s: s.round().clamp(0.0, 100.0) as u8,
        l: l.round().clamp(0.0, 100.0) as u8,
    }))
}
