//! Terminal colors
//!
//! 256-color palette applied through `console`, so styling switches off by
//! itself when stderr/stdout is not a terminal.

use console::Style;
use humansize::{format_size, FormatSizeOptions, BINARY};

use crate::http::HttpMethod;

pub mod colors {
    pub const GREY: u8 = 102;      // #7D7D7D - Punctuation, secondary
    pub const AQUA: u8 = 109;      // #7A9EB5 - Numbers, info
    pub const ORANGE: u8 = 208;    // #F2913D - Warnings, PUT/PATCH
    pub const RED: u8 = 167;       // #E34F45 - Errors, DELETE
    pub const BLUE: u8 = 68;       // #426BD1 - Names, labels
    pub const PINK: u8 = 176;      // #DE85DE - Keys
    pub const GREEN: u8 = 71;      // #63C27A - Success, GET
    pub const YELLOW: u8 = 185;    // #CCCC3D - POST, redirects
}

#[inline]
pub fn colorize(text: &str, color: u8) -> String {
    Style::new().color256(color).apply_to(text).to_string()
}

#[inline]
pub fn bold(text: &str, color: u8) -> String {
    Style::new().color256(color).bold().apply_to(text).to_string()
}

/// Success message (green)
#[inline]
pub fn success(text: &str) -> String {
    bold(text, colors::GREEN)
}

/// Error message (red)
#[inline]
pub fn error(text: &str) -> String {
    bold(text, colors::RED)
}

/// Warning message (orange)
#[inline]
pub fn warning(text: &str) -> String {
    bold(text, colors::ORANGE)
}

#[inline]
pub fn info(text: &str) -> String {
    colorize(text, colors::AQUA)
}

#[inline]
pub fn label(text: &str) -> String {
    colorize(text, colors::BLUE)
}

#[inline]
pub fn key(text: &str) -> String {
    colorize(text, colors::PINK)
}

#[inline]
pub fn number(text: &str) -> String {
    colorize(text, colors::AQUA)
}

#[inline]
pub fn muted(text: &str) -> String {
    colorize(text, colors::GREY)
}

/// Color bucket for an HTTP status; `0` is a transport failure
pub fn status_color(code: u16) -> u8 {
    match code / 100 {
        1 => colors::AQUA,
        2 => colors::GREEN,
        3 => colors::YELLOW,
        4 => colors::ORANGE,
        5 => colors::RED,
        _ => colors::RED,
    }
}

pub fn status(code: u16) -> String {
    let text = if code == 0 { "ERR".to_string() } else { code.to_string() };
    bold(&text, status_color(code))
}

pub fn method(method: HttpMethod) -> String {
    let color = match method {
        HttpMethod::Get => colors::GREEN,
        HttpMethod::Post => colors::YELLOW,
        HttpMethod::Put | HttpMethod::Patch => colors::ORANGE,
        HttpMethod::Delete => colors::RED,
    };
    bold(method.as_str(), color)
}

/// Human-readable byte count (`1.50 KiB`)
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let options = FormatSizeOptions::from(BINARY)
        .decimal_places(precision)
        .decimal_zeroes(precision);
    format_size(bytes, options)
}
