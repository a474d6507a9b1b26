//! Option-map to SVG style-string conversion.

use crate::ast::{DrawCommand, OptionMap, OptionValue};
use crate::parse::fmt_number;

/// Known color names and their hex values.
pub const COLORS: &[(&str, &str)] = &[
    ("red", "#FF0000"),
    ("green", "#00FF00"),
    ("blue", "#0000FF"),
    ("yellow", "#FFFF00"),
    ("cyan", "#00FFFF"),
    ("magenta", "#FF00FF"),
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("gray", "#808080"),
    ("darkgray", "#404040"),
    ("lightgray", "#C0C0C0"),
    ("brown", "#A52A2A"),
    ("lime", "#00FF00"),
    ("olive", "#808000"),
    ("orange", "#FFA500"),
    ("pink", "#FFC0CB"),
    ("purple", "#800080"),
    ("teal", "#008080"),
    ("violet", "#EE82EE"),
];

/// Named line widths in pixels.
pub const LINE_WIDTHS: &[(&str, f64)] = &[
    ("ultra thin", 0.5),
    ("very thin", 0.75),
    ("thin", 1.0),
    ("semithick", 1.5),
    ("thick", 2.0),
    ("very thick", 3.0),
    ("ultra thick", 4.0),
];

fn named_color(name: &str) -> Option<&'static str> {
    COLORS.iter().find(|(n, _)| *n == name).map(|(_, hex)| *hex)
}

/// Build the style string for a draw/fill/filldraw element.
pub fn convert(options: &OptionMap, command: DrawCommand) -> String {
    let mut styles = Vec::new();

    match command {
        DrawCommand::Fill => {
            styles.push("stroke: none".to_string());
            styles.push(format!("fill: {}", get_color(options, None, "black")));
        }
        DrawCommand::FillDraw => {
            styles.push(format!("stroke: {}", get_color(options, None, "black")));
            styles.push(format!("fill: {}", get_color(options, Some("fill"), "black")));
            styles.push(format!("stroke-width: {}px", fmt_number(line_width(options))));
        }
        DrawCommand::Draw | DrawCommand::Clip => {
            styles.push(format!("stroke: {}", get_color(options, None, "black")));
            styles.push("fill: none".to_string());
            styles.push(format!("stroke-width: {}px", fmt_number(line_width(options))));
        }
    }

    if let Some(dash) = dash_pattern(options) {
        styles.push(format!("stroke-dasharray: {dash}"));
    }

    if let Some(OptionValue::Num(opacity)) = options.get("opacity") {
        styles.push(format!("opacity: {}", fmt_number(*opacity)));
    }

    if let Some(cap) = options.get("line cap").and_then(OptionValue::as_str) {
        styles.push(format!("stroke-linecap: {cap}"));
    }
    if let Some(join) = options.get("line join").and_then(OptionValue::as_str) {
        styles.push(format!("stroke-linejoin: {join}"));
    }

    styles.join("; ")
}

/// Build the style string for a text element.
pub fn convert_text_style(options: &OptionMap) -> String {
    let size = match options.get("font").and_then(OptionValue::as_str) {
        Some(font) if font.contains("tiny") => 8,
        Some(font) if font.contains("small") => 10,
        Some(font) if font.contains("large") => 16,
        Some(font) if font.contains("huge") => 20,
        _ => crate::render::defaults::FONT_SIZE,
    };
    format!(
        "font-size: {size}px; fill: {}; font-family: sans-serif",
        get_color(options, None, "black")
    )
}

/// Pick a color out of an option map.
///
/// Precedence follows the usual option layering: an explicit `key`
/// argument, then a bare color-name flag (blend specs included), then
/// the `color`/`draw`/`fill` keys, then the default.
pub fn get_color(options: &OptionMap, key: Option<&str>, default: &str) -> String {
    if let Some(key) = key {
        if let Some(value) = options.get(key).and_then(OptionValue::as_str) {
            return parse_color(value);
        }
    }

    for (name, value) in options {
        if !matches!(value, OptionValue::Flag) {
            continue;
        }
        if named_color(name).is_some() || is_blend(name) {
            return parse_color(name);
        }
    }

    for fallback in ["color", "draw", "fill"] {
        if let Some(value) = options.get(fallback).and_then(OptionValue::as_str) {
            return parse_color(value);
        }
    }

    named_color(default).unwrap_or(default).to_string()
}

/// Parse a color token: a name, a `#hex` literal, or a `!`-separated
/// blend like `red!50` or `blue!30!white`.
pub fn parse_color(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return "#000000".to_string();
    }
    if value.starts_with('#') {
        return value.to_string();
    }
    if let Some(hex) = named_color(value) {
        return hex.to_string();
    }
    if value.contains('!') {
        if let Some(blended) = blend_color(value) {
            return blended;
        }
    }
    "#000000".to_string()
}

fn is_blend(value: &str) -> bool {
    value.contains('!')
        && value
            .split('!')
            .next()
            .is_some_and(|first| named_color(first).is_some())
}

/// Mix a `base!pct!other!pct!...` chain left to right. A trailing
/// percentage with no color after it mixes toward white, so `red!50`
/// is an even red/white blend.
fn blend_color(value: &str) -> Option<String> {
    let mut parts = value.split('!');
    let mut rgb = hex_to_rgb(&parse_known(parts.next())?)?;

    let parts: Vec<&str> = parts.collect();
    let mut i = 0;
    while i < parts.len() {
        let pct = parts[i].trim().parse::<f64>().ok()?.clamp(0.0, 100.0);
        let other = match parts.get(i + 1) {
            Some(name) => hex_to_rgb(&parse_known(Some(name))?)?,
            None => (255.0, 255.0, 255.0),
        };
        let keep = pct / 100.0;
        rgb = (
            rgb.0 * keep + other.0 * (1.0 - keep),
            rgb.1 * keep + other.1 * (1.0 - keep),
            rgb.2 * keep + other.2 * (1.0 - keep),
        );
        i += 2;
    }

    Some(format!(
        "#{:02X}{:02X}{:02X}",
        rgb.0.round() as u8,
        rgb.1.round() as u8,
        rgb.2.round() as u8
    ))
}

fn parse_known(token: Option<&str>) -> Option<String> {
    let token = token?.trim();
    if token.starts_with('#') {
        Some(token.to_string())
    } else {
        named_color(token).map(str::to_string)
    }
}

fn hex_to_rgb(hex: &str) -> Option<(f64, f64, f64)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((f64::from(r), f64::from(g), f64::from(b)))
}

fn line_width(options: &OptionMap) -> f64 {
    for (name, width) in LINE_WIDTHS {
        if matches!(options.get(*name), Some(OptionValue::Flag)) {
            return *width;
        }
    }
    if let Some(value) = options.get("line width") {
        if let Some(width) = value.as_f64() {
            return width;
        }
    }
    crate::render::defaults::STROKE_WIDTH
}

fn dash_pattern(options: &OptionMap) -> Option<&'static str> {
    if options.contains_key("dashed") {
        Some("5,5")
    } else if options.contains_key("dotted") {
        Some("2,2")
    } else if options.contains_key("dash pattern") {
        Some("5,5")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(entries: &[(&str, OptionValue)]) -> OptionMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn draw_defaults() {
        let style = convert(&OptionMap::new(), DrawCommand::Draw);
        assert_eq!(style, "stroke: #000000; fill: none; stroke-width: 1px");
    }

    #[test]
    fn fill_uses_flag_color() {
        let style = convert(&opts(&[("red", OptionValue::Flag)]), DrawCommand::Fill);
        assert_eq!(style, "stroke: none; fill: #FF0000");
    }

    #[test]
    fn named_width_beats_default() {
        let style = convert(&opts(&[("very thick", OptionValue::Flag)]), DrawCommand::Draw);
        assert!(style.contains("stroke-width: 3px"));
    }

    #[test]
    fn dashed_pattern() {
        let style = convert(&opts(&[("dashed", OptionValue::Flag)]), DrawCommand::Draw);
        assert!(style.contains("stroke-dasharray: 5,5"));
    }

    #[test]
    fn opacity_and_caps() {
        let style = convert(
            &opts(&[
                ("opacity", OptionValue::Num(0.5)),
                ("line cap", OptionValue::Str("round".into())),
            ]),
            DrawCommand::Draw,
        );
        assert!(style.contains("opacity: 0.5"));
        assert!(style.contains("stroke-linecap: round"));
    }

    #[test]
    fn blend_with_white() {
        // 50% red, 50% white: red channel stays ahead of green and blue.
        assert_eq!(parse_color("red!50"), "#FF8080");
    }

    #[test]
    fn blend_two_colors() {
        assert_eq!(parse_color("blue!30!white"), "#B3B3FF");
    }

    #[test]
    fn blend_chain_mixes_left_to_right() {
        // red!50!blue = purple, then a trailing !50 mixes toward white.
        assert_eq!(parse_color("red!50!blue"), "#800080");
        assert_eq!(parse_color("red!50!blue!50"), "#BF80BF");
    }

    #[test]
    fn blend_flag_recognized_in_options() {
        let style = convert(&opts(&[("red!50", OptionValue::Flag)]), DrawCommand::Fill);
        assert_eq!(style, "stroke: none; fill: #FF8080");
    }

    #[test]
    fn unknown_color_is_black() {
        assert_eq!(parse_color("chartreuse"), "#000000");
        assert_eq!(parse_color("#ABCDEF"), "#ABCDEF");
    }

    #[test]
    fn text_style_font_sizes() {
        let style = convert_text_style(&opts(&[("font", OptionValue::Str("\\small".into()))]));
        assert!(style.contains("font-size: 10px"));
        let style = convert_text_style(&OptionMap::new());
        assert!(style.contains("font-size: 12px"));
    }
}
