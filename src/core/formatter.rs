//! Pattern-based event formatting
//!
//! The default mode renders an event as compact JSON. Pattern mode expands
//! a template against the event: `\n`/`\t` escapes become real characters
//! and placeholders of the form `{[-]?[%directive%]?key}` are substituted
//! with event fields.
//!
//! Directives:
//! - `%O%` renders containers recursively, sequences as `- ` bullets and
//!   mappings as `key: value` entries, indented two spaces per level.
//! - `%[ulif]t%` renders the field as a timestamp (UTC ISO 8601, local
//!   ISO 8601, integer Unix seconds, fractional Unix seconds).
//! - anything else is a printf-style single-value specifier; on a mismatch
//!   the value's plain string form is used.
//!
//! A leading `-` makes a placeholder invisible when its field is absent;
//! otherwise the literal `{key}` text is kept. After rendering, configured
//! per-key styles are applied.

use super::event::{plain_string, Event};
use super::timestamp::{coerce_time, TimeDirective};
use colored::{Color, ColoredString, Colorize};
use parking_lot::Mutex;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const RESET: &str = "\x1b[0m";

static PATTERN_RE: OnceLock<Regex> = OnceLock::new();
static ANSI_RE: OnceLock<Regex> = OnceLock::new();

// The colored crate's coloring override is process-wide; format() scopes it
// with a guard and serializes callers so concurrent format calls with
// different color settings cannot interleave.
static COLORING: Mutex<()> = Mutex::new(());

fn pattern_re() -> &'static Regex {
    PATTERN_RE.get_or_init(|| {
        Regex::new(r"\{(-)?(%[^%]+%)?([^{}]+)\}").expect("pattern regex")
    })
}

fn ansi_re() -> &'static Regex {
    ANSI_RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex"))
}

/// Style tokens: colored-crate color names, `on_<color>` backgrounds, and
/// the attributes bold/italic/underline/blink/reversed/dimmed/strikethrough.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StyleTokens {
    One(String),
    Many(Vec<String>),
}

impl StyleTokens {
    fn tokens(&self) -> &[String] {
        match self {
            StyleTokens::One(token) => std::slice::from_ref(token),
            StyleTokens::Many(tokens) => tokens,
        }
    }
}

/// Per-key style: unconditional token(s), or a table keyed by the field's
/// rendered value (e.g. a different color per severity).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Style {
    Flat(StyleTokens),
    ByValue(HashMap<String, StyleTokens>),
}

/// Named patterns and per-key styles for pattern-mode formatting
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub formats: HashMap<String, String>,
    pub styles: HashMap<String, Style>,
}

impl FormatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in configuration: a `default` pattern and per-severity colors
    pub fn standard() -> Self {
        let mut severity_colors = HashMap::new();
        severity_colors.insert("debug".to_string(), StyleTokens::One("blue".to_string()));
        severity_colors.insert("info".to_string(), StyleTokens::One("green".to_string()));
        severity_colors.insert("warn".to_string(), StyleTokens::One("yellow".to_string()));
        severity_colors.insert("error".to_string(), StyleTokens::One("red".to_string()));
        severity_colors.insert(
            "fatal".to_string(),
            StyleTokens::Many(vec!["red".to_string(), "bold".to_string()]),
        );
        Self::new()
            .with_format("default", "{%ut%timestamp} [{severity}] {message}")
            .with_style("severity", Style::ByValue(severity_colors))
    }

    #[must_use]
    pub fn with_format(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.formats.insert(name.into(), pattern.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, key: impl Into<String>, style: Style) -> Self {
        self.styles.insert(key.into(), style);
        self
    }
}

/// Options for a single format call
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Pattern mode when true; compact JSON otherwise
    pub pretty: bool,
    /// Apply configured styles with ANSI colors
    pub color: bool,
    /// Name of a configured pattern, or a literal pattern string
    pub format: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            color: false,
            format: "default".to_string(),
        }
    }
}

impl FormatOptions {
    pub fn pattern(name: impl Into<String>) -> Self {
        Self {
            pretty: true,
            format: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

struct ColoringGuard {
    previous: bool,
}

impl ColoringGuard {
    fn set(enabled: bool) -> Self {
        let previous = colored::control::SHOULD_COLORIZE.should_colorize();
        colored::control::set_override(enabled);
        ColoringGuard { previous }
    }
}

impl Drop for ColoringGuard {
    fn drop(&mut self) {
        colored::control::set_override(self.previous);
    }
}

/// Renders one event through a [`FormatConfig`]
pub struct EventFormatter<'a> {
    event: &'a Event,
    config: &'a FormatConfig,
}

impl<'a> EventFormatter<'a> {
    pub fn new(event: &'a Event, config: &'a FormatConfig) -> Self {
        Self { event, config }
    }

    pub fn format(&self, options: &FormatOptions) -> String {
        let _serialize = COLORING.lock();
        let _guard = ColoringGuard::set(options.color);
        if options.pretty {
            let pattern = self
                .config
                .formats
                .get(&options.format)
                .cloned()
                .unwrap_or_else(|| options.format.clone());
            self.format_pattern(&pattern)
        } else {
            self.event.to_json()
        }
    }

    fn format_pattern(&self, pattern: &str) -> String {
        let expanded = pattern.replace("\\n", "\n").replace("\\t", "\t");
        pattern_re()
            .replace_all(&expanded, |caps: &Captures| {
                let invisible = caps.get(1).is_some();
                let directive = caps.get(2).map(|m| m.as_str());
                let key = &caps[3];
                match self.event.get(key) {
                    Some(value) if !value.is_null() => {
                        let rendered = self.render(directive, value);
                        self.colorize(key, value, rendered)
                    }
                    _ if invisible => String::new(),
                    _ => format!("{{{}}}", key),
                }
            })
            .into_owned()
    }

    fn render(&self, directive: Option<&str>, value: &Value) -> String {
        let Some(directive) = directive else {
            return plain_string(value);
        };
        let body = &directive[1..directive.len() - 1];
        if body == "O" {
            format_object(value, 0)
        } else if let Some(flag) = time_flag(body) {
            TimeDirective::from_flag(flag).render(coerce_time(value))
        } else {
            let spec = &directive[..directive.len() - 1];
            sprintf(spec, value).unwrap_or_else(|| plain_string(value))
        }
    }

    fn colorize(&self, key: &str, raw: &Value, rendered: String) -> String {
        match self.config.styles.get(key) {
            None => reset_terminate(rendered),
            Some(Style::Flat(tokens)) => apply_tokens(tokens.tokens(), &rendered),
            Some(Style::ByValue(table)) => match table.get(&plain_string(raw)) {
                Some(tokens) => apply_tokens(tokens.tokens(), &rendered),
                None => reset_terminate(rendered),
            },
        }
    }
}

impl Event {
    /// Format this event through `config`. See [`EventFormatter`].
    pub fn format(&self, config: &FormatConfig, options: &FormatOptions) -> String {
        EventFormatter::new(self, config).format(options)
    }
}

fn reset_terminate(s: String) -> String {
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        format!("{}{}", s, RESET)
    } else {
        s
    }
}

fn apply_tokens(tokens: &[String], rendered: &str) -> String {
    let stripped = ansi_re().replace_all(rendered, "").into_owned();
    let mut styled = stripped.normal();
    for token in tokens {
        styled = apply_token(styled, token);
    }
    styled.to_string()
}

fn apply_token(s: ColoredString, token: &str) -> ColoredString {
    match token {
        "bold" => s.bold(),
        "italic" => s.italic(),
        "underline" => s.underline(),
        "blink" => s.blink(),
        "reversed" | "reverse" => s.reversed(),
        "dimmed" | "dark" => s.dimmed(),
        "strikethrough" => s.strikethrough(),
        t => {
            if let Some(bg) = t.strip_prefix("on_") {
                s.on_color(Color::from(bg))
            } else {
                s.color(Color::from(t))
            }
        }
    }
}

fn time_flag(body: &str) -> Option<Option<char>> {
    let mut chars = body.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('t'), None, _) => Some(None),
        (Some(flag), Some('t'), None) if "ulif".contains(flag) => Some(Some(flag)),
        _ => None,
    }
}

fn format_object(value: &Value, depth: usize) -> String {
    match value {
        Value::Array(items) => {
            let depth = depth + 2;
            let mut result = String::new();
            for item in items {
                result.push_str(&format!(
                    "\n{}- {}",
                    " ".repeat(depth),
                    format_object(item, depth)
                ));
            }
            result
        }
        Value::Object(map) => {
            let depth = depth + 2;
            let mut result = String::new();
            for (key, item) in map {
                result.push_str(&format!(
                    "\n{}{}: {}",
                    " ".repeat(depth),
                    key,
                    format_object(item, depth)
                ));
            }
            result
        }
        other => plain_string(other),
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64)),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value_as_i64(value)? {
        n if n >= 0 => Some(n as u64),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn pad_numeric(sign: &str, digits: &str, width: usize, left: bool, zero: bool) -> String {
    let len = sign.len() + digits.len();
    if len >= width {
        return format!("{}{}", sign, digits);
    }
    let pad = width - len;
    if left {
        format!("{}{}{}", sign, digits, " ".repeat(pad))
    } else if zero {
        format!("{}{}{}", sign, "0".repeat(pad), digits)
    } else {
        format!("{}{}{}", " ".repeat(pad), sign, digits)
    }
}

fn pad_plain(s: String, width: usize, left: bool) -> String {
    if s.chars().count() >= width {
        return s;
    }
    let pad = width - s.chars().count();
    if left {
        format!("{}{}", s, " ".repeat(pad))
    } else {
        format!("{}{}", " ".repeat(pad), s)
    }
}

/// Minimal printf-style single-value formatter covering flags `-`/`0`/`+`,
/// width, precision, and the conversions d/i/u/f/e/s/x/X/o/b. Returns
/// `None` on any mismatch so the caller can fall back to the plain form.
fn sprintf(spec: &str, value: &Value) -> Option<String> {
    let body = spec.strip_prefix('%')?;
    let mut chars = body.chars().peekable();

    let mut left = false;
    let mut zero = false;
    let mut plus = false;
    while let Some(&c) = chars.peek() {
        match c {
            '-' => left = true,
            '0' => zero = true,
            '+' => plus = true,
            ' ' => {}
            _ => break,
        }
        chars.next();
    }

    let mut width = 0usize;
    while let Some(&c) = chars.peek() {
        if let Some(d) = c.to_digit(10) {
            width = width * 10 + d as usize;
            chars.next();
        } else {
            break;
        }
    }

    let mut precision = None;
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut p = 0usize;
        while let Some(&c) = chars.peek() {
            if let Some(d) = c.to_digit(10) {
                p = p * 10 + d as usize;
                chars.next();
            } else {
                break;
            }
        }
        precision = Some(p);
    }

    let conversion = chars.next()?;
    if chars.next().is_some() {
        return None;
    }

    match conversion {
        'd' | 'i' | 'u' => {
            let n = value_as_i64(value)?;
            let digits = n.unsigned_abs().to_string();
            let sign = if n < 0 {
                "-"
            } else if plus {
                "+"
            } else {
                ""
            };
            Some(pad_numeric(sign, &digits, width, left, zero))
        }
        'f' => {
            let f = value_as_f64(value)?;
            let digits = format!("{:.*}", precision.unwrap_or(6), f.abs());
            let sign = if f.is_sign_negative() {
                "-"
            } else if plus {
                "+"
            } else {
                ""
            };
            Some(pad_numeric(sign, &digits, width, left, zero))
        }
        'e' => {
            let f = value_as_f64(value)?;
            Some(pad_plain(
                format!("{:.*e}", precision.unwrap_or(6), f),
                width,
                left,
            ))
        }
        's' => {
            let mut s = plain_string(value);
            if let Some(p) = precision {
                s = s.chars().take(p).collect();
            }
            Some(pad_plain(s, width, left))
        }
        'x' => Some(pad_plain(format!("{:x}", value_as_u64(value)?), width, left)),
        'X' => Some(pad_plain(format!("{:X}", value_as_u64(value)?), width, left)),
        'o' => Some(pad_plain(format!("{:o}", value_as_u64(value)?), width, left)),
        'b' => Some(pad_plain(format!("{:b}", value_as_u64(value)?), width, left)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Fields;
    use crate::fields;
    use serde_json::json;

    fn event(fields: Fields) -> Event {
        Event::new(fields)
    }

    fn pattern(event: &Event, pattern: &str) -> String {
        let config = FormatConfig::new();
        EventFormatter::new(event, &config).format(&FormatOptions::pattern(pattern))
    }

    #[test]
    fn test_default_mode_is_compact_json() {
        let e = event(fields! { "message": "hi" });
        let config = FormatConfig::new();
        let out = EventFormatter::new(&e, &config).format(&FormatOptions::default());
        assert_eq!(out, e.to_json());
    }

    #[test]
    fn test_simple_placeholder() {
        let e = event(fields! { "message": "hello" });
        assert_eq!(pattern(&e, "{message}"), "hello");
    }

    #[test]
    fn test_escape_expansion() {
        let e = event(fields! { "message": "hello" });
        assert_eq!(pattern(&e, r"{message}\n\t"), "hello\n\t");
    }

    #[test]
    fn test_missing_key_keeps_literal() {
        let e = event(fields! { "message": "hello" });
        assert_eq!(pattern(&e, "{nope}"), "{nope}");
        // the directive is dropped from the literal fallback
        assert_eq!(pattern(&e, "{%O%nope}"), "{nope}");
    }

    #[test]
    fn test_invisible_placeholder() {
        let e = event(fields! { "message": "hello" });
        assert_eq!(pattern(&e, "{-%O%backtrace}{message}"), "hello");
    }

    #[test]
    fn test_null_counts_as_absent() {
        let e = event(fields! { "message": "hello", "extra": null });
        assert_eq!(pattern(&e, "{extra}"), "{extra}");
        assert_eq!(pattern(&e, "{-extra}"), "");
    }

    #[test]
    fn test_object_directive() {
        let e = event(fields! { "data": { "a": [1, 2], "b": { "c": 3 } } });
        assert_eq!(
            pattern(&e, "{%O%data}"),
            "\n  a: \n    - 1\n    - 2\n  b: \n    c: 3"
        );
    }

    #[test]
    fn test_time_directives() {
        let e = event(fields! { "timestamp": "2011-11-29T14:14:14.000Z" });
        assert_eq!(pattern(&e, "{%it%timestamp}"), "1322576054");
        assert_eq!(pattern(&e, "{%ut%timestamp}"), "2011-11-29T14:14:14.000Z");
        assert_eq!(pattern(&e, "{%t%timestamp}"), "2011-11-29T14:14:14.000Z");
        assert_eq!(pattern(&e, "{%ft%timestamp}"), "1322576054.0");
    }

    #[test]
    fn test_time_directive_defaults_to_epoch() {
        let e = event(fields! { "when": [1] });
        assert_eq!(pattern(&e, "{%it%when}"), "0");
    }

    #[test]
    fn test_printf_directives() {
        let e = event(fields! { "n": 42, "f": 3.14159, "s": "abc" });
        assert_eq!(pattern(&e, "{%05d%n}"), "00042");
        assert_eq!(pattern(&e, "{%-5d%n}"), "42   ");
        assert_eq!(pattern(&e, "{%+d%n}"), "+42");
        assert_eq!(pattern(&e, "{%.2f%f}"), "3.14");
        assert_eq!(pattern(&e, "{%x%n}"), "2a");
        assert_eq!(pattern(&e, "{%5s%s}"), "  abc");
    }

    #[test]
    fn test_printf_mismatch_falls_back_to_plain() {
        let e = event(fields! { "s": "abc" });
        assert_eq!(pattern(&e, "{%05d%s}"), "abc");
        let e = event(fields! { "n": -1 });
        assert_eq!(pattern(&e, "{%x%n}"), "-1");
    }

    #[test]
    fn test_negative_numbers() {
        let e = event(fields! { "n": -42, "f": -1.5 });
        assert_eq!(pattern(&e, "{%05d%n}"), "-0042");
        assert_eq!(pattern(&e, "{%.1f%f}"), "-1.5");
    }

    #[test]
    fn test_named_pattern_lookup() {
        let e = event(fields! { "message": "hello" });
        let config = FormatConfig::new().with_format("short", "{message}!");
        let out = EventFormatter::new(&e, &config).format(&FormatOptions::pattern("short"));
        assert_eq!(out, "hello!");
    }

    #[test]
    fn test_flat_style_applies_color() {
        let e = event(fields! { "message": "hello" });
        let config = FormatConfig::new()
            .with_style("message", Style::Flat(StyleTokens::One("red".to_string())));
        let out = EventFormatter::new(&e, &config)
            .format(&FormatOptions::pattern("{message}").with_color(true));
        assert!(out.contains("\u{1b}[31m"), "got {:?}", out);
        assert!(out.contains("hello"));
    }

    #[test]
    fn test_by_value_style_selects_on_value() {
        let e = event(fields! { "severity": "error", "message": "boom" });
        let config = FormatConfig::standard();
        let out = EventFormatter::new(&e, &config)
            .format(&FormatOptions::pattern("{severity}").with_color(true));
        assert!(out.contains("\u{1b}[31m"), "got {:?}", out);
    }

    #[test]
    fn test_color_disabled_output_is_plain() {
        let e = event(fields! { "severity": "error", "message": "boom" });
        let config = FormatConfig::standard();
        let out = EventFormatter::new(&e, &config)
            .format(&FormatOptions::pattern("{severity} {message}").with_color(false));
        assert_eq!(out, "error boom");
    }

    #[test]
    fn test_unstyled_key_reset_terminates_when_coloring() {
        let e = event(fields! { "message": "hello" });
        let config = FormatConfig::new();
        let out = EventFormatter::new(&e, &config)
            .format(&FormatOptions::pattern("{message}").with_color(true));
        assert_eq!(out, format!("hello{}", RESET));
    }

    #[test]
    fn test_standard_config_default_pattern() {
        let e = event(fields! {
            "message": "ready",
            "severity": "info",
            "timestamp": "2011-11-29T14:14:14.000Z"
        });
        let config = FormatConfig::standard();
        let out = EventFormatter::new(&e, &config).format(&FormatOptions::pattern("default"));
        assert_eq!(out, "2011-11-29T14:14:14.000Z [info] ready");
    }

    #[test]
    fn test_config_deserializes() {
        let config: FormatConfig = serde_json::from_value(json!({
            "formats": { "short": "{message}" },
            "styles": {
                "message": "bold",
                "host": ["underline", "blue"],
                "severity": { "error": ["red", "bold"], "info": "green" }
            }
        }))
        .expect("config");
        assert_eq!(config.formats["short"], "{message}");
        assert!(matches!(config.styles["message"], Style::Flat(_)));
        assert!(matches!(config.styles["severity"], Style::ByValue(_)));
    }

    #[test]
    fn test_sprintf_directly() {
        assert_eq!(sprintf("%d", &json!(7)), Some("7".to_string()));
        assert_eq!(sprintf("%3d", &json!(7)), Some("  7".to_string()));
        assert_eq!(sprintf("%.3s", &json!("abcdef")), Some("abc".to_string()));
        assert_eq!(sprintf("%q", &json!(7)), None);
        assert_eq!(sprintf("%d", &json!([1])), None);
    }
}
