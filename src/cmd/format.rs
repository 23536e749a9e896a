/*!
format.rs

Human-output helpers for the `cmdwalk` binary.

  - StyleOptions::detect()   NO_COLOR / COLUMNS aware
  - color(role, text, style) ANSI wrapper (no-op when color is off)
  - box_header(title, subtitle, style)
  - kv_lines(rows, style)    aligned `KEY  value` block

JSON output paths never go through here.
*/

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            term_width: width,
        }
    }

    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            term_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/// Role for an HTTP status line.
pub fn status_role(status: u16) -> Role {
    match status {
        200..=299 => Role::Success,
        300..=399 => Role::Primary,
        400..=499 => Role::Warning,
        _ => Role::Error,
    }
}

/// Single-line box around a title, with an optional dim subtitle.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title = title.as_ref();
    let sub = subtitle.as_ref().map(|s| s.as_ref().to_string());
    let inner = sub
        .as_deref()
        .map(|s| visible_len(title).max(visible_len(s)))
        .unwrap_or_else(|| visible_len(title))
        .min(style.term_width.saturating_sub(4));
    let bar = "─".repeat(inner + 2);

    let mut out = format!("┌{bar}┐\n");
    out.push_str(&format!("│ {} │\n", pad(&color(Role::Primary, title, style), title, inner)));
    if let Some(s) = sub {
        out.push_str(&format!("│ {} │\n", pad(&color(Role::Dim, &s, style), &s, inner)));
    }
    out.push_str(&format!("└{bar}┘"));
    out
}

/// `KEY  value` lines with keys padded to a common width.
pub fn kv_lines(rows: &[(&str, String)], style: &StyleOptions) -> String {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(k, v)| format!("{}  {v}", color(Role::Accent, format!("{k:<width$}"), style)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn visible_len(s: &str) -> usize {
    s.chars().count()
}

// Pads using the uncolored text's width so ANSI codes don't skew alignment.
fn pad(rendered: &str, raw: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_len(raw));
    format!("{rendered}{}", " ".repeat(fill))
}
