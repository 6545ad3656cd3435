//! Renders model answers as the HTML fragment the landing page displays.

use askama::Template;
use regex::Regex;
use std::sync::OnceLock;

static BOLD: OnceLock<Regex> = OnceLock::new();
static ITALIC: OnceLock<Regex> = OnceLock::new();

fn bold_pattern() -> &'static Regex {
    BOLD.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

fn italic_pattern() -> &'static Regex {
    ITALIC.get_or_init(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"))
}

/// Convert `**X**` to `<strong>X</strong>`, then the remaining `*X*` to
/// `<em>X</em>`. Matches are non-greedy and never span a line break.
pub fn apply_emphasis(text: &str) -> String {
    let bold = bold_pattern().replace_all(text, "<strong>$1</strong>");
    italic_pattern()
        .replace_all(&bold, "<em>$1</em>")
        .into_owned()
}

/// Model text with HTML special characters escaped on render.
#[derive(Template)]
#[template(source = "{{ text }}", ext = "html")]
struct EscapedText<'a> {
    text: &'a str,
}

/// The "Guide" card. `body` is already rendered markup.
#[derive(Template)]
#[template(path = "guide.html")]
struct GuideCard<'a> {
    body: &'a str,
}

/// Wraps answers in the "Guide" card.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter {
    escape_html: bool,
}

impl ResponseFormatter {
    /// With `escape_html` off, model output is embedded verbatim, so any
    /// markup it contains reaches the browser.
    pub fn new(escape_html: bool) -> Self {
        Self { escape_html }
    }

    pub fn format(&self, content: &str) -> Result<String, askama::Error> {
        let body = if self.escape_html {
            apply_emphasis(&EscapedText { text: content }.render()?)
        } else {
            apply_emphasis(content)
        };

        GuideCard { body: &body }.render()
    }
}
