//! Syntax highlighting for exported code blocks.
//!
//! Syntax and theme sets are expensive to load, so they are loaded on the
//! first highlighted block and reused for every later slide and export made
//! through the same [`Highlighter`].

use crate::canvas::TextRun;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const FALLBACK_THEME: &str = "InspiredGitHub";

#[derive(Debug, Default)]
pub struct Highlighter {
    syntaxes: OnceLock<SyntaxSet>,
    themes: OnceLock<ThemeSet>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    fn syntaxes(&self) -> &SyntaxSet {
        self.syntaxes.get_or_init(|| {
            log::debug!("Loading syntax definitions");
            SyntaxSet::load_defaults_newlines()
        })
    }

    fn themes(&self) -> &ThemeSet {
        self.themes.get_or_init(ThemeSet::load_defaults)
    }

    /// Whether the syntax sets have been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.syntaxes.get().is_some()
    }

    /// Editor background of a highlighting theme, `RRGGBB`.
    pub fn background(&self, theme_name: &str) -> Option<String> {
        let color = self.themes().themes.get(theme_name)?.settings.background?;
        Some(format!("{:02X}{:02X}{:02X}", color.r, color.g, color.b))
    }

    /// Highlight `code` into one run list per source line.
    ///
    /// Unknown languages and themes fall back to plain text and the default
    /// theme; highlighting failures yield uncoloured runs.
    pub fn highlight(&self, code: &str, language: &str, theme_name: &str) -> Vec<Vec<TextRun>> {
        let syntaxes = self.syntaxes();
        let themes = self.themes();
        let syntax = syntaxes
            .find_syntax_by_token(language.trim())
            .unwrap_or_else(|| syntaxes.find_syntax_plain_text());
        let Some(theme) = themes
            .themes
            .get(theme_name)
            .or_else(|| themes.themes.get(FALLBACK_THEME))
        else {
            return plain_lines(code);
        };

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let regions = match highlighter.highlight_line(line, syntaxes) {
                Ok(regions) => regions,
                Err(e) => {
                    log::warn!("Failed to highlight {} code: {}", language, e);
                    return plain_lines(code);
                }
            };
            let runs = regions
                .into_iter()
                .filter_map(|(style, text)| {
                    let text = text.trim_end_matches(['\n', '\r']);
                    if text.is_empty() {
                        return None;
                    }
                    let fg = style.foreground;
                    Some(TextRun {
                        text: text.to_string(),
                        bold: style.font_style.contains(FontStyle::BOLD),
                        italic: style.font_style.contains(FontStyle::ITALIC),
                        color: Some(format!("{:02X}{:02X}{:02X}", fg.r, fg.g, fg.b)),
                        ..Default::default()
                    })
                })
                .collect();
            lines.push(runs);
        }
        lines
    }
}

fn plain_lines(code: &str) -> Vec<Vec<TextRun>> {
    code.lines().map(|line| vec![TextRun::plain(line)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_colours_keywords() {
        let highlighter = Highlighter::new();
        assert!(!highlighter.is_loaded());
        let lines =
            highlighter.highlight("fn main() {\n    let x = 1;\n}", "rust", "InspiredGitHub");
        assert!(highlighter.is_loaded());
        assert_eq!(lines.len(), 3);
        let first: String = lines[0].iter().map(|r| r.text.as_str()).collect();
        assert_eq!(first, "fn main() {");
        assert!(lines[0].iter().all(|r| r.color.is_some()));
        let colours: std::collections::HashSet<_> =
            lines[0].iter().map(|r| r.color.clone()).collect();
        assert!(colours.len() > 1);
    }

    #[test]
    fn test_unknown_language_and_theme_still_render() {
        let highlighter = Highlighter::new();
        let lines = highlighter.highlight("just text", "no-such-language", "no-such-theme");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][0].text, "just text");
    }
}
