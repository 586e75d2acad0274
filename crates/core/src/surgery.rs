//! Markdown text surgery.
//!
//! Pure string-in/string-out edits that touch only their target span and
//! keep every other byte of the document. Slide-indexed edits address
//! slides through [`split_sections`], the same boundaries the renderer
//! shows. Out-of-range targets return the content unchanged.

use crate::attributes;
use crate::document::{split_sections, SlideSection};
use crate::frontmatter::{self, FrontMatterSpan};
use crate::lines::{lines, FenceTracker, Line};
use serde_json::Value;

/// Separator written between slides by [`reorder_slides`].
pub const SLIDE_SEPARATOR: &str = "\n\n===\n\n";

/// Replace one line, or a whole `:::` container / front-matter block when
/// the line opens one. Trailing whitespace of `new_text` is dropped.
pub fn replace_line_or_block(content: &str, line_index: usize, new_text: &str) -> String {
    let all: Vec<Line> = lines(content).collect();
    let Some(target) = all.get(line_index) else {
        log::warn!(
            "Line {} is out of range ({} lines); leaving content unchanged",
            line_index,
            all.len()
        );
        return content.to_string();
    };

    let end = block_end(content, &all, line_index).unwrap_or(target.end);
    splice(content, target.start, end, new_text.trim_end())
}

/// End offset of the block opened at `index`, if the line opens one.
fn block_end(content: &str, all: &[Line], index: usize) -> Option<usize> {
    let line = all[index];
    let trimmed = line.text.trim();

    if trimmed.starts_with(":::") && !is_closed_inline(trimmed) {
        let mut fences = FenceTracker::new();
        return all[index + 1..]
            .iter()
            .find(|l| !fences.update(l.text) && l.text.trim() == ":::")
            .map(|closer| closer.end);
    }

    if frontmatter::is_dash_delimiter(&line) {
        let span = frontmatter::detect(content, line.start, line.number, content.len())?;
        if span.start == line.start {
            // `span.end` is past the closer's newline; keep that newline.
            let closer = all.iter().find(|l| l.next == span.end)?;
            return Some(closer.end);
        }
    }
    None
}

/// `::: note text :::` opens and closes on one line.
fn is_closed_inline(trimmed: &str) -> bool {
    trimmed == ":::" || (trimmed.len() > 6 && trimmed.ends_with(":::"))
}

/// Splice `new_text` into `content[start..end]`.
///
/// Reversed, out-of-range or non-boundary offsets leave the content unchanged.
pub fn replace_range(content: &str, start: usize, end: usize, new_text: &str) -> String {
    let valid = start <= end
        && end <= content.len()
        && content.is_char_boundary(start)
        && content.is_char_boundary(end);
    if !valid {
        log::warn!(
            "Invalid range {}..{} for content of {} bytes; leaving content unchanged",
            start,
            end,
            content.len()
        );
        return content.to_string();
    }
    splice(content, start, end, new_text)
}

fn splice(content: &str, start: usize, end: usize, new_text: &str) -> String {
    let mut out = String::with_capacity(content.len() + new_text.len());
    out.push_str(&content[..start]);
    out.push_str(new_text);
    out.push_str(&content[end..]);
    out
}

/// Set `key: "value"` in a slide's front matter, creating the block if needed.
///
/// For slide 0 the slide's own block is edited when present, otherwise the
/// document-global block.
pub fn update_slide_yaml(content: &str, slide_index: usize, key: &str, value: &str) -> String {
    let sections = split_sections(content);
    let Some(section) = sections.get(slide_index) else {
        log::warn!(
            "Slide {} is out of range ({} slides); leaving content unchanged",
            slide_index,
            sections.len()
        );
        return content.to_string();
    };
    if frontmatter::yaml_key_of(&format!("{}: x", key)) != Some(key) {
        log::warn!("'{}' is not a valid YAML key; leaving content unchanged", key);
        return content.to_string();
    }

    let entry = format!("{}: {}", key, frontmatter::quote_yaml(value));
    set_entry(content, section, section.yaml_target(), key, &entry)
}

/// Set `key` to the literal `entry` in `span`, or insert a new front-matter
/// block at the start of `section`.
fn set_entry(
    content: &str,
    section: &SlideSection,
    span: Option<&FrontMatterSpan>,
    key: &str,
    entry: &str,
) -> String {
    match span {
        Some(span) => {
            let body = frontmatter::set_yaml_entry(span.body(content), key, entry);
            splice(content, span.body_start, span.body_end, &body)
        }
        None => {
            let at = section.start;
            let lead = if at > 0 && !content[..at].ends_with('\n') {
                "\n"
            } else {
                ""
            };
            let block = format!("{}---\n{}\n---\n", lead, entry);
            splice(content, at, at, &block)
        }
    }
}

/// Move slide `from` to position `to`.
///
/// The document-global front matter stays first, attached to whichever slide
/// ends up first. Slides are rejoined with `\n\n===\n\n`, so the original
/// separator styles are normalised.
pub fn reorder_slides(content: &str, from: usize, to: usize) -> String {
    let sections = split_sections(content);
    if from >= sections.len() || to >= sections.len() {
        log::warn!(
            "Cannot move slide {} to {} in a deck of {} slides; leaving content unchanged",
            from,
            to,
            sections.len()
        );
        return content.to_string();
    }
    if from == to {
        return content.to_string();
    }

    let global = sections[0].global.as_ref();
    let mut slides: Vec<&str> = sections
        .iter()
        .map(|s| {
            let start = match (&s.global, s.index) {
                (Some(g), 0) => g.end,
                _ => s.start,
            };
            trim_blank_lines(&content[start..s.end.max(start)])
        })
        .collect();

    let moved = slides.remove(from);
    slides.insert(to, moved);

    let mut out = String::new();
    if let Some(g) = global {
        out.push_str(&content[g.start..g.end]);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&slides.join(SLIDE_SEPARATOR));
    if content.ends_with('\n') && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Drop leading blank lines and trailing whitespace, keeping indentation.
fn trim_blank_lines(text: &str) -> &str {
    let text = text.trim_end();
    let first = lines(text).find(|l| !l.is_blank()).map_or(text.len(), |l| l.start);
    &text[first..]
}

/// Set `key=value` in the trailing attribute tag of a single line.
///
/// An existing key is updated in place, a new key is appended, and a line
/// without a tag gets one. An empty `value` removes the key. Trailing
/// whitespace is stripped so the tag follows the content after one space.
pub fn update_element_attribute(text: &str, key: &str, value: &str) -> String {
    let text = text.trim_end();
    let (base, mut pairs) = match attributes::find_tag(text) {
        Some(tag) => (text[..tag.start].trim_end(), tag.pairs),
        None => (text, Vec::new()),
    };

    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
    pairs.retain(|(_, v)| !v.is_empty());

    if pairs.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return attributes::format_tag(&pairs);
    }
    format!("{} {}", base, attributes::format_tag(&pairs))
}

/// Apply [`update_element_attribute`] to one line of a document.
pub fn update_line_attribute(content: &str, line_index: usize, key: &str, value: &str) -> String {
    let Some(line) = lines(content).nth(line_index) else {
        log::warn!("Line {} is out of range; leaving content unchanged", line_index);
        return content.to_string();
    };
    let updated = update_element_attribute(line.text, key, value);
    splice(content, line.start, line.end, &updated)
}

/// Set the document theme (and optionally the mesh palette) in the first
/// slide's front matter, keeping every other key.
pub fn update_global_theme(
    content: &str,
    theme_id: &str,
    mesh_colors: Option<&[String]>,
) -> String {
    let sections = split_sections(content);
    let Some(first) = sections.first() else {
        return content.to_string();
    };
    let span = first.global.as_ref().or(first.front_matter.as_ref());

    let entry = format!("theme: {}", frontmatter::quote_yaml(theme_id));
    let mut out = set_entry(content, first, span, "theme", &entry);

    if let Some(colors) = mesh_colors.filter(|c| !c.is_empty()) {
        // Re-split: the theme edit may have created or grown the block.
        let sections = split_sections(&out);
        let first = &sections[0];
        let span = first.global.as_ref().or(first.front_matter.as_ref());
        let seed = span
            .map(|s| frontmatter::parse_yaml(s.body(&out)))
            .and_then(|meta| meta.get("mesh").and_then(|m| m.get("seed")).and_then(Value::as_u64));

        let quoted: Vec<String> = colors.iter().map(|c| frontmatter::quote_yaml(c)).collect();
        let entry = match seed {
            Some(seed) => format!("mesh: {{ colors: [{}], seed: {} }}", quoted.join(", "), seed),
            None => format!("mesh: {{ colors: [{}] }}", quoted.join(", ")),
        };
        out = set_entry(&out, first, span, "mesh", &entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use crate::som::Presentation;

    #[test]
    fn test_replace_single_line() {
        let content = "# Title\nold line\nnext\n";
        assert_eq!(
            replace_line_or_block(content, 1, "new line\n\n"),
            "# Title\nnew line\nnext\n"
        );
    }

    #[test]
    fn test_replace_container_block() {
        let content = "Intro\n::: chart-bar\n| a | b |\n|---|---|\n| x | 1 |\n:::\nAfter\n";
        let out = replace_line_or_block(
            content,
            1,
            "::: chart-pie\n| a | b |\n|---|---|\n| y | 2 |\n:::",
        );
        assert_eq!(
            out,
            "Intro\n::: chart-pie\n| a | b |\n|---|---|\n| y | 2 |\n:::\nAfter\n"
        );
    }

    #[test]
    fn test_replace_front_matter_block() {
        let content = "# A\n\n===\n---\nlayout: grid\nbg: red\n---\n# B\n";
        let out = replace_line_or_block(content, 3, "---\nlayout: impact\n---\n");
        assert_eq!(out, "# A\n\n===\n---\nlayout: impact\n---\n# B\n");
    }

    #[test]
    fn test_unclosed_container_replaces_line_only() {
        let content = "::: chart-bar\ntext\n";
        assert_eq!(replace_line_or_block(content, 0, "plain"), "plain\ntext\n");
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let content = "a\nb\n";
        assert_eq!(replace_line_or_block(content, 9, "x"), content);
        assert_eq!(replace_range(content, 3, 1, "x"), content);
        assert_eq!(replace_range(content, 0, 99, "x"), content);
        assert_eq!(update_slide_yaml(content, 4, "bg", "red"), content);
        assert_eq!(reorder_slides(content, 0, 3), content);
        assert_eq!(replace_range("é", 1, 1, "x"), "é");
    }

    #[test]
    fn test_replace_range_preserves_other_slides() {
        let content = "# A\n\n===\n\n# B\nbody\n\n===\n\n# C\n";
        let deck = Presentation::from_markdown(content);
        let target = &deck.slides[1];
        let out = replace_range(content, target.start_index, target.end_index, "\n# Changed\n\n");

        let after = Presentation::from_markdown(&out);
        assert_eq!(after.slides.len(), 3);
        assert_eq!(after.slides[1].title(), Some("Changed"));
        for i in [0, 2] {
            let before = &content[deck.slides[i].start_index..deck.slides[i].end_index];
            let now = &out[after.slides[i].start_index..after.slides[i].end_index];
            assert_eq!(before, now);
        }
    }

    #[test]
    fn test_replace_slide_with_unterminated_text() {
        let content = "# A\n\n===\n\n# B\n\n===\n\n# C\n";
        let deck = Presentation::from_markdown(content);
        for index in 0..3 {
            let target = &deck.slides[index];
            let out = replace_range(content, target.start_index, target.end_index, "# New");
            let after = Presentation::from_markdown(&out);
            assert_eq!(after.slides.len(), 3, "replacing slide {}", index);
            assert_eq!(after.slides[index].title(), Some("New"));
            for other in (0..3).filter(|&i| i != index) {
                let before = &content[deck.slides[other].start_index..deck.slides[other].end_index];
                let now = &out[after.slides[other].start_index..after.slides[other].end_index];
                assert_eq!(before, now);
            }
        }
        assert_eq!(
            replace_range(content, deck.slides[0].start_index, deck.slides[0].end_index, "# New"),
            "# New\n\n===\n\n# B\n\n===\n\n# C\n"
        );
    }

    #[test]
    fn test_update_multi_paragraph_note_keeps_config() {
        let content = "# A\n\n===\n\n---\nnote: |\n  first para\n\n  second para\nlayout: grid\n---\n# B\n";
        let out = update_slide_yaml(content, 1, "note", "x");
        assert_eq!(
            out,
            "# A\n\n===\n\n---\nnote: \"x\"\nlayout: grid\n---\n# B\n"
        );
        let deck = Presentation::from_markdown(&out);
        assert_eq!(deck.slides[1].layout, "grid");
        assert_eq!(deck.slides[1].notes.as_deref(), Some("x"));
    }

    #[test]
    fn test_update_slide_yaml_keeps_other_keys() {
        let content = "# A\n\n===\n\n---\nlayout: grid\n---\n# B\n";
        let out = update_slide_yaml(content, 1, "bgImage", "new.png");
        assert_eq!(
            out,
            "# A\n\n===\n\n---\nlayout: grid\nbgImage: \"new.png\"\n---\n# B\n"
        );
        let out = update_slide_yaml(&out, 1, "layout", "impact");
        assert!(out.contains("layout: \"impact\"\nbgImage: \"new.png\"\n"));
    }

    #[test]
    fn test_update_slide_yaml_creates_block() {
        let content = "# A\n---\n# B\n";
        let out = update_slide_yaml(content, 1, "bg", "red");
        assert_eq!(out, "# A\n---\n---\nbg: \"red\"\n---\n# B\n");
        let doc = parse(&out);
        assert_eq!(doc.slide_count(), 2);
        assert_eq!(doc.blocks[2].metadata["bg"], "red");

        let out = update_slide_yaml("# Only\n", 0, "layout", "impact");
        assert_eq!(out, "---\nlayout: \"impact\"\n---\n# Only\n");
    }

    #[test]
    fn test_update_slide_yaml_on_dash_separated_deck() {
        // `---` separators address the same slides as `===`.
        let content = "# A\n\n---\n\n# B\n\n---\n\n# C\n";
        let out = update_slide_yaml(content, 2, "layout", "quote");
        let deck = Presentation::from_markdown(&out);
        assert_eq!(deck.slides.len(), 3);
        assert_eq!(deck.slides[2].layout, "quote");
        assert_eq!(deck.slides[1].layout, "default");
    }

    #[test]
    fn test_update_slide_yaml_after_trailing_separator() {
        let out = update_slide_yaml("# A\n===", 1, "bg", "red");
        assert_eq!(out, "# A\n===\n---\nbg: \"red\"\n---\n");
    }

    #[test]
    fn test_reorder_keeps_global_front_matter_first() {
        let content = "---\ntitle: Deck\n---\n# One\n\n===\n\n# Two\n\n---\n\n# Three\n";
        let out = reorder_slides(content, 2, 0);
        assert_eq!(
            out,
            "---\ntitle: Deck\n---\n# Three\n\n===\n\n# One\n\n===\n\n# Two\n"
        );
        let deck = Presentation::from_markdown(&out);
        assert_eq!(deck.meta["title"], "Deck");
        assert_eq!(deck.slides[0].title(), Some("Three"));
    }

    #[test]
    fn test_reorder_same_index_is_noop() {
        let content = "a\n---\nb\n";
        assert_eq!(reorder_slides(content, 1, 1), content);
    }

    #[test]
    fn test_update_element_attribute() {
        assert_eq!(update_element_attribute("# Title  \n", "color", "red"), "# Title {color=red}");
        assert_eq!(
            update_element_attribute("# Title {color=red x=1}", "color", "#00f"),
            "# Title {color=#00f x=1}"
        );
        assert_eq!(
            update_element_attribute("# Title {x=1}", "label", "two words"),
            "# Title {x=1 label=\"two words\"}"
        );
        assert_eq!(update_element_attribute("Text {x=1}", "x", ""), "Text");
    }

    #[test]
    fn test_update_line_attribute() {
        let content = "# A\nBody\n";
        assert_eq!(
            update_line_attribute(content, 1, "size", "2"),
            "# A\nBody {size=2}\n"
        );
    }

    #[test]
    fn test_update_global_theme() {
        let content = "---\ntitle: Deck\ntheme: light\nauthor: Me\n---\n# A\n";
        let out = update_global_theme(content, "dark", None);
        assert_eq!(
            out,
            "---\ntitle: Deck\ntheme: \"dark\"\nauthor: Me\n---\n# A\n"
        );

        let colors = ["#000".to_string(), "#f0f".to_string()];
        let out = update_global_theme("# A\n", "aurora", Some(&colors[..]));
        let doc = parse(&out);
        assert_eq!(doc.meta["theme"], "aurora");
        assert_eq!(doc.meta["mesh"]["colors"][1], "#f0f");
    }

    #[test]
    fn test_update_global_theme_keeps_mesh_seed() {
        let content = "---\nmesh:\n  seed: 9\n---\n# A\n";
        let out = update_global_theme(content, "dark", Some(&["#111".to_string()]));
        let doc = parse(&out);
        assert_eq!(doc.meta["mesh"]["seed"], 9);
        assert_eq!(doc.meta["mesh"]["colors"][0], "#111");
    }
}
