//! CLI tool for previewing, editing and exporting Markdown slide decks.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slidemark_core::{
    render_html, reorder_slides, replace_line_or_block, update_global_theme, update_line_attribute,
    update_slide_yaml, BrandConfig, HtmlOptions, Presentation, PreviewSession, RegionKind, Theme,
};
use slidemark_pptx::Exporter;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

/// Preview, edit and export slide decks written in Markdown.
#[derive(Parser, Debug)]
#[command(name = "slidemark")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print edited Markdown to stdout instead of rewriting the file
    #[arg(short, long, global = true)]
    print: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise the slides of a deck
    Inspect {
        input: PathBuf,
        /// Dump the full slide object model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render an HTML preview
    Preview {
        input: PathBuf,
        /// Output file (default: input with .html extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show speaker notes under each slide
        #[arg(short, long)]
        notes: bool,
        /// Theme id (default: the deck's own, then "default")
        #[arg(short, long)]
        theme: Option<String>,
    },
    /// Export to PowerPoint, or a bundle zip with --bundle
    Export {
        input: PathBuf,
        /// Output file (default: input with .pptx or .zip extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        theme: Option<String>,
        /// Brand configuration JSON applied over the theme
        #[arg(short, long)]
        brand: Option<PathBuf>,
        /// Write a zip holding the Markdown, HTML preview and PPTX
        #[arg(long)]
        bundle: bool,
    },
    /// Set a key in a slide's YAML front matter
    SetYaml {
        input: PathBuf,
        /// Slide index, starting at 0
        slide: usize,
        key: String,
        value: String,
    },
    /// Move a slide to a new position
    Move {
        input: PathBuf,
        from: usize,
        to: usize,
    },
    /// Set the document theme
    Theme {
        input: PathBuf,
        id: String,
        /// Mesh background colours
        #[arg(long, value_delimiter = ',')]
        mesh: Option<Vec<String>>,
    },
    /// Replace a line (or the fenced block starting there)
    ReplaceLine {
        input: PathBuf,
        /// Line index, starting at 0
        line: usize,
        text: String,
    },
    /// Set an attribute in a line's trailing `{key=value}` tag
    Attr {
        input: PathBuf,
        line: usize,
        key: String,
        /// Empty to remove the key
        value: String,
    },
    /// Re-render the HTML preview whenever the file changes
    Watch {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        theme: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Inspect { input, json } => inspect(input, *json),
        Command::Preview {
            input,
            output,
            notes,
            theme,
        } => preview(input, output.as_deref(), *notes, theme.as_deref()),
        Command::Export {
            input,
            output,
            theme,
            brand,
            bundle,
        } => export(input, output.as_deref(), theme.as_deref(), brand.as_deref(), *bundle),
        Command::SetYaml {
            input,
            slide,
            key,
            value,
        } => edit(input, args.print, |content| update_slide_yaml(content, *slide, key, value)),
        Command::Move { input, from, to } => {
            edit(input, args.print, |content| reorder_slides(content, *from, *to))
        }
        Command::Theme { input, id, mesh } => {
            edit(input, args.print, |content| update_global_theme(content, id, mesh.as_deref()))
        }
        Command::ReplaceLine { input, line, text } => {
            edit(input, args.print, |content| replace_line_or_block(content, *line, text))
        }
        Command::Attr {
            input,
            line,
            key,
            value,
        } => edit(input, args.print, |content| update_line_attribute(content, *line, key, value)),
        Command::Watch {
            input,
            output,
            theme,
        } => watch(input, output.as_deref(), theme.as_deref()),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// The theme named on the command line, else the deck's, else the default.
fn resolve_theme(deck: &Presentation, requested: Option<&str>) -> Theme {
    let id = requested
        .map(str::to_string)
        .or_else(|| deck.theme_id())
        .unwrap_or_else(|| "default".to_string());
    Theme::resolve(&id)
}

fn output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension(extension))
}

fn inspect(input: &Path, json: bool) -> Result<()> {
    let deck = Presentation::from_markdown(&read_source(input)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&deck)?);
        return Ok(());
    }

    println!("{} slides", deck.slides.len());
    if let Some(title) = deck.title() {
        println!("Title: {}", title);
    }
    for slide in &deck.slides {
        let title = slide.title().unwrap_or("(untitled)");
        println!(
            "{:>3}. {} [{}] line {}",
            slide.index,
            title,
            slide.layout,
            slide.source_line + 1
        );
        let regions: Vec<String> = slide
            .regions
            .iter()
            .filter(|r| !r.blocks.is_empty())
            .map(|r| format!("{}: {}", region_name(r.kind), r.blocks.len()))
            .collect();
        if !regions.is_empty() {
            println!("     {}", regions.join(", "));
        }
        if slide.notes.is_some() {
            println!("     has notes");
        }
    }
    Ok(())
}

fn region_name(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Header => "header",
        RegionKind::Main => "main",
        RegionKind::Column => "column",
        RegionKind::Background => "background",
        RegionKind::Footer => "footer",
    }
}

fn preview(input: &Path, output: Option<&Path>, notes: bool, theme: Option<&str>) -> Result<()> {
    let deck = Presentation::from_markdown(&read_source(input)?);
    let theme = resolve_theme(&deck, theme);
    let html = render_html(&deck, &theme, &HtmlOptions::default().with_notes(notes));
    let path = output_path(input, output, "html");
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Preview written to {}", path.display());
    Ok(())
}

fn export(
    input: &Path,
    output: Option<&Path>,
    theme: Option<&str>,
    brand: Option<&Path>,
    bundle: bool,
) -> Result<()> {
    let markdown = read_source(input)?;
    let deck = Presentation::from_markdown(&markdown);
    let mut theme = resolve_theme(&deck, theme);
    if let Some(brand) = brand {
        let config = BrandConfig::load(brand)
            .with_context(|| format!("Failed to load brand configuration {}", brand.display()))?;
        theme = theme.with_brand(&config);
    }

    let mut exporter = Exporter::default();
    if let Some(dir) = input.parent() {
        exporter = exporter.with_base_dir(dir);
    }

    if bundle {
        let path = output_path(input, output, "zip");
        exporter
            .export_bundle(&markdown, &deck, &theme, &path)
            .with_context(|| format!("Failed to export bundle {}", path.display()))?;
        eprintln!("Written to: {}", path.display());
    } else {
        let path = output_path(input, output, "pptx");
        exporter
            .export_pptx(&deck, &theme, &path)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        eprintln!("Written to: {}", path.display());
    }
    Ok(())
}

/// Apply a text edit to the file, or print the result with `--print`.
fn edit(input: &Path, print: bool, apply: impl FnOnce(&str) -> String) -> Result<()> {
    let content = read_source(input)?;
    let updated = apply(&content);
    if print {
        print!("{}", updated);
        return Ok(());
    }
    if updated == content {
        log::warn!("No changes made to {}", input.display());
        return Ok(());
    }
    fs::write(input, updated).with_context(|| format!("Failed to write {}", input.display()))?;
    log::info!("Updated {}", input.display());
    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn watch(input: &Path, output: Option<&Path>, theme: Option<&str>) -> Result<()> {
    let path = output_path(input, output, "html");
    let requested = theme.map(str::to_string);
    let target = path.clone();
    let session = PreviewSession::new(move |deck| {
        let theme = resolve_theme(&deck, requested.as_deref());
        let html = render_html(&deck, &theme, &HtmlOptions::default());
        match fs::write(&target, html) {
            Ok(()) => eprintln!("Rendered {} slides to {}", deck.slides.len(), target.display()),
            Err(e) => log::error!("Failed to write {}: {}", target.display(), e),
        }
    })
    .context("Failed to start preview session")?;

    eprintln!("Watching {} (Ctrl+C to stop)", input.display());
    let mut last_seen = None;
    loop {
        let stamp = modified(input);
        if stamp != last_seen {
            last_seen = stamp;
            match fs::read_to_string(input) {
                Ok(content) => session.submit(content),
                Err(e) => log::warn!("Failed to read {}: {}", input.display(), e),
            }
        }
        thread::sleep(Duration::from_millis(200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_subcommands() {
        let args = Args::parse_from([
            "slidemark", "set-yaml", "deck.md", "1", "layout", "grid", "--print",
        ]);
        assert!(args.print);
        let Command::SetYaml { slide, key, value, .. } = args.command else {
            panic!("expected set-yaml");
        };
        assert_eq!((slide, key.as_str(), value.as_str()), (1, "layout", "grid"));

        let args = Args::parse_from([
            "slidemark", "theme", "deck.md", "aurora", "--mesh", "#111,#222",
        ]);
        let Command::Theme { mesh, .. } = args.command else {
            panic!("expected theme");
        };
        assert_eq!(mesh, Some(vec!["#111".to_string(), "#222".to_string()]));
    }

    #[test]
    fn test_theme_resolution_order() {
        let deck = Presentation::from_markdown("---\ntheme: dark\n---\n# A\n");
        assert_eq!(resolve_theme(&deck, None).id, "dark");
        assert_eq!(resolve_theme(&deck, Some("paper")).id, "paper");
        assert_eq!(resolve_theme(&Presentation::default(), None).id, "default");
    }

    #[test]
    fn test_output_path_defaults_to_input_stem() {
        assert_eq!(
            output_path(Path::new("talk/deck.md"), None, "pptx"),
            PathBuf::from("talk/deck.pptx")
        );
        assert_eq!(
            output_path(Path::new("deck.md"), Some(Path::new("out.zip")), "zip"),
            PathBuf::from("out.zip")
        );
    }
}
