// src/main.rs
//
// markdown2html: line-oriented Markdown subset to HTML
//
// - Inline rules run on every line (list markers and blank lines included), in this
//   order, each as one non-greedy, non-overlapping pass over the line:
//     • **text**  → <b>text</b>
//     • __text__  → <em>text</em>
//     • [[text]]  → lowercase hex MD5 digest of text
//     • ((text))  → text with every 'c' and 'C' removed
//   Unpaired markers stay literal.
// - Block rules, first match wins:
//     • "- " at start of line → <li> inside <ul>
//     • "* " at start of line → <li> inside <ol>
//     • anything else closes an open list, then:
//         blank  → closes an open paragraph
//         text   → opens a paragraph if needed, emits the trimmed line + "<br/>"
// - At end of input an open paragraph is closed. An open list is left as is.
//
// Usage: markdown2html <INPUT> <OUTPUT>
//   Fewer than two paths or a missing input file exit with status 1.
//   Arguments past the output path are ignored.
//   Set RUST_LOG=debug for diagnostics on stderr.

use clap::Parser;
use md5::{Digest, Md5};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::LazyLock;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// CLI arguments
///
/// Only the first two arguments count. There are no flags: every argument is
/// a path, even one starting with '-', and anything past the output is ignored.
#[derive(Parser)]
#[command(about, disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Markdown input file
    #[arg(allow_hyphen_values = true)]
    input: PathBuf,

    /// HTML output file (created or truncated)
    #[arg(allow_hyphen_values = true)]
    output: PathBuf,

    #[arg(hide = true, allow_hyphen_values = true)]
    _extra: Vec<OsString>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), ConvertError> {
    let cli = Cli::try_parse().map_err(|_| ConvertError::Usage)?;

    if !cli.input.exists() {
        return Err(ConvertError::MissingInput(cli.input));
    }

    debug!(input = %cli.input.display(), output = %cli.output.display(), "converting");

    let reader = BufReader::new(File::open(&cli.input)?);
    let mut writer = BufWriter::new(File::create(&cli.output)?);
    let lines = convert(reader, &mut writer)?;
    writer.flush()?;

    debug!(lines, "conversion finished");
    Ok(())
}

/* ================================ Errors ================================= */

#[derive(Debug, thiserror::Error)]
enum ConvertError {
    #[error("Usage: markdown2html README.md README.html")]
    Usage,

    #[error("Missing {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/* =========================== Inline substitution ========================= */

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.*?)__").unwrap());

static HASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());

static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\((.*?)\)\)").unwrap());

fn convert_bold(line: &str) -> Cow<'_, str> {
    BOLD_RE.replace_all(line, "<b>${1}</b>")
}

fn convert_emphasis(line: &str) -> Cow<'_, str> {
    EMPHASIS_RE.replace_all(line, "<em>${1}</em>")
}

/// Replace each `[[text]]` span with the MD5 digest of `text`.
fn convert_hash(line: &str) -> Cow<'_, str> {
    HASH_RE.replace_all(line, |caps: &Captures| md5_hex(&caps[1]))
}

/// Replace each `((text))` span with `text` minus its `c`/`C` characters.
fn convert_strip(line: &str) -> Cow<'_, str> {
    STRIP_RE.replace_all(line, |caps: &Captures| caps[1].replace(['c', 'C'], ""))
}

fn md5_hex(text: &str) -> String {
    hex::encode(Md5::digest(text.as_bytes()))
}

/// Run all inline rules over one line. Order matters: each rule sees the
/// output of the previous one, never its own.
fn substitute_inline(line: &str) -> String {
    let line = convert_bold(line);
    let line = convert_emphasis(&line);
    let line = convert_hash(&line);
    convert_strip(&line).into_owned()
}

/* ========================== Tagging state machine ======================== */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    /// `- item`
    Unordered,
    /// `* item`. Rendered as `<ol>` even though the marker is a bullet.
    Ordered,
}

impl ListKind {
    fn of_line(line: &str) -> Option<Self> {
        if line.starts_with("- ") {
            Some(Self::Unordered)
        } else if line.starts_with("* ") {
            Some(Self::Ordered)
        } else {
            None
        }
    }

    fn marker(self) -> char {
        match self {
            Self::Unordered => '-',
            Self::Ordered => '*',
        }
    }

    fn open_tag(self) -> &'static str {
        match self {
            Self::Unordered => "<ul>\n",
            Self::Ordered => "<ol>\n",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            Self::Unordered => "</ul>\n",
            Self::Ordered => "</ol>\n",
        }
    }
}

/// Open blocks carried from one line to the next.
///
/// `list` being `Some` is what "in a list" means, so a list is never open
/// without a kind.
#[derive(Debug, Default, PartialEq, Eq)]
struct TaggingState {
    list: Option<ListKind>,
    in_paragraph: bool,
}

impl TaggingState {
    /// Classify one substituted line (terminator included) and append the
    /// HTML it produces to `out`.
    fn tag_line(&mut self, line: &str, out: &mut String) {
        if let Some(kind) = ListKind::of_line(line) {
            if self.list != Some(kind) {
                self.close_list(out);
                trace!(?kind, "open list");
                out.push_str(kind.open_tag());
                self.list = Some(kind);
            }
            // Marker characters are stripped from both ends of the raw line. The
            // terminator is still attached, so a trailing marker before '\n' survives.
            let marker = kind.marker();
            let item = line.trim_matches(|c| c == marker || c == ' ').trim();
            out.push_str("<li>");
            out.push_str(item);
            out.push_str("</li>\n");
            return;
        }

        self.close_list(out);

        let text = line.trim();
        if text.is_empty() {
            if self.in_paragraph {
                out.push_str("</p>\n");
                self.in_paragraph = false;
            }
        } else {
            if !self.in_paragraph {
                out.push_str("<p>\n");
                self.in_paragraph = true;
            }
            out.push_str(text);
            out.push_str("<br/>\n");
        }
    }

    fn close_list(&mut self, out: &mut String) {
        if let Some(kind) = self.list.take() {
            trace!(?kind, "close list");
            out.push_str(kind.close_tag());
        }
    }

    /// End of input: close a dangling paragraph. A dangling list stays open.
    fn finish(self, out: &mut String) {
        if self.in_paragraph {
            out.push_str("</p>\n");
        }
    }
}

/* ================================ Driver ================================= */

fn normalize_eol(line: &str) -> Cow<'_, str> {
    match line.strip_suffix("\r\n") {
        Some(body) => Cow::Owned(format!("{body}\n")),
        None => Cow::Borrowed(line),
    }
}

/// Stream `reader` through the converter into `writer`, one line at a time.
/// Returns the number of lines read.
fn convert<R: BufRead, W: Write>(mut reader: R, writer: &mut W) -> io::Result<usize> {
    let mut state = TaggingState::default();
    let mut raw = String::new();
    let mut html = String::new();
    let mut count = 0usize;

    loop {
        raw.clear();
        if reader.read_line(&mut raw)? == 0 {
            break;
        }
        count += 1;

        html.clear();
        let line = substitute_inline(&normalize_eol(&raw));
        state.tag_line(&line, &mut html);
        writer.write_all(html.as_bytes())?;
    }

    html.clear();
    state.finish(&mut html);
    writer.write_all(html.as_bytes())?;
    Ok(count)
}
