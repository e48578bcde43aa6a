//! Blank/comment/code classification from per-language comment markers.
//!
//! A line is:
//! - **blank** when it holds only whitespace (or only whitespace inside an
//!   open block comment)
//! - **comment** when every non-whitespace character belongs to a comment
//! - **code** when anything else appears on it
//!
//! Comment markers inside string literals are ignored. Strings are tracked
//! within a line only; a block comment can span any number of lines.

use std::io::BufRead;
use std::path::Path;

use crate::stats::LineCounts;

/// Comment syntax of one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    /// Exact file names (case-sensitive), for files without an extension
    pub file_names: &'static [&'static str],
    pub line_comments: &'static [&'static str],
    pub block_comments: &'static [(&'static str, &'static str)],
    pub quotes: &'static [char],
}

const C_BLOCK: &[(&str, &str)] = &[("/*", "*/")];
const C_LINE: &[&str] = &["//"];
const HASH: &[&str] = &["#"];
const DQ: &[char] = &['"'];
const DQ_SQ: &[char] = &['"', '\''];
const DQ_SQ_BT: &[char] = &['"', '\'', '`'];
const NO_QUOTES: &[char] = &[];
const NONE: &[&str] = &[];
const NO_BLOCK: &[(&str, &str)] = &[];

macro_rules! lang {
    ($name:expr, [$($ext:expr),*], [$($file:expr),*], $line:expr, $block:expr, $quotes:expr) => {
        Language {
            name: $name,
            extensions: &[$($ext),*],
            file_names: &[$($file),*],
            line_comments: $line,
            block_comments: $block,
            quotes: $quotes,
        }
    };
}

/// Languages the default scanner counts.
pub static LANGUAGES: &[Language] = &[
    lang!("Rust", ["rs"], [], C_LINE, C_BLOCK, DQ),
    lang!("C", ["c", "h"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("C++", ["cc", "cpp", "cxx", "hpp", "hh", "hxx"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("C#", ["cs"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Java", ["java"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Kotlin", ["kt", "kts"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Scala", ["scala", "sc"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Groovy", ["groovy", "gradle"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Go", ["go"], [], C_LINE, C_BLOCK, DQ_SQ_BT),
    lang!("JavaScript", ["js", "jsx", "mjs", "cjs"], [], C_LINE, C_BLOCK, DQ_SQ_BT),
    lang!("TypeScript", ["ts", "tsx", "mts", "cts"], [], C_LINE, C_BLOCK, DQ_SQ_BT),
    lang!("Swift", ["swift"], [], C_LINE, C_BLOCK, DQ),
    lang!("Dart", ["dart"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Objective-C", ["m", "mm"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("PHP", ["php"], [], &["//", "#"], C_BLOCK, DQ_SQ),
    lang!("CSS", ["css"], [], NONE, C_BLOCK, DQ_SQ),
    lang!("SCSS", ["scss", "less"], [], C_LINE, C_BLOCK, DQ_SQ),
    lang!("Python", ["py", "pyw"], [], HASH, NO_BLOCK, DQ_SQ),
    lang!("Ruby", ["rb", "rake"], ["Rakefile", "Gemfile"], HASH, &[("=begin", "=end")], DQ_SQ),
    lang!("Shell", ["sh", "bash", "zsh", "ksh"], [], HASH, NO_BLOCK, DQ_SQ),
    lang!("PowerShell", ["ps1", "psm1"], [], HASH, &[("<#", "#>")], DQ_SQ),
    lang!("Perl", ["pl", "pm"], [], HASH, NO_BLOCK, DQ_SQ),
    lang!("R", ["r"], [], HASH, NO_BLOCK, DQ_SQ),
    lang!("Elixir", ["ex", "exs"], [], HASH, NO_BLOCK, DQ),
    lang!("Terraform", ["tf", "tfvars", "hcl"], [], &["#", "//"], C_BLOCK, DQ),
    lang!("YAML", ["yml", "yaml"], [], HASH, NO_BLOCK, DQ_SQ),
    lang!("Makefile", ["mk"], ["Makefile", "makefile", "GNUmakefile"], HASH, NO_BLOCK, DQ_SQ),
    lang!("Dockerfile", ["dockerfile"], ["Dockerfile"], HASH, NO_BLOCK, DQ_SQ),
    lang!("SQL", ["sql"], [], &["--"], C_BLOCK, &['\'']),
    lang!("Lua", ["lua"], [], &["--"], &[("--[[", "]]")], DQ_SQ),
    lang!("Haskell", ["hs"], [], &["--"], &[("{-", "-}")], DQ),
    lang!("Erlang", ["erl", "hrl"], [], &["%"], NO_BLOCK, DQ),
    lang!("Clojure", ["clj", "cljs", "cljc", "edn"], [], &[";"], NO_BLOCK, DQ),
    lang!("F#", ["fs", "fsi", "fsx"], [], C_LINE, &[("(*", "*)")], DQ),
    lang!("OCaml", ["ml", "mli"], [], NONE, &[("(*", "*)")], DQ),
    lang!("Visual Basic", ["vb", "vbs"], [], &["'"], NO_BLOCK, DQ),
    lang!("HTML", ["html", "htm", "xhtml"], [], NONE, &[("<!--", "-->")], NO_QUOTES),
    lang!("XML", ["xml", "xsd", "xsl", "csproj", "vbproj"], [], NONE, &[("<!--", "-->")], NO_QUOTES),
    lang!("Vue", ["vue", "svelte"], [], C_LINE, &[("<!--", "-->"), ("/*", "*/")], NO_QUOTES),
];

/// Find the language for a path by file name, then by extension (case-insensitive).
pub fn language_for(path: &Path) -> Option<&'static Language> {
    let file_name = path.file_name()?.to_str()?;

    if let Some(lang) = LANGUAGES.iter().find(|l| l.file_names.contains(&file_name)) {
        return Some(lang);
    }

    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    LANGUAGES.iter().find(|l| l.extensions.contains(&ext.as_str()))
}

#[derive(Debug, Default)]
struct State {
    /// Index into `block_comments` of the open block comment
    in_block: Option<usize>,
}

/// What a single line contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Code,
}

fn classify(line: &str, lang: &Language, state: &mut State) -> LineKind {
    let mut has_code = false;
    let mut has_comment = false;
    let mut in_string: Option<char> = None;
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        if let Some(block) = state.in_block {
            let close = lang.block_comments[block].1;
            if rest.starts_with(close) {
                state.in_block = None;
                has_comment = true;
                i += close.len();
            } else {
                if !c.is_whitespace() {
                    has_comment = true;
                }
                i += c.len_utf8();
            }
            continue;
        }

        if let Some(quote) = in_string {
            if c == '\\' {
                i += c.len_utf8();
                if let Some(escaped) = line[i..].chars().next() {
                    i += escaped.len_utf8();
                }
                continue;
            }
            if c == quote {
                in_string = None;
            }
            i += c.len_utf8();
            continue;
        }

        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }

        // Block openers first: `--[[` must win over `--`
        if let Some((index, (open, _))) = lang
            .block_comments
            .iter()
            .enumerate()
            .find(|(_, (open, _))| rest.starts_with(open))
        {
            state.in_block = Some(index);
            has_comment = true;
            i += open.len();
            continue;
        }

        if lang.line_comments.iter().any(|m| rest.starts_with(m)) {
            has_comment = true;
            break;
        }

        has_code = true;
        if lang.quotes.contains(&c) {
            in_string = Some(c);
        }
        i += c.len_utf8();
    }

    if has_code {
        LineKind::Code
    } else if has_comment {
        LineKind::Comment
    } else {
        LineKind::Blank
    }
}

/// Count the lines of `reader` as source in `lang`.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn count_lines<R: BufRead>(mut reader: R, lang: &Language) -> std::io::Result<LineCounts> {
    let mut counts = LineCounts::new();
    let mut state = State::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        match classify(&line, lang, &mut state) {
            LineKind::Blank => counts.blank += 1,
            LineKind::Comment => counts.comment += 1,
            LineKind::Code => counts.code += 1,
        }
    }

    Ok(counts)
}
