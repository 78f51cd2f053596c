//! Reference scanner
//!
//! Four independent matchers run over the whole text:
//! - Wiki embeds: `![[target]]`, `![[target|label]]`
//! - Wiki links: `[[target]]` not preceded by `!`
//! - Markdown embeds: `![alt](dest)`
//! - Markdown links: `[text](dest)` not preceded by `!`
//!
//! Results are merged and ordered by start offset. Matches from different
//! matchers may overlap; deciding what is actionable is left to the caller.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::reference::{AttachmentReference, ReferenceKind};

/// Inner text runs to the first `]]`
static WIKI_EMBED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[(.+?)\]\]").expect("wiki embed regex"));

static WIKI_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.+?)\]\]").expect("wiki link regex"));

/// Link text holds no brackets, so an image nested in link text only matches
/// as the image. Destination is either `<...>` plus an optional title, or
/// text up to the first unescaped `)`
static MARKDOWN_EMBED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\[\]\n]*)\]\((<[^>\n]*>[^)\n]*|(?:\\.|[^)\\\n])*)\)")
        .expect("markdown embed regex")
});

static MARKDOWN_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]\n]*)\]\((<[^>\n]*>[^)\n]*|(?:\\.|[^)\\\n])*)\)")
        .expect("markdown link regex")
});

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(.*?)\s+(?:"[^"]*"|'[^']*')$"#).expect("link title regex")
});

/// Find every reference in `text`, ordered by start offset
pub fn scan_references(text: &str) -> Vec<AttachmentReference> {
    let mut references = Vec::new();

    scan_wiki(text, &WIKI_EMBED_PATTERN, ReferenceKind::WikiEmbed, &mut references);
    scan_wiki(text, &WIKI_LINK_PATTERN, ReferenceKind::WikiLink, &mut references);
    scan_markdown(
        text,
        &MARKDOWN_EMBED_PATTERN,
        ReferenceKind::MarkdownEmbed,
        &mut references,
    );
    scan_markdown(
        text,
        &MARKDOWN_LINK_PATTERN,
        ReferenceKind::MarkdownLink,
        &mut references,
    );

    references.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(a.span.end.cmp(&b.span.end))
    });
    references
}

fn preceded_by_bang(text: &str, offset: usize) -> bool {
    offset > 0 && text.as_bytes()[offset - 1] == b'!'
}

fn scan_wiki(text: &str, pattern: &Regex, kind: ReferenceKind, out: &mut Vec<AttachmentReference>) {
    for cap in pattern.captures_iter(text) {
        let Some(full) = cap.get(0) else { continue };
        if kind == ReferenceKind::WikiLink && preceded_by_bang(text, full.start()) {
            continue;
        }

        let (target, label) = decode_wiki_inner(group(&cap, 1));
        out.push(AttachmentReference {
            kind,
            span: full.start()..full.end(),
            raw: full.as_str().to_string(),
            target,
            label,
            suffix: None,
        });
    }
}

fn scan_markdown(text: &str, pattern: &Regex, kind: ReferenceKind, out: &mut Vec<AttachmentReference>) {
    for cap in pattern.captures_iter(text) {
        let Some(full) = cap.get(0) else { continue };
        if kind == ReferenceKind::MarkdownLink && preceded_by_bang(text, full.start()) {
            continue;
        }

        let label = Some(group(&cap, 1).to_string()).filter(|l| !l.is_empty());
        let (target, suffix) = decode_markdown_destination(group(&cap, 2));
        out.push(AttachmentReference {
            kind,
            span: full.start()..full.end(),
            raw: full.as_str().to_string(),
            target,
            label,
            suffix,
        });
    }
}

fn group<'t>(cap: &Captures<'t>, index: usize) -> &'t str {
    cap.get(index).map(|m| m.as_str()).unwrap_or("")
}

/// `path#heading|label` -> (`path`, `label`)
fn decode_wiki_inner(inner: &str) -> (String, Option<String>) {
    let (path, label) = match inner.split_once('|') {
        Some((path, label)) => (path, Some(label.trim().to_string())),
        None => (inner, None),
    };

    // Headings and block refs point inside notes, never inside attachments
    let path = match path.find(['#', '^']) {
        Some(idx) => &path[..idx],
        None => path,
    };

    (path.trim().to_string(), label.filter(|l| !l.is_empty()))
}

/// `<a b.pdf>#page=2` or `a.pdf#page=2 "Title"` -> (`a.pdf`, `#page=2`)
fn decode_markdown_destination(dest: &str) -> (String, Option<String>) {
    let dest = dest.trim();

    let path = match dest.strip_prefix('<') {
        Some(rest) => match rest.find('>') {
            Some(end) => &rest[..end],
            None => rest,
        },
        None => TITLE_PATTERN
            .captures(dest)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str())
            .unwrap_or(dest),
    };

    match path.find(['#', '?']) {
        Some(idx) => (path[..idx].to_string(), Some(path[idx..].to_string())),
        None => (path.to_string(), None),
    }
}
