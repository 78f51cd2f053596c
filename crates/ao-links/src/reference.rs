//! Reference and replacement types

use std::ops::Range;

/// The four reference syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `![[target]]`
    WikiEmbed,
    /// `[[target]]`
    WikiLink,
    /// `![alt](dest)`
    MarkdownEmbed,
    /// `[text](dest)`
    MarkdownLink,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WikiEmbed => "wiki-embed",
            Self::WikiLink => "wiki-link",
            Self::MarkdownEmbed => "markdown-embed",
            Self::MarkdownLink => "markdown-link",
        }
    }

    pub fn is_embed(&self) -> bool {
        matches!(self, Self::WikiEmbed | Self::MarkdownEmbed)
    }

    pub fn is_wiki(&self) -> bool {
        matches!(self, Self::WikiEmbed | Self::WikiLink)
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One matched reference in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReference {
    pub kind: ReferenceKind,
    /// Half-open byte range into the scanned text
    pub span: Range<usize>,
    /// The matched text, exactly as written
    pub raw: String,
    /// Link destination with wrapper syntax, alias and suffix removed
    pub target: String,
    /// Alias (wiki) or alt/link text (markdown)
    pub label: Option<String>,
    /// Fragment or query (`#page=3`, `?v=2`) split off a markdown destination
    pub suffix: Option<String>,
}

impl AttachmentReference {
    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    /// Whether two references share at least one byte
    pub fn overlaps(&self, other: &AttachmentReference) -> bool {
        self.span.start < other.span.end && other.span.start < self.span.end
    }
}

/// A pending edit: replace `text[start..end]` with `new_text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSpan {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl ReplacementSpan {
    pub fn new(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            new_text: new_text.into(),
        }
    }

    /// Build the edit for a reference, or `None` when the rendering would
    /// reproduce the original text.
    pub fn for_reference(reference: &AttachmentReference, new_text: impl Into<String>) -> Option<Self> {
        let new_text = new_text.into();
        if new_text == reference.raw {
            return None;
        }
        Some(Self::new(reference.span.start, reference.span.end, new_text))
    }

    /// Length change this edit applies to the document
    pub fn delta(&self) -> isize {
        self.new_text.len() as isize - (self.end - self.start) as isize
    }
}
