//! Replacement rendering

use ao_core::RenderMethod;

use crate::reference::{AttachmentReference, ReferenceKind};

/// Render the text that replaces `reference` once its file lives at `url`.
///
/// `file_stem` is the resolved file's name without extension, used as the
/// link label when the reference carries none.
pub fn render_replacement(
    reference: &AttachmentReference,
    url: &str,
    method: RenderMethod,
    file_stem: &str,
) -> String {
    let href = match &reference.suffix {
        Some(suffix) => format!("{}{}", url, suffix),
        None => url.to_string(),
    };

    match method {
        RenderMethod::Image => {
            // Wiki embeds have no portable alt slot
            let alt = match reference.kind {
                ReferenceKind::MarkdownEmbed => reference.label.as_deref().unwrap_or(""),
                _ => "",
            };
            format!("![{}](<{}>)", escape_link_text(alt), href)
        }
        RenderMethod::Frame => format!(r#"<iframe src="{}"></iframe>"#, escape_attribute(&href)),
        RenderMethod::Link => {
            let label = reference
                .label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .unwrap_or(file_stem);
            format!("[{}](<{}>)", escape_link_text(label), href)
        }
    }
}

/// Backslash-escape brackets that are not already escaped
fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if matches!(c, '[' | ']') && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
