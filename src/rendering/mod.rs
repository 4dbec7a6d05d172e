//! Gallery card rendering

pub mod card;
pub mod dom;
pub mod markup;

pub use card::{
    render_details, render_details_with, render_result, render_result_with, RenderOptions,
    IMAGE_WIDTH,
};
pub use dom::{Display, Document, EventKind, NodeId};
pub use markup::DescriptionPolicy;

/// Turn model-generated plain text into an HTML snippet: surrounding newlines
/// are trimmed, the text is escaped and inner line breaks become `<br/>`.
pub fn text_to_html(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n");
    dom::escape_text(normalized.trim_matches('\n')).replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_to_html_breaks_lines() {
        assert_eq!(
            text_to_html("\n\nRoses are red,\nviolets are <blue>\n"),
            "Roses are red,<br/>violets are &lt;blue&gt;"
        );
        assert_eq!(text_to_html(""), "");
    }
}
