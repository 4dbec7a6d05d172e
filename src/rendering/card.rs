//! Result cards: image plus a details panel revealed on hover.

use crate::rendering::dom::{Display, Document, EventKind, NodeId};
use crate::rendering::markup::{insert_markup, DescriptionPolicy};
use crate::GalleryItem;

/// Display width of the card image
pub const IMAGE_WIDTH: u32 = 270;

/// Knobs for card rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Value of the image's `width` attribute
    pub image_width: u32,
    /// How the description markup is inserted
    pub description: DescriptionPolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            image_width: IMAGE_WIDTH,
            description: DescriptionPolicy::default(),
        }
    }
}

/// Build a `div.result` card for `item` with default options.
pub fn render_result(doc: &mut Document, item: &GalleryItem) -> NodeId {
    render_result_with(doc, item, &RenderOptions::default())
}

/// Build a `div.result` card: the image followed by the details panel.
///
/// Pointer-enter on the card shows the details (`display: block`),
/// pointer-leave hides them again (`display: none`).
pub fn render_result_with(
    doc: &mut Document,
    item: &GalleryItem,
    options: &RenderOptions,
) -> NodeId {
    let wrapper = doc.create_element("div");
    doc.set_attribute(wrapper, "class", "result");

    let img = doc.create_element("img");
    doc.set_attribute(img, "src", &item.image_url);
    doc.set_attribute(img, "width", &options.image_width.to_string());

    let details = render_details_with(doc, item, options.description);
    doc.append_child(wrapper, img);
    doc.append_child(wrapper, details);

    doc.add_event_listener(wrapper, EventKind::PointerEnter, move |doc, _| {
        doc.set_display(details, Some(Display::Block));
    });
    doc.add_event_listener(wrapper, EventKind::PointerLeave, move |doc, _| {
        doc.set_display(details, Some(Display::None));
    });
    wrapper
}

/// Build the hidden `div.details` panel with default description handling.
pub fn render_details(doc: &mut Document, item: &GalleryItem) -> NodeId {
    render_details_with(doc, item, DescriptionPolicy::default())
}

/// Build the hidden `div.details` panel: a strip of `div.keyword-box`
/// entries in keyword order, then a `p` holding the description.
pub fn render_details_with(
    doc: &mut Document,
    item: &GalleryItem,
    policy: DescriptionPolicy,
) -> NodeId {
    let details = doc.create_element("div");
    doc.set_attribute(details, "class", "details");
    doc.set_display(details, Some(Display::None));

    let keywords = doc.create_element("div");
    for keyword in &item.keywords {
        let bx = doc.create_element("div");
        doc.set_attribute(bx, "class", "keyword-box");
        let text = doc.create_text(keyword);
        doc.append_child(bx, text);
        doc.append_child(keywords, bx);
    }

    let description = doc.create_element("p");
    insert_markup(doc, description, &item.description, policy);

    doc.append_child(details, keywords);
    doc.append_child(details, description);
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(keywords: &[&str]) -> GalleryItem {
        GalleryItem {
            image_url: "https://img.example/1.png".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            description: "A <em>red</em> dragon".to_string(),
        }
    }

    fn details_of(doc: &Document, card: NodeId) -> NodeId {
        doc.find_by_class(card, "details")[0]
    }

    #[test]
    fn card_layout() {
        let mut doc = Document::new();
        let card = render_result(&mut doc, &item(&["fire", "wings"]));
        assert!(doc.has_class(card, "result"));
        let children = doc.children(card).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag(children[0]), Some("img"));
        assert_eq!(doc.attribute(children[0], "src"), Some("https://img.example/1.png"));
        assert_eq!(doc.attribute(children[0], "width"), Some("270"));
        assert!(doc.has_class(children[1], "details"));
        assert_eq!(doc.listener_count(card, EventKind::PointerEnter), 1);
        assert_eq!(doc.listener_count(card, EventKind::PointerLeave), 1);
        assert_eq!(doc.listener_count(children[1], EventKind::PointerEnter), 0);
    }

    #[test]
    fn keyword_boxes_follow_input_order() {
        for n in [0usize, 1, 5, 40] {
            let words: Vec<String> = (0..n).map(|i| format!("kw{}", i)).collect();
            let refs: Vec<&str> = words.iter().map(String::as_str).collect();
            let mut doc = Document::new();
            let card = render_result(&mut doc, &item(&refs));
            let boxes = doc.find_by_class(card, "keyword-box");
            assert_eq!(boxes.len(), n);
            for (b, w) in boxes.iter().zip(&words) {
                assert_eq!(&doc.text_content(*b), w);
            }
        }
    }

    #[test]
    fn keyword_text_is_not_parsed_as_markup() {
        let mut doc = Document::new();
        let details = render_details(&mut doc, &item(&["<b>x</b>"]));
        let boxes = doc.find_by_class(details, "keyword-box");
        assert_eq!(doc.text_content(boxes[0]), "<b>x</b>");
        assert!(doc.find_by_tag(details, "b").is_empty());
    }

    #[test]
    fn description_is_markup() {
        let mut doc = Document::new();
        let details = render_details(&mut doc, &item(&[]));
        let p = doc.find_by_tag(details, "p")[0];
        assert_eq!(doc.find_by_tag(p, "em").len(), 1);
        assert_eq!(doc.text_content(p), "A red dragon");
    }

    #[test]
    fn hover_toggles_details() {
        let mut doc = Document::new();
        let card = render_result(&mut doc, &item(&["a"]));
        let details = details_of(&doc, card);
        assert!(!doc.is_displayed(details));
        for _ in 0..5 {
            doc.dispatch(card, EventKind::PointerEnter);
            assert!(doc.is_displayed(details));
            assert_eq!(doc.display(details), Some(Display::Block));
            doc.dispatch(card, EventKind::PointerLeave);
            assert!(!doc.is_displayed(details));
        }
    }

    #[test]
    fn repeated_enter_is_idempotent() {
        let mut doc = Document::new();
        let card = render_result(&mut doc, &item(&[]));
        let details = details_of(&doc, card);
        doc.dispatch(card, EventKind::PointerEnter);
        doc.dispatch(card, EventKind::PointerEnter);
        assert!(doc.is_displayed(details));
        doc.dispatch(card, EventKind::PointerLeave);
        doc.dispatch(card, EventKind::PointerLeave);
        assert!(!doc.is_displayed(details));
    }

    #[test]
    fn custom_width_and_plain_text_description() {
        let opts = RenderOptions {
            image_width: 128,
            description: DescriptionPolicy::PlainText,
        };
        let mut doc = Document::new();
        let card = render_result_with(&mut doc, &item(&[]), &opts);
        let img = doc.find_by_tag(card, "img")[0];
        assert_eq!(doc.attribute(img, "width"), Some("128"));
        assert!(doc.find_by_tag(card, "em").is_empty());
    }

    #[test]
    fn serialized_card() {
        let mut doc = Document::new();
        let card = render_result(&mut doc, &item(&["fire"]));
        assert_eq!(
            doc.to_html(card),
            "<div class=\"result\"><img src=\"https://img.example/1.png\" width=\"270\">\
             <div class=\"details\" style=\"display: none\">\
             <div><div class=\"keyword-box\">fire</div></div>\
             <p>A <em>red</em> dragon</p></div></div>"
        );
    }
}
