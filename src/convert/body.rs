//! Choice of the HTML to render for a message.

use crate::model::{Message, Part, PartBody};

use super::charset::{decode_bytes, decode_text};
use super::inline::{resolve_inline, InlineStrategy, Inlined};

/// Build the HTML for `message`.
///
/// The first `text/html` body part wins, decoded with its charset and with
/// its `cid:` references resolved against every leaf of the message, since
/// images referenced by Content-ID are often also marked as attachments.
/// Without one, the plain-text body goes verbatim (not escaped) into a
/// `<pre>` block, which is empty when the message has no text at all.
pub fn select_body(
    message: &Message,
    strategy: InlineStrategy,
    resource_dir: Option<&str>,
) -> Inlined {
    let html_part = message.body_parts().into_iter().find_map(|p| match &p.body {
        PartBody::Text { charset, raw, .. } if p.mime.sub.eq_ignore_ascii_case("html") => {
            Some((raw, charset.as_deref()))
        }
        _ => None,
    });

    if let Some((raw, charset)) = html_part {
        let html = decode_bytes(raw, charset);
        let leaves: Vec<&Part> = message.leaves().collect();
        return resolve_inline(&html, &leaves, strategy, resource_dir);
    }

    let text = message
        .plain_text()
        .map(|(text, charset)| decode_text(text, charset))
        .unwrap_or_default();

    Inlined {
        html: format!("<pre>{text}</pre>"),
        resources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_wrapped_unescaped() {
        let msg = Message::new(None, Part::text("plain", None, "Hello <world>"));
        assert_eq!(
            select_body(&msg, InlineStrategy::DataUri, None).html,
            "<pre>Hello <world></pre>"
        );
    }

    #[test]
    fn test_html_preferred_over_plain() {
        let msg = Message::new(
            None,
            Part::container(
                "alternative",
                vec![
                    Part::text("plain", None, "fallback"),
                    Part::text("HTML", Some("iso-8859-1"), b"<p>caf\xE9</p>".to_vec()),
                ],
            ),
        );
        assert_eq!(select_body(&msg, InlineStrategy::DataUri, None).html, "<p>café</p>");
    }

    #[test]
    fn test_html_images_resolved() {
        let msg = Message::new(
            None,
            Part::container(
                "related",
                vec![
                    Part::text("html", None, r#"<img src="cid:logo1">"#),
                    Part::binary("image/png", b"png".to_vec()).with_content_id("logo1"),
                ],
            ),
        );
        assert_eq!(
            select_body(&msg, InlineStrategy::DataUri, None).html,
            r#"<img src="data:image/png;base64,cG5n">"#
        );
    }

    #[test]
    fn test_attached_image_with_content_id_is_inlined() {
        let mut img = Part::binary("image/png", b"png".to_vec()).with_content_id("img1");
        img.disposition = crate::model::Disposition::Attachment;
        let msg = Message::new(
            None,
            Part::container(
                "related",
                vec![Part::text("html", None, r#"<img src="cid:img1">"#), img],
            ),
        );
        assert_eq!(
            select_body(&msg, InlineStrategy::DataUri, None).html,
            r#"<img src="data:image/png;base64,cG5n">"#
        );
    }

    #[test]
    fn test_html_attachment_is_not_the_body() {
        let msg = Message::new(
            None,
            Part::container(
                "mixed",
                vec![
                    Part::text("plain", None, "body text"),
                    Part::text("html", None, "<p>page</p>").with_filename("page.html"),
                ],
            ),
        );
        assert_eq!(select_body(&msg, InlineStrategy::DataUri, None).html, "<pre>body text</pre>");
    }

    #[test]
    fn test_no_body_yields_empty_pre() {
        let msg = Message::new(
            None,
            Part::container(
                "mixed",
                vec![Part::binary("application/zip", vec![0]).with_filename("a.zip")],
            ),
        );
        assert_eq!(select_body(&msg, InlineStrategy::DataUri, None).html, "<pre></pre>");
    }
}
