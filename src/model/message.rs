//! The typed message tree handed to the conversion pipeline.
//!
//! A [`Message`] is built once by the loader (see [`crate::parser::eml`]) and
//! is read-only afterwards. Nested messages attached natively
//! (`message/rfc822`) are materialized up front; nested messages attached as
//! serialized `.eml` files stay plain binary leaves until a resolver parses
//! them.

use std::fmt;

/// A parsed email message: some headers plus a tree of [`Part`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Decoded `Subject:` header, if present.
    pub subject: Option<String>,

    /// Top-level content type (e.g. `"multipart/mixed"`).
    pub content_type: String,

    /// Root of the part tree.
    pub root: Part,
}

/// Lowercase `type/subtype` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub main: String,
    pub sub: String,
}

/// Value of the `Content-Disposition` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    Inline,
    Attachment,
    #[default]
    Unspecified,
}

/// A node in a message tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub mime: MimeType,

    /// File name from `Content-Disposition` or the `name` content-type parameter.
    pub filename: Option<String>,

    /// Content-ID without the surrounding angle brackets.
    pub content_id: Option<String>,

    pub disposition: Disposition,

    pub body: PartBody,
}

/// Payload of a [`Part`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// `multipart/*`: ordered children, no content of its own.
    Container(Vec<Part>),

    /// `text/*` leaf.
    Text {
        /// Declared `charset` parameter.
        charset: Option<String>,
        /// Transfer-decoded bytes, still in the declared charset.
        raw: Vec<u8>,
        /// The loader's own decoded rendition of `raw`.
        text: String,
    },

    /// Any other leaf; bytes are transfer-decoded.
    Binary(Vec<u8>),

    /// Native `message/rfc822` part.
    Message(Box<Message>),
}

impl MimeType {
    pub fn new(main: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            main: main.into().to_ascii_lowercase(),
            sub: sub.into().to_ascii_lowercase(),
        }
    }

    /// Parse `"type/subtype"`; a missing subtype yields an empty one.
    pub fn parse(value: &str) -> Self {
        let value = value.split(';').next().unwrap_or("").trim();
        match value.split_once('/') {
            Some((main, sub)) => Self::new(main.trim(), sub.trim()),
            None => Self::new(value, ""),
        }
    }

    pub fn is_image(&self) -> bool {
        self.main == "image"
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub.is_empty() {
            f.write_str(&self.main)
        } else {
            write!(f, "{}/{}", self.main, self.sub)
        }
    }
}

impl Message {
    pub fn new(subject: Option<String>, root: Part) -> Self {
        Self {
            subject,
            content_type: root.mime.to_string(),
            root,
        }
    }

    /// Leaves that make up the readable body, in document order.
    ///
    /// Descends through containers but never into embedded messages.
    pub fn body_parts(&self) -> Vec<&Part> {
        self.leaves().filter(|p| !p.is_attachment()).collect()
    }

    /// Attachment leaves directly owned by this message, in document order.
    pub fn attachments(&self) -> Vec<&Part> {
        self.leaves().filter(|p| p.is_attachment()).collect()
    }

    /// Text and charset of the first `text/plain` body part.
    pub fn plain_text(&self) -> Option<(&str, Option<&str>)> {
        self.leaves()
            .filter(|p| !p.is_attachment())
            .find_map(|p| match &p.body {
                PartBody::Text { charset, text, .. } if p.mime.sub == "plain" => {
                    Some((text.as_str(), charset.as_deref()))
                }
                _ => None,
            })
    }

    /// Every leaf of this message, body and attachments, in document order.
    ///
    /// Embedded messages are leaves themselves; their parts are not visited.
    pub fn leaves(&self) -> impl Iterator<Item = &Part> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            while let Some(part) = stack.pop() {
                match &part.body {
                    PartBody::Container(children) => stack.extend(children.iter().rev()),
                    _ => return Some(part),
                }
            }
            None
        })
    }
}

impl Part {
    /// A `multipart/<sub>` container.
    pub fn container(sub: &str, children: Vec<Part>) -> Self {
        Self::leaf(MimeType::new("multipart", sub), PartBody::Container(children))
    }

    /// A `text/<sub>` leaf. The loader-decoded text is taken as lossy UTF-8.
    pub fn text(sub: &str, charset: Option<&str>, raw: impl Into<Vec<u8>>) -> Self {
        let raw = raw.into();
        let text = String::from_utf8_lossy(&raw).into_owned();
        Self::leaf(
            MimeType::new("text", sub),
            PartBody::Text {
                charset: charset.map(String::from),
                raw,
                text,
            },
        )
    }

    /// A binary leaf of the given `type/subtype`.
    pub fn binary(mime: &str, data: impl Into<Vec<u8>>) -> Self {
        Self::leaf(MimeType::parse(mime), PartBody::Binary(data.into()))
    }

    /// A native `message/rfc822` leaf.
    pub fn message(inner: Message) -> Self {
        let mut part = Self::leaf(
            MimeType::new("message", "rfc822"),
            PartBody::Message(Box::new(inner)),
        );
        part.disposition = Disposition::Attachment;
        part
    }

    fn leaf(mime: MimeType, body: PartBody) -> Self {
        Self {
            mime,
            filename: None,
            content_id: None,
            disposition: Disposition::Unspecified,
            body,
        }
    }

    /// Builder: file name, marked as attachment.
    pub fn with_filename(mut self, name: &str) -> Self {
        self.filename = Some(name.to_string());
        self.disposition = Disposition::Attachment;
        self
    }

    /// Builder: content identifier, marked as inline.
    pub fn with_content_id(mut self, id: &str) -> Self {
        self.content_id = Some(id.to_string());
        self.disposition = Disposition::Inline;
        self
    }

    /// Whether this leaf is an attachment rather than part of the body.
    pub fn is_attachment(&self) -> bool {
        match &self.body {
            PartBody::Container(_) => false,
            PartBody::Message(_) => true,
            _ if self.disposition == Disposition::Attachment => true,
            PartBody::Binary(_) => self.filename.is_some() && self.content_id.is_none(),
            PartBody::Text { .. } => false,
        }
    }

    /// Nested message of a `message/rfc822` part.
    pub fn embedded_message(&self) -> Option<&Message> {
        match &self.body {
            PartBody::Message(inner) => Some(inner),
            _ => None,
        }
    }

    /// Transfer-decoded bytes of a leaf. Empty for containers and messages.
    pub fn content(&self) -> &[u8] {
        match &self.body {
            PartBody::Text { raw, .. } => raw,
            PartBody::Binary(data) => data,
            PartBody::Container(_) | PartBody::Message(_) => &[],
        }
    }

    /// Whether the file name ends with `suffix`, ignoring ASCII case.
    pub fn filename_ends_with(&self, suffix: &str) -> bool {
        let Some(name) = self.filename.as_deref() else {
            return false;
        };
        name.len() >= suffix.len()
            && name
                .get(name.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        let inner = Message::new(None, Part::text("plain", None, "inner"));
        Message::new(
            Some("Sample".into()),
            Part::container(
                "mixed",
                vec![
                    Part::container(
                        "related",
                        vec![
                            Part::text("html", Some("utf-8"), "<p>hi</p>"),
                            Part::binary("image/png", vec![1, 2]).with_content_id("logo"),
                        ],
                    ),
                    Part::binary("application/pdf", vec![3]).with_filename("doc.pdf"),
                    Part::message(inner),
                ],
            ),
        )
    }

    #[test]
    fn test_mime_type_parse() {
        let mime = MimeType::parse("Text/HTML; charset=utf-8");
        assert_eq!(mime.main, "text");
        assert_eq!(mime.sub, "html");
        assert_eq!(mime.to_string(), "text/html");
        assert_eq!(MimeType::parse("application").to_string(), "application");
    }

    #[test]
    fn test_body_parts_exclude_attachments() {
        let msg = sample();
        let body: Vec<String> = msg.body_parts().iter().map(|p| p.mime.to_string()).collect();
        assert_eq!(body, vec!["text/html", "image/png"]);
    }

    #[test]
    fn test_attachments_in_document_order() {
        let msg = sample();
        let attachments: Vec<String> = msg
            .attachments()
            .iter()
            .map(|p| p.mime.to_string())
            .collect();
        assert_eq!(attachments, vec!["application/pdf", "message/rfc822"]);
    }

    #[test]
    fn test_plain_text_does_not_enter_nested_messages() {
        let msg = sample();
        assert!(msg.plain_text().is_none());
    }

    #[test]
    fn test_filename_suffix_ignores_case() {
        let part = Part::binary("application/pdf", vec![]).with_filename("REPORT.PDF");
        assert!(part.filename_ends_with(".pdf"));
        assert!(!part.filename_ends_with(".eml"));
        assert!(!Part::binary("application/pdf", vec![]).filename_ends_with(".pdf"));
    }
}
