//! The two conversions: render a message to HTML, or pull out its deepest
//! document attachment.

use crate::error::Result;
use crate::model::Message;

use super::body::select_body;
use super::inline::{InlineStrategy, Inlined};
use super::nested::{resolve, ResolveOptions, Target};

/// Knobs for a [`Converter`], usually built from [`crate::config::Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub resolve: ResolveOptions,
    pub inline_images: InlineStrategy,
    /// Directory, relative to the HTML, that side-file images are placed in.
    pub resource_dir: Option<String>,
}

/// What to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// HTML of the deepest nested message, or of the message itself.
    RenderHtml,
    /// Bytes of the deepest attachment whose name ends with `suffix`;
    /// renders HTML instead when there is none.
    ExtractAttachment { suffix: String },
}

/// Steps a conversion passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ResolveAttachment,
    ResolveNested,
    SelectBody,
    Done,
}

/// Result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Html(Inlined),
    Attachment {
        filename: Option<String>,
        data: Vec<u8>,
    },
}

/// A finished conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub output: Output,
    /// Nesting depth of the message or attachment the output came from.
    pub depth: usize,
    /// Stages visited, in order, ending with [`Stage::Done`].
    pub stages: Vec<Stage>,
}

impl Conversion {
    /// `true` when there is nothing worth handing to a renderer or writer.
    pub fn is_empty(&self) -> bool {
        match &self.output {
            Output::Html(inlined) => {
                let html = inlined.html.trim();
                html.is_empty() || html == "<pre></pre>"
            }
            Output::Attachment { data, .. } => data.is_empty(),
        }
    }
}

/// Runs [`Operation`]s on messages with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Run `operation` on `message`. Any error ends the conversion.
    pub fn convert(&self, message: &Message, operation: &Operation) -> Result<Conversion> {
        let mut stages = vec![Stage::Start];

        if let Operation::ExtractAttachment { suffix } = operation {
            stages.push(Stage::ResolveAttachment);
            let target = Target::Attachment {
                suffix: suffix.clone(),
            };
            let found = resolve(message, &target, &self.options.resolve)?;
            if let Some(part) = found.attachment() {
                stages.push(Stage::Done);
                return Ok(Conversion {
                    output: Output::Attachment {
                        filename: part.filename.clone(),
                        data: part.content().to_vec(),
                    },
                    depth: found.depth,
                    stages,
                });
            }
        }

        stages.push(Stage::ResolveNested);
        let nested = resolve(message, &Target::Message, &self.options.resolve)?;
        let source = match nested.message() {
            Some(inner) if nested.depth > 0 => inner,
            _ => message,
        };

        stages.push(Stage::SelectBody);
        let html = select_body(
            source,
            self.options.inline_images,
            self.options.resource_dir.as_deref(),
        );

        stages.push(Stage::Done);
        Ok(Conversion {
            output: Output::Html(html),
            depth: nested.depth,
            stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Part;

    fn html_message(subject: &str, html: &str, attachments: Vec<Part>) -> Message {
        let mut children = vec![Part::text("html", None, html)];
        children.extend(attachments);
        Message::new(Some(subject.into()), Part::container("mixed", children))
    }

    fn html_of(conversion: &Conversion) -> &str {
        match &conversion.output {
            Output::Html(inlined) => &inlined.html,
            Output::Attachment { .. } => panic!("expected HTML output"),
        }
    }

    #[test]
    fn test_render_root_without_nesting() {
        let msg = html_message("root", "<p>root</p>", vec![]);
        let conversion = Converter::default().convert(&msg, &Operation::RenderHtml).unwrap();
        assert_eq!(conversion.depth, 0);
        assert_eq!(html_of(&conversion), "<p>root</p>");
        assert_eq!(
            conversion.stages,
            vec![Stage::Start, Stage::ResolveNested, Stage::SelectBody, Stage::Done]
        );
    }

    #[test]
    fn test_render_deepest_nested_message() {
        let inner = html_message("inner", "<p>inner</p>", vec![]);
        let middle = html_message("middle", "<p>middle</p>", vec![Part::message(inner)]);
        let msg = html_message("root", "<p>root</p>", vec![Part::message(middle)]);
        let conversion = Converter::default().convert(&msg, &Operation::RenderHtml).unwrap();
        assert_eq!(conversion.depth, 2);
        assert_eq!(html_of(&conversion), "<p>inner</p>");
    }

    #[test]
    fn test_extract_returns_attachment_bytes() {
        let inner = html_message(
            "inner",
            "<p>inner</p>",
            vec![Part::binary("application/pdf", b"inner-pdf".to_vec()).with_filename("b.pdf")],
        );
        let msg = html_message(
            "root",
            "<p>root</p>",
            vec![
                Part::binary("application/pdf", b"top-pdf".to_vec()).with_filename("a.pdf"),
                Part::message(inner),
            ],
        );
        let op = Operation::ExtractAttachment {
            suffix: ".pdf".into(),
        };
        let conversion = Converter::default().convert(&msg, &op).unwrap();
        assert_eq!(conversion.depth, 2);
        assert_eq!(
            conversion.output,
            Output::Attachment {
                filename: Some("b.pdf".into()),
                data: b"inner-pdf".to_vec(),
            }
        );
        assert_eq!(
            conversion.stages,
            vec![Stage::Start, Stage::ResolveAttachment, Stage::Done]
        );
    }

    #[test]
    fn test_extract_falls_through_to_html() {
        let msg = html_message("root", "<p>root</p>", vec![]);
        let op = Operation::ExtractAttachment {
            suffix: ".pdf".into(),
        };
        let conversion = Converter::default().convert(&msg, &op).unwrap();
        assert_eq!(html_of(&conversion), "<p>root</p>");
        assert_eq!(
            conversion.stages,
            vec![
                Stage::Start,
                Stage::ResolveAttachment,
                Stage::ResolveNested,
                Stage::SelectBody,
                Stage::Done
            ]
        );
    }

    #[test]
    fn test_empty_conversion() {
        let msg = Message::new(None, Part::container("mixed", vec![]));
        let conversion = Converter::default().convert(&msg, &Operation::RenderHtml).unwrap();
        assert!(conversion.is_empty());
        assert_eq!(html_of(&conversion), "<pre></pre>");
    }
}
