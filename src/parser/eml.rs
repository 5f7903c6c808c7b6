//! Loader for `.eml` files: raw RFC 5322 bytes into a [`Message`] tree.
//!
//! `mail-parser` does the MIME work. Its tree is copied into the owned
//! [`crate::model`] types, keeping for every text part the transfer-decoded
//! bytes in their declared charset so the pipeline can decode them itself.

use std::borrow::Cow;
use std::path::Path;

use base64::Engine;
use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::debug;

use crate::convert::charset::lookup;
use crate::error::{ConvertError, Result};
use crate::model::{Disposition, Message, MimeType, Part, PartBody};

/// Read and parse a single `.eml` file.
pub fn load_eml(path: impl AsRef<Path>) -> Result<Message> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound(path.to_path_buf())
        } else {
            ConvertError::io(path, e)
        }
    })?;

    debug!(path = %path.display(), size = data.len(), "Loaded message file");
    parse_message(&data)
}

/// Parse raw message bytes (headers + body).
///
/// A leading UTF-8 BOM and an MBOX `From ` separator line are skipped.
pub fn parse_message(raw: &[u8]) -> Result<Message> {
    let bytes = skip_from_line(raw);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConvertError::InvalidMessage("empty message".into()));
    }

    let parsed = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| ConvertError::InvalidMessage("no headers could be parsed".into()))?;

    convert_message(&parsed)
}

fn convert_message(msg: &mail_parser::Message<'_>) -> Result<Message> {
    let root = msg
        .parts
        .first()
        .ok_or_else(|| ConvertError::InvalidMessage("message has no parts".into()))?;

    let root = convert_part(msg, root, 0)?;
    let subject = msg.subject().map(String::from);
    Ok(Message::new(subject, root))
}

fn convert_part(
    msg: &mail_parser::Message<'_>,
    part: &mail_parser::MessagePart<'_>,
    level: usize,
) -> Result<Part> {
    let mime = part
        .content_type()
        .map(|ct| MimeType::new(ct.ctype(), ct.subtype().unwrap_or("")))
        .unwrap_or_else(|| match part.body {
            PartType::Html(_) => MimeType::new("text", "html"),
            PartType::Text(_) => MimeType::new("text", "plain"),
            PartType::Message(_) => MimeType::new("message", "rfc822"),
            PartType::Multipart(_) => MimeType::new("multipart", "mixed"),
            PartType::Binary(_) | PartType::InlineBinary(_) => {
                MimeType::new("application", "octet-stream")
            }
        });

    let disposition = match part.content_disposition().map(|d| d.ctype()) {
        Some(d) if d.eq_ignore_ascii_case("attachment") => Disposition::Attachment,
        Some(d) if d.eq_ignore_ascii_case("inline") => Disposition::Inline,
        _ => Disposition::Unspecified,
    };

    let content_id = part
        .content_id()
        .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|id| !id.is_empty());

    let body = match &part.body {
        PartType::Multipart(ids) => {
            let mut children = Vec::with_capacity(ids.len());
            for &id in ids {
                // Multipart ids always point forward; the guard keeps a broken
                // tree from looping.
                if id <= level {
                    continue;
                }
                if let Some(child) = msg.part(id) {
                    children.push(convert_part(msg, child, id)?);
                }
            }
            PartBody::Container(children)
        }
        PartType::Text(text) | PartType::Html(text) => {
            let charset = part
                .content_type()
                .and_then(|ct| ct.attribute("charset"))
                .map(|c| c.trim().to_string());
            let (raw, charset) = text_bytes(msg, part, text, charset);
            PartBody::Text {
                charset,
                raw,
                text: text.to_string(),
            }
        }
        PartType::Binary(data) | PartType::InlineBinary(data) => PartBody::Binary(data.to_vec()),
        PartType::Message(inner) => PartBody::Message(Box::new(convert_message(inner)?)),
    };

    Ok(Part {
        mime,
        filename: part.attachment_name().map(String::from),
        content_id,
        disposition,
        body,
    })
}

/// Body bytes of a text part in its declared charset, and that charset.
///
/// The raw body is cut out of the message and transfer-decoded. When that
/// is impossible, or when it does not decode to what `mail-parser` produced,
/// the decoded text is encoded back instead; if the charset is unknown too,
/// the bytes become UTF-8 and the charset is dropped.
fn text_bytes(
    msg: &mail_parser::Message<'_>,
    part: &mail_parser::MessagePart<'_>,
    text: &str,
    charset: Option<String>,
) -> (Vec<u8>, Option<String>) {
    let encoding = lookup(charset.as_deref().unwrap_or("utf-8"));

    if let Some(raw) = raw_body_bytes(msg, part) {
        let consistent = match encoding {
            Some(enc) => enc.decode_with_bom_removal(&raw).0.trim() == text.trim(),
            None => true,
        };
        if consistent {
            return (raw, charset);
        }
        debug!(charset = ?charset, "Raw body disagrees with parsed text, re-encoding");
    }

    match encoding {
        Some(enc) => (enc.encode(text).0.into_owned(), charset),
        None => (text.as_bytes().to_vec(), None),
    }
}

/// Transfer-decoded body bytes of a part.
fn raw_body_bytes(
    msg: &mail_parser::Message<'_>,
    part: &mail_parser::MessagePart<'_>,
) -> Option<Vec<u8>> {
    let encoded = msg
        .raw_message
        .get(part.raw_body_offset()..part.raw_end_offset())?;

    let encoding = part
        .content_transfer_encoding()
        .map(|e| e.trim().to_ascii_lowercase())
        .unwrap_or_default();

    Some(decode_transfer(encoded, &encoding).into_owned())
}

/// Undo a Content-Transfer-Encoding. Undecodable input is returned as-is.
pub fn decode_transfer<'a>(encoded: &'a [u8], encoding: &str) -> Cow<'a, [u8]> {
    match encoding {
        "base64" => {
            let compact: Vec<u8> = encoded
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match base64::engine::general_purpose::STANDARD.decode(&compact) {
                Ok(bytes) => Cow::Owned(bytes),
                Err(e) => {
                    debug!(error = %e, "Invalid base64 body, keeping encoded bytes");
                    Cow::Borrowed(encoded)
                }
            }
        }
        "quoted-printable" => {
            match quoted_printable::decode(encoded, quoted_printable::ParseMode::Robust) {
                Ok(bytes) => Cow::Owned(bytes),
                Err(e) => {
                    debug!(error = %e, "Invalid quoted-printable body, keeping encoded bytes");
                    Cow::Borrowed(encoded)
                }
            }
        }
        _ => Cow::Borrowed(encoded),
    }
}

/// Skip a UTF-8 BOM and the `From ` separator line of MBOX-exported messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
