//! Rewriting of `cid:` references to inline images.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::export::naming::sanitize_filename_part;
use crate::model::{Part, PartBody};

/// How a `cid:` reference is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InlineStrategy {
    /// `data:<mime>;base64,<bytes>` embedded in the HTML itself.
    #[default]
    DataUri,
    /// A relative file name; the bytes travel alongside in [`Inlined::resources`].
    SideFile,
}

/// A file the HTML refers to by relative name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineResource {
    pub name: String,
    pub data: Vec<u8>,
}

/// HTML with its references resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inlined {
    pub html: String,
    /// Files to write next to the HTML. Always empty for [`InlineStrategy::DataUri`].
    pub resources: Vec<InlineResource>,
}

/// Replace `cid:<id>` in `html` for every image part carrying a content id.
///
/// Substitutes are collected per id in part order, so when two parts share an
/// id the later one wins. Each substitute then replaces every literal
/// occurrence of its reference. Side files are named relative to the HTML,
/// inside `resource_dir` when given.
pub fn resolve_inline(
    html: &str,
    parts: &[&Part],
    strategy: InlineStrategy,
    resource_dir: Option<&str>,
) -> Inlined {
    let mut substitutions: Vec<(&str, String, Option<InlineResource>)> = Vec::new();

    for &part in parts {
        let PartBody::Binary(data) = &part.body else {
            continue;
        };
        if !part.mime.is_image() {
            continue;
        }
        let Some(cid) = part.content_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };

        let entry = match strategy {
            InlineStrategy::DataUri => {
                let uri = format!(
                    "data:{};base64,{}",
                    part.mime,
                    base64::engine::general_purpose::STANDARD.encode(data)
                );
                (cid, uri, None)
            }
            InlineStrategy::SideFile => {
                let file = format!(
                    "{}.{}",
                    sanitize_filename_part(cid, 100),
                    image_extension(&part.mime.sub)
                );
                let name = match resource_dir {
                    Some(dir) => format!("{dir}/{file}"),
                    None => file,
                };
                let resource = InlineResource {
                    name: name.clone(),
                    data: data.clone(),
                };
                (cid, name, Some(resource))
            }
        };

        match substitutions.iter_mut().find(|(id, _, _)| *id == cid) {
            Some(slot) => *slot = entry,
            None => substitutions.push(entry),
        }
    }

    let mut out = Inlined {
        html: html.to_string(),
        resources: Vec::new(),
    };
    for (cid, substitute, resource) in substitutions {
        out.html = out.html.replace(&format!("cid:{cid}"), &substitute);
        if let Some(resource) = resource {
            out.resources.retain(|r| r.name != resource.name);
            out.resources.push(resource);
        }
    }
    out
}

fn image_extension(subtype: &str) -> String {
    match subtype {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        "x-icon" | "vnd.microsoft.icon" => "ico".to_string(),
        "" => "img".to_string(),
        other => sanitize_filename_part(other, 10),
    }
}
