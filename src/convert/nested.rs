//! Search for the most deeply nested message or attachment.
//!
//! Depth counts embedding levels from the root message: an attachment of the
//! root is at depth 1, an attachment of a message attached to the root at
//! depth 2, and so on. Depth 0 means nothing was found.

use std::borrow::Cow;

use crate::error::Result;
use crate::model::{Message, Part};
use crate::parser::eml::parse_message;

/// Default cap on embedding levels followed during a search.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// What the search is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An embedded message, native or serialized.
    Message,
    /// An attachment whose file name ends with `suffix` (ASCII case ignored).
    Attachment { suffix: String },
}

/// A search hit. Borrowed from the input tree, or owned when it was found
/// inside a serialized message that had to be parsed on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact<'a> {
    Message(Cow<'a, Message>),
    Attachment(Cow<'a, Part>),
}

/// Best hit and its depth.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolved<'a> {
    pub artifact: Option<Artifact<'a>>,
    pub depth: usize,
}

/// Search tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// File-name suffix marking an attachment as a serialized message.
    pub message_suffix: String,
    /// Embedding levels beyond this are not searched.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            message_suffix: ".eml".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Target {
    fn matches(&self, part: &Part) -> bool {
        match self {
            Self::Message => false,
            Self::Attachment { suffix } => part.filename_ends_with(suffix),
        }
    }
}

impl<'a> Resolved<'a> {
    pub fn message(&self) -> Option<&Message> {
        match &self.artifact {
            Some(Artifact::Message(msg)) => Some(&**msg),
            _ => None,
        }
    }

    pub fn attachment(&self) -> Option<&Part> {
        match &self.artifact {
            Some(Artifact::Attachment(part)) => Some(&**part),
            _ => None,
        }
    }

    /// Detach the result from the tree it was found in.
    pub fn into_owned(self) -> Resolved<'static> {
        let artifact = self.artifact.map(|artifact| match artifact {
            Artifact::Message(msg) => Artifact::Message(Cow::Owned(msg.into_owned())),
            Artifact::Attachment(part) => Artifact::Attachment(Cow::Owned(part.into_owned())),
        });
        Resolved {
            artifact,
            depth: self.depth,
        }
    }
}

/// Find the deepest artifact matching `target` below `message`.
///
/// Attachments are visited depth-first in document order. A hit replaces
/// the current best only when strictly deeper, so the first of several
/// equally deep hits is kept. A serialized message that fails to parse
/// aborts the search with [`crate::error::ConvertError::InvalidMessage`].
pub fn resolve<'a>(
    message: &'a Message,
    target: &Target,
    options: &ResolveOptions,
) -> Result<Resolved<'a>> {
    resolve_at(message, target, options, 0)
}

fn resolve_at<'a>(
    message: &'a Message,
    target: &Target,
    options: &ResolveOptions,
    level: usize,
) -> Result<Resolved<'a>> {
    let descend = level < options.max_depth;
    let mut best = Resolved::default();

    for part in message.attachments() {
        let found = if let Some(inner) = part.embedded_message() {
            if !descend {
                continue;
            }
            let child = resolve_at(inner, target, options, level + 1)?;
            score_nested(child, Cow::Borrowed(inner), part, target)
        } else if part.filename_ends_with(&options.message_suffix) {
            if !descend {
                continue;
            }
            let inner = parse_message(part.content())?;
            let child = resolve_at(&inner, target, options, level + 1)?.into_owned();
            score_nested(child, Cow::Owned(inner), part, target)
        } else if target.matches(part) {
            Some(Resolved {
                artifact: Some(Artifact::Attachment(Cow::Borrowed(part))),
                depth: 1,
            })
        } else {
            None
        };

        if let Some(found) = found {
            if found.depth > best.depth {
                best = found;
            }
        }
    }

    Ok(best)
}

/// Lift a search result from inside `inner` one level up.
///
/// An empty result still yields a hit when `inner` itself is what the search
/// wants: the message for [`Target::Message`], or the part carrying it when
/// its file name matches an attachment target.
fn score_nested<'a>(
    child: Resolved<'a>,
    inner: Cow<'a, Message>,
    part: &'a Part,
    target: &Target,
) -> Option<Resolved<'a>> {
    if let Some(artifact) = child.artifact {
        return Some(Resolved {
            artifact: Some(artifact),
            depth: child.depth + 1,
        });
    }

    let artifact = match target {
        Target::Message => Artifact::Message(inner),
        Target::Attachment { .. } if target.matches(part) => {
            Artifact::Attachment(Cow::Borrowed(part))
        }
        Target::Attachment { .. } => return None,
    };
    Some(Resolved {
        artifact: Some(artifact),
        depth: 1,
    })
}
