//! Content-type to body transform mapping.

use std::fmt;

use crate::naming::essence;
use crate::ts::{TsPrimitive, TsType};

/// How a body is encoded on the wire and decoded back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transform {
    Json,
    Multipart,
    OctetStream,
    UrlEncoded,
    Xml,
    Text,
}

impl Transform {
    /// Transform for a content type, or `None` when no transform is registered.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        let essence = essence(content_type);
        let (kind, subtype) = essence.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let transform = match (kind, subtype) {
            ("application", "json") => Self::Json,
            (_, s) if s.ends_with("+json") => Self::Json,
            ("multipart", "form-data") => Self::Multipart,
            ("application", "octet-stream" | "pdf") => Self::OctetStream,
            ("image" | "audio" | "video", _) => Self::OctetStream,
            ("application", "x-www-form-urlencoded") => Self::UrlEncoded,
            ("application" | "text", "xml") => Self::Xml,
            (_, s) if s.ends_with("+xml") => Self::Xml,
            ("text", _) => Self::Text,
            _ => return None,
        };
        Some(transform)
    }

    /// Identifier understood by the generated runtime's body codecs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Multipart => "multipart",
            Self::OctetStream => "binary",
            Self::UrlEncoded => "urlencoded",
            Self::Xml => "xml",
            Self::Text => "text",
        }
    }

    /// Static type of a body that has no schema.
    pub fn untyped_body(self) -> TsType {
        match self {
            Self::Json | Self::UrlEncoded => TsType::primitive(TsPrimitive::Unknown),
            Self::Multipart => TsType::named("FormData"),
            Self::OctetStream => TsType::named("Blob"),
            Self::Xml | Self::Text => TsType::primitive(TsPrimitive::String),
        }
    }

    /// Whether decoded responses are checked against the schema validator.
    pub fn validates_response(self) -> bool {
        !matches!(self, Self::Multipart)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
