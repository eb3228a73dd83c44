//! Upload validation: file size limit, MIME allow-list, and text decoding.

/// Maximum accepted upload size.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Text-like uploads are decoded server-side and truncated to this many
/// characters before being embedded in the prompt.
pub const MAX_TEXT_CHARS: usize = 15_000;

/// How a supported file reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Sent as base64 inline binary data in a multimodal request.
    Inline,
    /// Decoded as text and embedded in a composed prompt.
    Text,
}

/// One entry of the fixed MIME allow-list.
#[derive(Debug, Clone, Copy)]
pub struct SupportedType {
    pub mime: &'static str,
    /// Human-readable label echoed in response metadata.
    pub label: &'static str,
    pub kind: FileKind,
}

/// The fixed allow-list. Anything else is rejected with a 400.
pub const SUPPORTED_TYPES: &[SupportedType] = &[
    SupportedType {
        mime: "application/pdf",
        label: "PDF",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "image/png",
        label: "PNG",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "image/jpeg",
        label: "JPEG",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "image/webp",
        label: "WebP",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "image/heic",
        label: "HEIC",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "image/heif",
        label: "HEIF",
        kind: FileKind::Inline,
    },
    SupportedType {
        mime: "text/plain",
        label: "Text",
        kind: FileKind::Text,
    },
    SupportedType {
        mime: "text/markdown",
        label: "Markdown",
        kind: FileKind::Text,
    },
    SupportedType {
        mime: "text/csv",
        label: "CSV",
        kind: FileKind::Text,
    },
    SupportedType {
        mime: "application/json",
        label: "JSON",
        kind: FileKind::Text,
    },
];

/// Lowercases a raw content-type and strips parameters
/// (`text/plain; charset=utf-8` → `text/plain`).
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Looks up a normalized MIME type in the allow-list.
pub fn lookup(mime: &str) -> Option<&'static SupportedType> {
    SUPPORTED_TYPES.iter().find(|t| t.mime == mime)
}

/// Comma-separated allow-list for error messages and the capability endpoint.
pub fn supported_mime_list() -> String {
    SUPPORTED_TYPES
        .iter()
        .map(|t| t.mime)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decodes uploaded bytes as UTF-8 (lossily) and truncates to
/// `MAX_TEXT_CHARS` characters.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() <= MAX_TEXT_CHARS {
        text.into_owned()
    } else {
        text.chars().take(MAX_TEXT_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_has_ten_entries() {
        assert_eq!(SUPPORTED_TYPES.len(), 10);
    }

    #[test]
    fn test_pdf_is_inline() {
        let t = lookup("application/pdf").unwrap();
        assert_eq!(t.label, "PDF");
        assert_eq!(t.kind, FileKind::Inline);
    }

    #[test]
    fn test_png_is_inline() {
        assert_eq!(lookup("image/png").unwrap().kind, FileKind::Inline);
    }

    #[test]
    fn test_plain_text_is_text_kind() {
        let t = lookup("text/plain").unwrap();
        assert_eq!(t.label, "Text");
        assert_eq!(t.kind, FileKind::Text);
    }

    #[test]
    fn test_markdown_is_text_kind() {
        assert_eq!(lookup("text/markdown").unwrap().kind, FileKind::Text);
    }

    #[test]
    fn test_video_is_rejected() {
        assert!(lookup("video/mp4").is_none());
    }

    #[test]
    fn test_empty_mime_is_rejected() {
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_normalize_strips_charset_parameter() {
        assert_eq!(normalize_mime("text/plain; charset=utf-8"), "text/plain");
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize_mime("Application/PDF"), "application/pdf");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_mime("  image/png "), "image/png");
    }

    #[test]
    fn test_decode_text_short_input_unchanged() {
        assert_eq!(decode_text(b"hello resume"), "hello resume");
    }

    #[test]
    fn test_decode_text_truncates_to_limit() {
        let input = "a".repeat(MAX_TEXT_CHARS + 500);
        let decoded = decode_text(input.as_bytes());
        assert_eq!(decoded.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_decode_text_lossy_on_invalid_utf8() {
        let decoded = decode_text(&[0x68, 0x69, 0xFF, 0x21]);
        assert!(decoded.starts_with("hi"));
        assert!(decoded.ends_with('!'));
    }

    #[test]
    fn test_supported_mime_list_mentions_pdf() {
        let list = supported_mime_list();
        assert!(list.contains("application/pdf"));
        assert!(list.contains("text/csv"));
    }
}
