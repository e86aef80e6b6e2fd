//! Content type detection by magic number.

use acourse_common::SNIFF_LEN;

/// Fallback for binary content with no known signature.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Fallback for content without binary control bytes.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Detect the content type of `data` from its first bytes.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let head: &[u8] = &data[..data.len().min(SNIFF_LEN)];

    if let Some(content_type) = match_signature(head) {
        return content_type;
    }

    if head.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

fn match_signature(head: &[u8]) -> Option<&'static str> {
    match head {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => Some("video/avi"),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => Some(matroska_flavor(head)),
        [_, _, _, _, b'f', b't', b'y', b'p', brand @ ..] => Some(iso_media_flavor(brand)),
        [b'%', b'P', b'D', b'F', b'-', ..] => Some("application/pdf"),
        [b'O', b'g', b'g', b'S', 0x00, ..] => Some("application/ogg"),
        [b'I', b'D', b'3', ..] => Some("audio/mpeg"),
        [b'P', b'K', 0x03, 0x04, ..] => Some("application/zip"),
        _ => None,
    }
}

/// EBML containers carry their doc type near the start of the header.
fn matroska_flavor(head: &[u8]) -> &'static str {
    if contains(head, b"webm") {
        "video/webm"
    } else {
        "video/x-matroska"
    }
}

/// ISO base media files name their major brand right after `ftyp`.
fn iso_media_flavor(brand: &[u8]) -> &'static str {
    match brand {
        [b'q', b't', b' ', b' ', ..] => "video/quicktime",
        [b'M', b'4', b'A', b' ', ..] => "audio/mp4",
        _ => "video/mp4",
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
