//! Message reconstruction after document replacement.

/// Rebuild a wire message around a replacement document.
///
/// `doc_offset`/`doc_len` describe where the original document sits inside
/// `raw`. Everything before and after the document is copied unchanged; the
/// 4-byte length prefix is recomputed so it equals the emitted buffer's
/// exact length. The replacement is never longer than the original, since
/// this proxy only removes content, but the arithmetic does not rely on
/// that.
pub fn splice_document(raw: &[u8], doc_offset: usize, doc_len: usize, replacement: &[u8]) -> Vec<u8> {
    let new_total = raw.len() - doc_len + replacement.len();
    let mut out = Vec::with_capacity(new_total);
    out.extend_from_slice(&(new_total as i32).to_le_bytes());
    out.extend_from_slice(&raw[4..doc_offset]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&raw[doc_offset + doc_len..]);
    out
}
