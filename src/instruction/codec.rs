//! Instruction extraction from OP_MSG requests.
//!
//! # Responsibilities
//! - Recognize OP_MSG messages carrying a single-document section
//! - Locate the embedded `proxyTest` field by walking raw document bytes
//! - Remove exactly that field, leaving every other byte untouched
//! - Parse the field's value into an ordered action list
//!
//! # Design Decisions
//! - Element location is raw byte walking, not decode/re-encode: untouched
//!   fields must survive byte-for-byte, in their original order
//! - The parsed instruction value goes through serde (`bson::from_slice`)
//!   so malformed payloads fail with a real decode error

use serde::Deserialize;
use thiserror::Error;

use crate::wire::{splice_document, MessageHeader, HEADER_LEN, OP_MSG};

/// Top-level document key carrying the fault-injection instruction.
pub const INSTRUCTION_KEY: &str = "proxyTest";

/// Byte offset of the first section's document: header, flag bits, kind.
const DOC_OFFSET: usize = HEADER_LEN + 4 + 1;

/// Section kind for a single BSON document.
const SECTION_SINGLE_DOCUMENT: u8 = 0;

/// BSON element tag for an embedded document.
const TAG_DOCUMENT: u8 = 0x03;

/// Error type for instruction decoding.
///
/// Shape mismatches never produce this; only a message the proxy has
/// committed to rewriting can fail here.
#[derive(Debug, Error)]
pub enum InstructionError {
    /// The instruction field's value is not an embedded document.
    #[error("{INSTRUCTION_KEY} value must be a document")]
    NotADocument,

    /// The instruction document does not match the expected action list.
    #[error("malformed {INSTRUCTION_KEY} payload: {0}")]
    Decode(#[from] bson::de::Error),
}

/// One fault-injection step, applied in list order against a buffered reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Pause the delivering task for the given number of milliseconds.
    Delay(u64),
    /// Emit up to `n` bytes from the current cursor (clamped to remaining).
    SendBytes(usize),
    /// Emit all remaining bytes.
    SendAll,
}

/// Parsed fault-injection instruction stripped from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultInstruction {
    pub actions: Vec<Action>,
}

/// Wire shape of one `actions` list element. Each element admits up to
/// three optional keys and expands, in order, to at most three actions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionEntry {
    delay_ms: Option<u64>,
    send_bytes: Option<u64>,
    send_all: Option<bool>,
}

/// Wire shape of the `proxyTest` value.
#[derive(Debug, Deserialize)]
struct InstructionDocument {
    actions: Vec<ActionEntry>,
}

fn expand(entries: Vec<ActionEntry>) -> Vec<Action> {
    let mut actions = Vec::new();
    for entry in entries {
        if let Some(ms) = entry.delay_ms {
            actions.push(Action::Delay(ms));
        }
        if let Some(n) = entry.send_bytes {
            actions.push(Action::SendBytes(n as usize));
        }
        if entry.send_all.unwrap_or(false) {
            actions.push(Action::SendAll);
        }
    }
    actions
}

/// Outcome of inspecting one client request.
#[derive(Debug)]
pub enum Intercept {
    /// Forward the original message unchanged.
    PassThrough,
    /// An instruction was stripped; forward the spliced message instead.
    Stripped {
        message: Vec<u8>,
        instruction: FaultInstruction,
    },
}

/// Inspect one complete request message.
///
/// Anything that is not an OP_MSG single-document command, or that carries
/// no `proxyTest` field, passes through unchanged. Only a present but
/// malformed instruction payload is an error.
pub fn intercept_request(raw: &[u8]) -> Result<Intercept, InstructionError> {
    match MessageHeader::parse(raw) {
        Some(header) if header.op_code == OP_MSG => {}
        _ => return Ok(Intercept::PassThrough),
    }

    // flag bits + section kind + minimal document
    if raw.len() < DOC_OFFSET + 5 || raw[HEADER_LEN + 4] != SECTION_SINGLE_DOCUMENT {
        return Ok(Intercept::PassThrough);
    }

    let doc_len = i32::from_le_bytes(raw[DOC_OFFSET..DOC_OFFSET + 4].try_into().unwrap());
    if doc_len < 5 || DOC_OFFSET + doc_len as usize > raw.len() {
        return Ok(Intercept::PassThrough);
    }
    let doc = &raw[DOC_OFFSET..DOC_OFFSET + doc_len as usize];

    let (elem_start, value_start, elem_end) = match find_element(doc, INSTRUCTION_KEY) {
        Some(range) => range,
        None => return Ok(Intercept::PassThrough),
    };
    if doc[elem_start] != TAG_DOCUMENT {
        return Err(InstructionError::NotADocument);
    }

    let parsed: InstructionDocument = bson::from_slice(&doc[value_start..elem_end])?;

    let clean = remove_element(doc, elem_start, elem_end);
    let message = splice_document(raw, DOC_OFFSET, doc.len(), &clean);

    Ok(Intercept::Stripped {
        message,
        instruction: FaultInstruction {
            actions: expand(parsed.actions),
        },
    })
}

/// Walk a raw BSON document and locate the element with the given key.
///
/// Returns `(element_start, value_start, element_end)` byte offsets within
/// `doc`. Any structural inconsistency yields `None`; the caller forwards
/// such documents untouched.
fn find_element(doc: &[u8], key: &str) -> Option<(usize, usize, usize)> {
    let total = i32::from_le_bytes(doc.get(..4)?.try_into().ok()?);
    if total < 5 || total as usize != doc.len() {
        return None;
    }

    let mut pos = 4;
    loop {
        let tag = *doc.get(pos)?;
        if tag == 0 {
            // document terminator
            return None;
        }
        let key_start = pos + 1;
        let key_len = doc.get(key_start..)?.iter().position(|&b| b == 0)?;
        let value_start = key_start + key_len + 1;
        let value_len = element_value_len(tag, doc.get(value_start..)?)?;
        let elem_end = value_start + value_len;
        if elem_end >= doc.len() {
            return None;
        }
        if &doc[key_start..key_start + key_len] == key.as_bytes() {
            return Some((pos, value_start, elem_end));
        }
        pos = elem_end;
    }
}

/// Byte length of a BSON value, given its tag and the bytes from the value
/// onward. `None` for unknown tags or truncated values.
fn element_value_len(tag: u8, value: &[u8]) -> Option<usize> {
    fn prefixed(value: &[u8], extra: usize) -> Option<usize> {
        let len = i32::from_le_bytes(value.get(..4)?.try_into().ok()?);
        if len < 0 {
            return None;
        }
        Some(4 + len as usize + extra)
    }
    fn self_sized(value: &[u8]) -> Option<usize> {
        let len = i32::from_le_bytes(value.get(..4)?.try_into().ok()?);
        if len < 5 {
            return None;
        }
        Some(len as usize)
    }

    let len = match tag {
        0x01 | 0x09 | 0x11 | 0x12 => 8,       // double, datetime, timestamp, int64
        0x02 | 0x0D | 0x0E => prefixed(value, 0)?, // string, code, symbol
        0x03 | 0x04 | 0x0F => self_sized(value)?, // document, array, code-with-scope
        0x05 => prefixed(value, 1)?,          // binary (subtype byte)
        0x06 | 0x0A | 0x7F | 0xFF => 0,       // undefined, null, maxkey, minkey
        0x07 => 12,                           // object id
        0x08 => 1,                            // bool
        0x0B => {
            // regex: two consecutive cstrings
            let first = value.iter().position(|&b| b == 0)?;
            let second = value.get(first + 1..)?.iter().position(|&b| b == 0)?;
            first + 1 + second + 1
        }
        0x0C => prefixed(value, 12)?,         // dbpointer
        0x10 => 4,                            // int32
        0x13 => 16,                           // decimal128
        _ => return None,
    };
    if len > value.len() {
        return None;
    }
    Some(len)
}

/// Rebuild a document with the element at `start..end` removed and the
/// length prefix corrected. Every remaining byte is copied verbatim.
fn remove_element(doc: &[u8], start: usize, end: usize) -> Vec<u8> {
    let new_len = doc.len() - (end - start);
    let mut out = Vec::with_capacity(new_len);
    out.extend_from_slice(&(new_len as i32).to_le_bytes());
    out.extend_from_slice(&doc[4..start]);
    out.extend_from_slice(&doc[end..]);
    out
}
