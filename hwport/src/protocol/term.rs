//! Erlang external term format.
//!
//! Every frame on the port carries one term as produced by
//! `erlang:term_to_binary/1`: a version byte (131) followed by a tagged
//! encoding. Only the tags a port driver can meet are supported. Pids and
//! references exist so the host's correlation tokens survive the trip and
//! can be echoed back unchanged.
//!
//! ## Encoding choices
//!
//! - Atoms are always written as UTF-8 atoms (`SMALL_ATOM_UTF8_EXT` or
//!   `ATOM_UTF8_EXT`), which every OTP release since 20 reads.
//! - Integers use the smallest of `SMALL_INTEGER_EXT`, `INTEGER_EXT` and
//!   `SMALL_BIG_EXT`.
//! - Pids and references are written in their newest forms
//!   (`NEW_PID_EXT`, `NEWER_REFERENCE_EXT`). They compare equal on the
//!   Erlang side to the older forms they were decoded from.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

/// Leading byte of every encoded term.
pub const VERSION: u8 = 131;

/// Deepest container nesting accepted from the host
pub const MAX_DEPTH: usize = 256;

mod tag {
    pub const NEW_PID: u8 = 88;
    pub const NEWER_REFERENCE: u8 = 90;
    pub const SMALL_INTEGER: u8 = 97;
    pub const INTEGER: u8 = 98;
    pub const ATOM: u8 = 100;
    pub const PID: u8 = 103;
    pub const SMALL_TUPLE: u8 = 104;
    pub const LARGE_TUPLE: u8 = 105;
    pub const NIL: u8 = 106;
    pub const STRING: u8 = 107;
    pub const LIST: u8 = 108;
    pub const BINARY: u8 = 109;
    pub const SMALL_BIG: u8 = 110;
    pub const NEW_REFERENCE: u8 = 114;
    pub const SMALL_ATOM: u8 = 115;
    pub const ATOM_UTF8: u8 = 118;
    pub const SMALL_ATOM_UTF8: u8 = 119;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    #[error("Empty term")]
    Empty,

    #[error("Unsupported format version {0}")]
    Version(u8),

    #[error("Truncated term")]
    Truncated,

    #[error("Unsupported tag {0}")]
    UnsupportedTag(u8),

    #[error("{0} trailing bytes after term")]
    Trailing(usize),

    #[error("Atom is not valid UTF-8")]
    InvalidAtom,

    #[error("Expected an atom for the node name")]
    ExpectedAtom,

    #[error("Integer does not fit in 64 bits")]
    IntegerOverflow,

    #[error("Term too large to encode")]
    TooLarge,

    #[error("Term nested too deeply")]
    TooDeep,
}

type Result<T> = std::result::Result<T, TermError>;

/// A decoded Erlang term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Atom(String),
    Integer(i64),
    Binary(Vec<u8>),
    Tuple(Vec<Term>),
    /// The empty list
    Nil,
    /// A non-empty list. Proper lists have a [`Term::Nil`] tail.
    List {
        elements: Vec<Term>,
        tail: Box<Term>,
    },
    Pid {
        node: String,
        id: u32,
        serial: u32,
        creation: u32,
    },
    Reference {
        node: String,
        creation: u32,
        ids: Vec<u32>,
    },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn tuple(elements: impl IntoIterator<Item = Term>) -> Self {
        Term::Tuple(elements.into_iter().collect())
    }

    /// Build a proper list.
    pub fn list(elements: Vec<Term>) -> Self {
        if elements.is_empty() {
            Term::Nil
        } else {
            Term::List {
                elements,
                tail: Box::new(Term::Nil),
            }
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_binary(self) -> Option<Vec<u8>> {
        match self {
            Term::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<Term>> {
        match self {
            Term::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// Decode a complete `term_to_binary` payload, version byte included.
    pub fn decode(mut bytes: &[u8]) -> Result<Term> {
        if bytes.is_empty() {
            return Err(TermError::Empty);
        }
        let version = bytes.get_u8();
        if version != VERSION {
            return Err(TermError::Version(version));
        }

        let term = decode_term(&mut bytes, 0)?;
        if !bytes.is_empty() {
            return Err(TermError::Trailing(bytes.len()));
        }
        Ok(term)
    }

    /// Append the encoding of this term, version byte included.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(VERSION);
        self.encode_body(dst)
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Term::Atom(name) => encode_atom(name, dst)?,
            Term::Integer(value) => encode_integer(*value, dst),
            Term::Binary(bytes) => {
                dst.put_u8(tag::BINARY);
                dst.put_u32(u32::try_from(bytes.len()).map_err(|_| TermError::TooLarge)?);
                dst.extend_from_slice(bytes);
            }
            Term::Tuple(elements) => {
                match u8::try_from(elements.len()) {
                    Ok(arity) => {
                        dst.put_u8(tag::SMALL_TUPLE);
                        dst.put_u8(arity);
                    }
                    Err(_) => {
                        dst.put_u8(tag::LARGE_TUPLE);
                        let arity =
                            u32::try_from(elements.len()).map_err(|_| TermError::TooLarge)?;
                        dst.put_u32(arity);
                    }
                }
                for element in elements {
                    element.encode_body(dst)?;
                }
            }
            Term::Nil => dst.put_u8(tag::NIL),
            Term::List { elements, tail } => {
                if elements.is_empty() {
                    return tail.encode_body(dst);
                }
                dst.put_u8(tag::LIST);
                dst.put_u32(u32::try_from(elements.len()).map_err(|_| TermError::TooLarge)?);
                for element in elements {
                    element.encode_body(dst)?;
                }
                tail.encode_body(dst)?;
            }
            Term::Pid {
                node,
                id,
                serial,
                creation,
            } => {
                dst.put_u8(tag::NEW_PID);
                encode_atom(node, dst)?;
                dst.put_u32(*id);
                dst.put_u32(*serial);
                dst.put_u32(*creation);
            }
            Term::Reference {
                node,
                creation,
                ids,
            } => {
                dst.put_u8(tag::NEWER_REFERENCE);
                dst.put_u16(u16::try_from(ids.len()).map_err(|_| TermError::TooLarge)?);
                encode_atom(node, dst)?;
                dst.put_u32(*creation);
                for id in ids {
                    dst.put_u32(*id);
                }
            }
        }
        Ok(())
    }
}

fn need(buf: &&[u8], len: usize) -> Result<()> {
    if buf.remaining() < len {
        Err(TermError::Truncated)
    } else {
        Ok(())
    }
}

fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    need(buf, len)?;
    let bytes: &'a [u8] = *buf;
    let (head, rest) = bytes.split_at(len);
    *buf = rest;
    Ok(head)
}

fn decode_term(buf: &mut &[u8], depth: usize) -> Result<Term> {
    if depth > MAX_DEPTH {
        return Err(TermError::TooDeep);
    }
    need(buf, 1)?;
    match buf.get_u8() {
        tag::SMALL_INTEGER => {
            need(buf, 1)?;
            Ok(Term::Integer(buf.get_u8().into()))
        }
        tag::INTEGER => {
            need(buf, 4)?;
            Ok(Term::Integer(buf.get_i32().into()))
        }
        tag::SMALL_BIG => {
            need(buf, 2)?;
            let len = buf.get_u8() as usize;
            let negative = buf.get_u8() != 0;
            let digits = take(buf, len)?;
            decode_big(negative, digits).map(Term::Integer)
        }
        tag::ATOM => {
            need(buf, 2)?;
            let len = buf.get_u16() as usize;
            Ok(Term::Atom(latin1(take(buf, len)?)))
        }
        tag::SMALL_ATOM => {
            need(buf, 1)?;
            let len = buf.get_u8() as usize;
            Ok(Term::Atom(latin1(take(buf, len)?)))
        }
        tag::ATOM_UTF8 => {
            need(buf, 2)?;
            let len = buf.get_u16() as usize;
            utf8(take(buf, len)?).map(Term::Atom)
        }
        tag::SMALL_ATOM_UTF8 => {
            need(buf, 1)?;
            let len = buf.get_u8() as usize;
            utf8(take(buf, len)?).map(Term::Atom)
        }
        tag::SMALL_TUPLE => {
            need(buf, 1)?;
            let arity = buf.get_u8() as usize;
            decode_elements(buf, arity, depth).map(Term::Tuple)
        }
        tag::LARGE_TUPLE => {
            need(buf, 4)?;
            let arity = buf.get_u32() as usize;
            decode_elements(buf, arity, depth).map(Term::Tuple)
        }
        tag::NIL => Ok(Term::Nil),
        tag::STRING => {
            // A list of small integers, packed
            need(buf, 2)?;
            let len = buf.get_u16() as usize;
            let chars = take(buf, len)?;
            Ok(Term::list(
                chars.iter().map(|&c| Term::Integer(c.into())).collect(),
            ))
        }
        tag::LIST => {
            need(buf, 4)?;
            let len = buf.get_u32() as usize;
            let elements = decode_elements(buf, len, depth)?;
            let tail = decode_term(buf, depth + 1)?;
            if elements.is_empty() {
                return Ok(tail);
            }
            Ok(Term::List {
                elements,
                tail: Box::new(tail),
            })
        }
        tag::BINARY => {
            need(buf, 4)?;
            let len = buf.get_u32() as usize;
            Ok(Term::Binary(take(buf, len)?.to_vec()))
        }
        tag::PID => {
            let node = decode_node(buf, depth)?;
            need(buf, 9)?;
            Ok(Term::Pid {
                node,
                id: buf.get_u32(),
                serial: buf.get_u32(),
                creation: buf.get_u8().into(),
            })
        }
        tag::NEW_PID => {
            let node = decode_node(buf, depth)?;
            need(buf, 12)?;
            Ok(Term::Pid {
                node,
                id: buf.get_u32(),
                serial: buf.get_u32(),
                creation: buf.get_u32(),
            })
        }
        tag::NEW_REFERENCE => {
            need(buf, 2)?;
            let len = buf.get_u16() as usize;
            let node = decode_node(buf, depth)?;
            need(buf, 1 + 4 * len)?;
            let creation = buf.get_u8().into();
            let ids = (0..len).map(|_| buf.get_u32()).collect();
            Ok(Term::Reference {
                node,
                creation,
                ids,
            })
        }
        tag::NEWER_REFERENCE => {
            need(buf, 2)?;
            let len = buf.get_u16() as usize;
            let node = decode_node(buf, depth)?;
            need(buf, 4 + 4 * len)?;
            let creation = buf.get_u32();
            let ids = (0..len).map(|_| buf.get_u32()).collect();
            Ok(Term::Reference {
                node,
                creation,
                ids,
            })
        }
        other => Err(TermError::UnsupportedTag(other)),
    }
}

fn decode_elements(buf: &mut &[u8], count: usize, depth: usize) -> Result<Vec<Term>> {
    // Every element takes at least one byte, so the remaining input bounds
    // the allocation no matter what the count claims.
    let mut elements = Vec::with_capacity(count.min(buf.remaining()));
    for _ in 0..count {
        elements.push(decode_term(buf, depth + 1)?);
    }
    Ok(elements)
}

fn decode_node(buf: &mut &[u8], depth: usize) -> Result<String> {
    match decode_term(buf, depth + 1)? {
        Term::Atom(node) => Ok(node),
        _ => Err(TermError::ExpectedAtom),
    }
}

fn decode_big(negative: bool, digits: &[u8]) -> Result<i64> {
    // Digits are little-endian base 256. Tolerate zero padding beyond 8 bytes.
    let significant = digits
        .iter()
        .rposition(|&d| d != 0)
        .map_or(0, |last| last + 1);
    if significant > 8 {
        return Err(TermError::IntegerOverflow);
    }

    let mut le = [0u8; 8];
    le[..significant].copy_from_slice(&digits[..significant]);
    let magnitude = i128::from(u64::from_le_bytes(le));
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| TermError::IntegerOverflow)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| TermError::InvalidAtom)
}

fn encode_atom(name: &str, dst: &mut BytesMut) -> Result<()> {
    let bytes = name.as_bytes();
    if let Ok(len) = u8::try_from(bytes.len()) {
        dst.put_u8(tag::SMALL_ATOM_UTF8);
        dst.put_u8(len);
    } else {
        dst.put_u8(tag::ATOM_UTF8);
        dst.put_u16(u16::try_from(bytes.len()).map_err(|_| TermError::TooLarge)?);
    }
    dst.extend_from_slice(bytes);
    Ok(())
}

fn encode_integer(value: i64, dst: &mut BytesMut) {
    if let Ok(small) = u8::try_from(value) {
        dst.put_u8(tag::SMALL_INTEGER);
        dst.put_u8(small);
    } else if let Ok(int) = i32::try_from(value) {
        dst.put_u8(tag::INTEGER);
        dst.put_i32(int);
    } else {
        let le = value.unsigned_abs().to_le_bytes();
        let len = le.iter().rposition(|&d| d != 0).map_or(0, |last| last + 1);
        dst.put_u8(tag::SMALL_BIG);
        dst.put_u8(len as u8);
        dst.put_u8(u8::from(value < 0));
        dst.extend_from_slice(&le[..len]);
    }
}

/// Erlang-ish rendering, for logs.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", term)?;
            }
            Ok(())
        }

        match self {
            Term::Atom(name) => write!(f, "{}", name),
            Term::Integer(value) => write!(f, "{}", value),
            Term::Binary(bytes) => {
                write!(f, "<<")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", byte)?;
                }
                write!(f, ">>")
            }
            Term::Tuple(elements) => {
                write!(f, "{{")?;
                join(f, elements)?;
                write!(f, "}}")
            }
            Term::Nil => write!(f, "[]"),
            Term::List { elements, tail } => {
                write!(f, "[")?;
                join(f, elements)?;
                if **tail != Term::Nil {
                    write!(f, "|{}", tail)?;
                }
                write!(f, "]")
            }
            Term::Pid { node, id, serial, .. } => write!(f, "#PID<{}.{}.{}>", node, id, serial),
            Term::Reference { node, ids, .. } => {
                write!(f, "#Ref<{}", node)?;
                for id in ids.iter().rev() {
                    write!(f, ".{}", id)?;
                }
                write!(f, ">")
            }
        }
    }
}
