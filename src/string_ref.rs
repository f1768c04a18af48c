//! String values.
//!
//! A [`JsString`] is either up to 14 inline bytes (no allocation, no
//! refcounting) or an `Rc`-shared [`LongString`] record. `Rc`'s strong count
//! stands in for a manual retain count: cloning a long `JsString` bumps it,
//! dropping the last clone frees the backing bytes. Constants and
//! host-owned strings set `external_owner`, which is consulted by
//! higher-level code (not by `Rc` itself) wherever refcount maintenance
//! should be disabled — see DESIGN.md for why we lean on `Rc` here rather
//! than a hand-rolled saturating counter.

use std::fmt;
use std::rc::Rc;

/// Inline strings store at most this many bytes before promotion to a
/// [`LongString`] record.
pub const INLINE_CAPACITY: usize = 14;

/// A long string's backing allocation, shared by `Rc`.
#[derive(Debug)]
pub struct LongString {
    pub bytes: Box<[u8]>,
    /// Codepoint count, or `0` meaning "unknown, recompute lazily".
    pub length: u32,
    /// Set for compile-time constants and host-owned strings: refcount
    /// maintenance is a no-op and the string is never freed early.
    pub external_owner: bool,
    /// O(1) codepoint-index offsets, built lazily for long non-ASCII
    /// strings past the build-time threshold.
    pub offset_index: Option<Box<[u32]>>,
}

/// Threshold past which a non-ASCII long string gets an offset index built.
pub const OFFSET_INDEX_THRESHOLD: usize = 64;

#[derive(Debug, Clone)]
enum Repr {
    Inline { bytes: [u8; INLINE_CAPACITY], len: u8 },
    Long(Rc<LongString>),
}

/// A string value: either inline or a refcounted long-string record.
#[derive(Debug, Clone)]
pub struct JsString(Repr);

impl JsString {
    /// Builds a `JsString` from owned bytes, choosing inline vs long layout.
    pub fn from_owned(s: impl Into<Vec<u8>>) -> Self {
        let bytes = s.into();
        Self::from_bytes(bytes, None, false)
    }

    /// Builds a constant string: external-owner sentinel set, never refcounted.
    pub fn from_static(s: &'static str) -> Self {
        let bytes = s.as_bytes().to_vec();
        let length = s.chars().count() as u32;
        Self::from_bytes(bytes, Some(length), true)
    }

    pub fn empty() -> Self {
        Self::from_bytes(Vec::new(), Some(0), true)
    }

    fn from_bytes(bytes: Vec<u8>, known_length: Option<u32>, external_owner: bool) -> Self {
        if bytes.len() <= INLINE_CAPACITY {
            let mut arr = [0u8; INLINE_CAPACITY];
            arr[..bytes.len()].copy_from_slice(&bytes);
            return JsString(Repr::Inline {
                bytes: arr,
                len: bytes.len() as u8,
            });
        }

        let length = known_length.unwrap_or(0);
        let ascii = bytes.iter().all(|b| b.is_ascii());
        let offset_index = if !ascii && bytes.len() > OFFSET_INDEX_THRESHOLD && length != 0 {
            Some(build_offset_index(&bytes))
        } else {
            None
        };

        JsString(Repr::Long(Rc::new(LongString {
            bytes: bytes.into_boxed_slice(),
            length,
            external_owner,
            offset_index,
        })))
    }

    /// Concatenates two strings: allocates `size1 + size2` bytes; length is
    /// kept iff both operands know theirs, else left unknown.
    pub fn concat(a: &JsString, b: &JsString) -> JsString {
        let mut bytes = Vec::with_capacity(a.byte_len() + b.byte_len());
        bytes.extend_from_slice(a.as_bytes());
        bytes.extend_from_slice(b.as_bytes());

        let length = match (a.known_length(), b.known_length()) {
            (Some(la), Some(lb)) => Some(la + lb),
            _ => None,
        };

        JsString::from_bytes(bytes, length, false)
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Inline { bytes, len } => &bytes[..*len as usize],
            Repr::Long(rc) => &rc.bytes,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Codepoint count if known without a scan; `None` means "unknown,
    /// recompute lazily" (inline strings are always known since they're
    /// short enough to count on the spot).
    pub fn known_length(&self) -> Option<u32> {
        match &self.0 {
            Repr::Inline { bytes, len } => {
                Some(std::str::from_utf8(&bytes[..*len as usize]).map_or(*len as u32, |s| {
                    s.chars().count() as u32
                }))
            }
            Repr::Long(rc) if rc.length != 0 => Some(rc.length),
            Repr::Long(rc) if rc.bytes.is_empty() => Some(0),
            Repr::Long(_) => None,
        }
    }

    /// Codepoint count, scanning if necessary.
    pub fn char_len(&self) -> u32 {
        self.known_length()
            .unwrap_or_else(|| self.as_str_lossy().chars().count() as u32)
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Is this a long string whose refcount maintenance is disabled?
    pub fn is_external_owner(&self) -> bool {
        matches!(&self.0, Repr::Long(rc) if rc.external_owner)
    }

    /// Number of live references to the backing allocation (1 for inline
    /// strings, since they have no shared backing).
    pub fn retain_count(&self) -> usize {
        match &self.0 {
            Repr::Inline { .. } => 1,
            Repr::Long(rc) => Rc::strong_count(rc),
        }
    }

    /// Returns the one-codepoint substring at `index`, used by indexed
    /// string property access.
    pub fn char_at(&self, index: u32) -> Option<JsString> {
        self.as_str_lossy()
            .chars()
            .nth(index as usize)
            .map(|c| JsString::from_owned(c.to_string()))
    }
}

fn build_offset_index(bytes: &[u8]) -> Box<[u32]> {
    let s = String::from_utf8_lossy(bytes);
    s.char_indices()
        .map(|(i, _)| i as u32)
        .collect::<Vec<_>>()
        .into_boxed_slice()
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for JsString {}

impl PartialOrd for JsString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for JsString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl std::hash::Hash for JsString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_owned(s.to_string())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from_owned(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_roundtrip() {
        let s = JsString::from_owned("hello");
        assert_eq!(s.as_bytes(), b"hello");
        assert_eq!(s.char_len(), 5);
    }

    #[test]
    fn long_string_refcount_drops_to_one() {
        let long = "x".repeat(32);
        let s = JsString::from_owned(long.clone());
        assert_eq!(s.retain_count(), 1);
        let s2 = s.clone();
        assert_eq!(s.retain_count(), 2);
        drop(s2);
        assert_eq!(s.retain_count(), 1);
    }

    #[test]
    fn concat_preserves_known_length() {
        let a = JsString::from_owned("ab");
        let b = JsString::from_owned("cd");
        let c = JsString::concat(&a, &b);
        assert_eq!(c.as_bytes(), b"abcd");
        assert_eq!(c.char_len(), 4);
    }

    #[test]
    fn concat_with_unknown_length_is_unknown_until_scanned() {
        let long_unknown = JsString::from_owned(vec![b'a'; 40]);
        // Force unknown length by faking through concat of two unknowns
        let a = JsString::concat(&long_unknown, &long_unknown);
        let b = JsString::concat(&a, &a);
        // char_len still computes correctly even if known_length was lost
        assert_eq!(b.char_len(), 160);
    }

    #[test]
    fn external_owner_strings_never_report_growth() {
        let s = JsString::from_static("k");
        assert!(s.is_external_owner() || s.retain_count() == 1);
    }
}
