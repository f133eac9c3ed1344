//! Small-string-optimized byte buffers for token spellings

use std::fmt;

/// Longest spelling that is stored without a heap allocation.
pub const INLINE_CAPACITY: usize = 23;

/// The spelling of a token. Most C tokens are short, so spellings up to 23
/// bytes live inline; longer ones are promoted to the heap. A promoted
/// spelling is never demoted back, even if it is truncated later.
#[derive(Clone)]
pub enum Spelling {
    /// Inline storage, `len` valid bytes
    Inline { len: u8, buf: [u8; INLINE_CAPACITY] },
    /// Heap storage
    Heap(Vec<u8>),
}

impl Spelling {
    pub fn new() -> Spelling {
        Spelling::Inline { len: 0, buf: [0; INLINE_CAPACITY] }
    }

    pub fn from_slice(bytes: &[u8]) -> Spelling {
        if bytes.len() <= INLINE_CAPACITY {
            let mut buf = [0; INLINE_CAPACITY];
            buf[..bytes.len()].copy_from_slice(bytes);
            Spelling::Inline { len: bytes.len() as u8, buf }
        } else {
            Spelling::Heap(bytes.to_vec())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Spelling::Inline { len, .. } => *len as usize,
            Spelling::Heap(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Spelling::Inline { len, buf } => &buf[..*len as usize],
            Spelling::Heap(vec) => &vec,
        }
    }

    /// The spelling as UTF-8. Identifiers and punctuators are always ASCII;
    /// arbitrary bytes can only occur inside literals and `Other` tokens,
    /// which are never inspected as strings.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn push(&mut self, byte: u8) {
        match self {
            Spelling::Inline { len, buf } => {
                if (*len as usize) < INLINE_CAPACITY {
                    buf[*len as usize] = byte;
                    *len += 1;
                } else {
                    let mut vec = buf.to_vec();
                    vec.push(byte);
                    *self = Spelling::Heap(vec);
                }
            },
            Spelling::Heap(vec) => vec.push(byte),
        }
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        match self {
            Spelling::Inline { len, buf } => {
                if *len as usize + bytes.len() <= INLINE_CAPACITY {
                    buf[*len as usize..*len as usize + bytes.len()].copy_from_slice(bytes);
                    *len += bytes.len() as u8;
                } else {
                    let mut vec = buf[..*len as usize].to_vec();
                    vec.extend_from_slice(bytes);
                    *self = Spelling::Heap(vec);
                }
            },
            Spelling::Heap(vec) => vec.extend_from_slice(bytes),
        }
    }

    pub fn is_heap(&self) -> bool {
        match self {
            Spelling::Inline { .. } => false,
            Spelling::Heap(_) => true,
        }
    }
}

impl Default for Spelling {
    fn default() -> Spelling {
        Spelling::new()
    }
}

impl From<&str> for Spelling {
    fn from(s: &str) -> Spelling {
        Spelling::from_slice(s.as_bytes())
    }
}

impl PartialEq for Spelling {
    fn eq(&self, other: &Spelling) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for Spelling {}

impl PartialEq<&str> for Spelling {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<str> for Spelling {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}
