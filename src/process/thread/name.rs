use std::fmt;

/// A thread (or process) name held in a fixed 16-byte buffer, including
/// the terminator. Longer names are truncated, never rejected.
const NAME_BUF_LEN: usize = 16;

#[derive(Clone, Default, PartialEq)]
pub struct ThreadName {
    buf: [u8; NAME_BUF_LEN],
    len: usize,
}

impl ThreadName {
    pub fn new(name: &str) -> Self {
        let mut truncated = name.as_bytes();
        if truncated.len() > NAME_BUF_LEN - 1 {
            // Cut on a char boundary so the name stays valid UTF-8.
            let mut end = NAME_BUF_LEN - 1;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            truncated = &truncated[..end];
        }
        let mut buf = [0u8; NAME_BUF_LEN];
        buf[..truncated.len()].copy_from_slice(truncated);
        Self {
            buf,
            len: truncated.len(),
        }
    }

    pub const fn max_len() -> usize {
        NAME_BUF_LEN - 1
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_fifteen_bytes() {
        let name = ThreadName::new("a-very-long-program-name");
        assert_eq!(name.as_str(), "a-very-long-pro");
        assert_eq!(name.as_str().len(), ThreadName::max_len());
    }

    #[test]
    fn short_names_pass_through() {
        assert_eq!(ThreadName::new("echo").as_str(), "echo");
        assert_eq!(ThreadName::default().as_str(), "");
    }
}
