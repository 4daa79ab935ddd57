//! The capability set a key type must provide.

use std::cmp::Ordering;

use crate::common::{Error, Result};

/// A fixed-size key stored inline in node records.
///
/// `size()` must return the same value on every call and must equal the
/// key size the store was created with; every tree call that takes a key
/// checks this and fails with `Error::KeySizeMismatch` otherwise.
///
/// A key may carry payload bytes that do not take part in ordering. Such
/// keys make `update` useful: the stored bytes are replaced while the
/// key's position stays put.
///
/// # Example
/// ```
/// use std::cmp::Ordering;
/// use diskbtree::{Key, Result};
///
/// /// Ordered by `id`, carrying `hits` as payload.
/// #[derive(Debug, PartialEq)]
/// struct Counter {
///     id: u32,
///     hits: u32,
/// }
///
/// impl Key for Counter {
///     fn size(&self) -> usize {
///         8
///     }
///
///     fn compare(&self, raw: &[u8]) -> Ordering {
///         let other = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
///         self.id.cmp(&other)
///     }
///
///     fn read_from(raw: &[u8]) -> Result<Self> {
///         Ok(Counter {
///             id: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
///             hits: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
///         })
///     }
///
///     fn write_to(&self, raw: &mut [u8]) -> Result<()> {
///         raw[..4].copy_from_slice(&self.id.to_le_bytes());
///         raw[4..8].copy_from_slice(&self.hits.to_le_bytes());
///         Ok(())
///     }
/// }
/// ```
pub trait Key: Sized {
    /// Encoded length in bytes.
    fn size(&self) -> usize;

    /// Order `self` against an encoded key.
    fn compare(&self, raw: &[u8]) -> Ordering;

    /// Decode a key from exactly `size()` bytes.
    fn read_from(raw: &[u8]) -> Result<Self>;

    /// Encode into exactly `size()` bytes.
    fn write_to(&self, raw: &mut [u8]) -> Result<()>;
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N]> {
    raw.try_into()
        .map_err(|_| Error::InvalidKey(format!("expected {N} bytes, got {}", raw.len())))
}

fn put(raw: &mut [u8], bytes: &[u8]) -> Result<()> {
    if raw.len() != bytes.len() {
        return Err(Error::InvalidKey(format!(
            "expected {} bytes, got {}",
            bytes.len(),
            raw.len()
        )));
    }
    raw.copy_from_slice(bytes);
    Ok(())
}

macro_rules! int_key {
    ($($ty:ty),*) => {
        $(
            /// Little-endian encoding, numeric ordering.
            impl Key for $ty {
                #[inline]
                fn size(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }

                fn compare(&self, raw: &[u8]) -> Ordering {
                    match fixed(raw) {
                        Ok(bytes) => self.cmp(&<$ty>::from_le_bytes(bytes)),
                        // Sizes are checked before any comparison happens.
                        Err(_) => Ordering::Less,
                    }
                }

                fn read_from(raw: &[u8]) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(fixed(raw)?))
                }

                fn write_to(&self, raw: &mut [u8]) -> Result<()> {
                    put(raw, &self.to_le_bytes())
                }
            }
        )*
    };
}

int_key!(u32, u64, i32, i64);

/// Raw bytes, lexicographic ordering.
impl<const N: usize> Key for [u8; N] {
    #[inline]
    fn size(&self) -> usize {
        N
    }

    fn compare(&self, raw: &[u8]) -> Ordering {
        self.as_slice().cmp(raw)
    }

    fn read_from(raw: &[u8]) -> Result<Self> {
        fixed(raw)
    }

    fn write_to(&self, raw: &mut [u8]) -> Result<()> {
        put(raw, self)
    }
}

/// Raw bytes whose length is only known at run time. Every key handed to a
/// tree must still have the tree's key size.
impl Key for Vec<u8> {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }

    fn compare(&self, raw: &[u8]) -> Ordering {
        self.as_slice().cmp(raw)
    }

    fn read_from(raw: &[u8]) -> Result<Self> {
        Ok(raw.to_vec())
    }

    fn write_to(&self, raw: &mut [u8]) -> Result<()> {
        put(raw, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<K: Key>(key: &K) -> Vec<u8> {
        let mut buf = vec![0u8; key.size()];
        key.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_int_sizes() {
        assert_eq!(7u32.size(), 4);
        assert_eq!(7u64.size(), 8);
        assert_eq!((-7i32).size(), 4);
        assert_eq!((-7i64).size(), 8);
    }

    #[test]
    fn test_int_compare_is_numeric() {
        let raw = encode(&256u32);
        assert_eq!(255u32.compare(&raw), Ordering::Less);
        assert_eq!(256u32.compare(&raw), Ordering::Equal);
        assert_eq!(257u32.compare(&raw), Ordering::Greater);

        // Little-endian bytes alone would sort -1 above 1.
        let raw = encode(&1i64);
        assert_eq!((-1i64).compare(&raw), Ordering::Less);
    }

    #[test]
    fn test_int_read_back() {
        let raw = encode(&0xDEAD_BEEF_u64);
        assert_eq!(u64::read_from(&raw).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_wrong_length_is_invalid_key() {
        assert!(matches!(u32::read_from(&[1, 2]), Err(Error::InvalidKey(_))));

        let mut short = [0u8; 3];
        assert!(matches!(
            9u32.write_to(&mut short),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_byte_array_ordering() {
        let key = *b"abc";
        assert_eq!(key.size(), 3);
        assert_eq!(key.compare(b"abd"), Ordering::Less);
        assert_eq!(key.compare(b"abc"), Ordering::Equal);
        assert_eq!(key.compare(b"abb"), Ordering::Greater);
        assert_eq!(<[u8; 3]>::read_from(b"xyz").unwrap(), *b"xyz");
    }

    #[test]
    fn test_vec_key() {
        let key = b"ab".to_vec();
        assert_eq!(key.size(), 2);
        assert_eq!(key.compare(b"ac"), Ordering::Less);

        let mut raw = [0u8; 3];
        assert!(matches!(key.write_to(&mut raw), Err(Error::InvalidKey(_))));
    }
}
