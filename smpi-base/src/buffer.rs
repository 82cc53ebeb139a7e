//! Buffer traits and implementations (partially based on the data and trait
//! system used in RSMPI).
use std::mem;
use std::slice;

/// Element type that can be moved between processes as raw bytes.
///
/// Bytes travel in native order, so a group must run on a single
/// architecture.
///
/// # Safety
///
/// Implementors must contain no padding and every bit pattern must be a
/// valid value.
pub unsafe trait Element: Copy + Default + Send + Sync + 'static {
    /// Stable identifier checked by the receiving side.
    const TYPE_ID: u64;
}

macro_rules! element {
    ($($ty:ty => $id:expr),* $(,)?) => {
        $(unsafe impl Element for $ty {
            const TYPE_ID: u64 = $id;
        })*
    };
}

element! {
    u8 => 0x01,
    i32 => 0x12,
    u32 => 0x13,
    i64 => 0x14,
    u64 => 0x15,
    f32 => 0x22,
    f64 => 0x24,
}

pub trait Buffer {
    /// Return the type ID of the encoded type.
    fn type_id(&self) -> u64;

    /// Return the size of the buffer in bytes.
    fn size(&self) -> usize;
}

/// Trait for reading out of a buffer.
pub trait BufRead: Buffer {
    fn bytes(&self) -> &[u8];
}

/// Trait for writing into a buffer.
pub trait BufWrite: Buffer {
    fn bytes_mut(&mut self) -> &mut [u8];
}

impl<T: Element> Buffer for [T] {
    fn type_id(&self) -> u64 {
        T::TYPE_ID
    }

    fn size(&self) -> usize {
        mem::size_of_val(self)
    }
}

impl<T: Element> BufRead for [T] {
    fn bytes(&self) -> &[u8] {
        // Element guarantees no padding, so every byte is initialized.
        unsafe { slice::from_raw_parts(self.as_ptr() as *const u8, self.size()) }
    }
}

impl<T: Element> BufWrite for [T] {
    fn bytes_mut(&mut self) -> &mut [u8] {
        // Element guarantees any bit pattern written here is a valid T.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr() as *mut u8, self.size()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_bytes_cover_whole_slice() {
        let data = [1.5f64, -2.0, 3.25];
        assert_eq!(data.size(), 24);
        assert_eq!(data.type_id(), f64::TYPE_ID);
        assert_eq!(&data.bytes()[..8], &1.5f64.to_ne_bytes());
    }

    #[test]
    fn writing_bytes_updates_elements() {
        let src = [7.0f64, 8.0];
        let mut dst = [0.0f64; 2];
        dst.bytes_mut().copy_from_slice(src.bytes());
        assert_eq!(dst, src);
    }

    #[test]
    fn type_ids_are_distinct() {
        let ids = [
            u8::TYPE_ID,
            i32::TYPE_ID,
            u32::TYPE_ID,
            i64::TYPE_ID,
            u64::TYPE_ID,
            f32::TYPE_ID,
            f64::TYPE_ID,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
