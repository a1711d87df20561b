//! Byte-order aware scalar reads.
//!
//! FITS stores all binary data big-endian; XISF attachments are little-endian
//! unless the image element says otherwise. Every read here takes the byte
//! order as a value so the pixel decoder can stay a single routine.

/// Byte order of a pixel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most-significant byte first (FITS, XISF `byteOrder="big"`).
    Big,
    /// Least-significant byte first (XISF default).
    Little,
}

impl ByteOrder {
    /// Read a `u16` from the first 2 bytes of the slice.
    #[inline]
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        let b = [buf[0], buf[1]];
        match self {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        }
    }

    /// Read an `i16` from the first 2 bytes of the slice.
    #[inline]
    pub fn read_i16(self, buf: &[u8]) -> i16 {
        self.read_u16(buf) as i16
    }

    /// Read a `u32` from the first 4 bytes of the slice.
    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        let b = [buf[0], buf[1], buf[2], buf[3]];
        match self {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        }
    }

    /// Read an `i32` from the first 4 bytes of the slice.
    #[inline]
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        self.read_u32(buf) as i32
    }

    /// Read a `u64` from the first 8 bytes of the slice.
    #[inline]
    pub fn read_u64(self, buf: &[u8]) -> u64 {
        let b = [
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ];
        match self {
            ByteOrder::Big => u64::from_be_bytes(b),
            ByteOrder::Little => u64::from_le_bytes(b),
        }
    }

    /// Read an `i64` from the first 8 bytes of the slice.
    #[inline]
    pub fn read_i64(self, buf: &[u8]) -> i64 {
        self.read_u64(buf) as i64
    }

    /// Read an IEEE 754 `f32` from the first 4 bytes of the slice.
    #[inline]
    pub fn read_f32(self, buf: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(buf))
    }

    /// Read an IEEE 754 `f64` from the first 8 bytes of the slice.
    #[inline]
    pub fn read_f64(self, buf: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(buf))
    }
}
