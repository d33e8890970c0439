// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grey (pixel) types, tagged scalar values and tagged flat buffers.
//!
//! Every value store holds exactly one [`GreyType`]. Conversions between
//! types round to nearest and clamp to the destination range, so a value
//! written into a narrower store saturates rather than wraps.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Pixel and indexed-value numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GreyType {
    Long,
    Int,
    Short,
    UByte,
    Float,
    Double,
    /// Packed 8-bit red, green, blue and alpha.
    Rgba,
}

impl GreyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GreyType::Long => "long",
            GreyType::Int => "int",
            GreyType::Short => "short",
            GreyType::UByte => "ubyte",
            GreyType::Float => "float",
            GreyType::Double => "double",
            GreyType::Rgba => "rgba",
        }
    }

    /// Returns `true` for types stored as integers.
    pub fn is_integral(&self) -> bool {
        !matches!(self, GreyType::Float | GreyType::Double)
    }

    /// Number of channels accumulated separately (4 for RGBA).
    pub fn channels(&self) -> usize {
        match self {
            GreyType::Rgba => 4,
            _ => 1,
        }
    }

    /// Representable range of a single channel.
    pub fn range(&self) -> (f64, f64) {
        match self {
            GreyType::Long => (i64::MIN as f64, i64::MAX as f64),
            GreyType::Int => (i32::MIN as f64, i32::MAX as f64),
            GreyType::Short => (i16::MIN as f64, i16::MAX as f64),
            GreyType::UByte | GreyType::Rgba => (0.0, 255.0),
            GreyType::Float => (f32::MIN as f64, f32::MAX as f64),
            GreyType::Double => (f64::MIN, f64::MAX),
        }
    }
}

impl std::fmt::Display for GreyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nearest integer, rounding halves up.
#[inline]
pub fn nint(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Packs RGBA channels, red in the lowest byte.
#[inline]
pub fn rgba_pack(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Unpacks RGBA channels as `[r, g, b, a]`.
#[inline]
pub fn rgba_unpack(v: u32) -> [u8; 4] {
    [
        (v & 0xff) as u8,
        ((v >> 8) & 0xff) as u8,
        ((v >> 16) & 0xff) as u8,
        ((v >> 24) & 0xff) as u8,
    ]
}

#[inline]
fn channel_u8(v: f64) -> u8 {
    nint(v).clamp(0.0, 255.0) as u8
}

/// A single value tagged with its grey type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GreyValue {
    Long(i64),
    Int(i32),
    Short(i16),
    UByte(u8),
    Float(f32),
    Double(f64),
    Rgba(u32),
}

impl GreyValue {
    pub fn grey_type(&self) -> GreyType {
        match self {
            GreyValue::Long(_) => GreyType::Long,
            GreyValue::Int(_) => GreyType::Int,
            GreyValue::Short(_) => GreyType::Short,
            GreyValue::UByte(_) => GreyType::UByte,
            GreyValue::Float(_) => GreyType::Float,
            GreyValue::Double(_) => GreyType::Double,
            GreyValue::Rgba(_) => GreyType::Rgba,
        }
    }

    /// Zero of the given type (opaque black for RGBA).
    pub fn zero(gt: GreyType) -> Self {
        Self::from_f64(gt, 0.0)
    }

    /// Scalar value; RGBA yields the mean of its colour channels.
    pub fn to_f64(&self) -> f64 {
        match *self {
            GreyValue::Long(v) => v as f64,
            GreyValue::Int(v) => v as f64,
            GreyValue::Short(v) => v as f64,
            GreyValue::UByte(v) => v as f64,
            GreyValue::Float(v) => v as f64,
            GreyValue::Double(v) => v,
            GreyValue::Rgba(v) => {
                let [r, g, b, _] = rgba_unpack(v);
                (r as f64 + g as f64 + b as f64) / 3.0
            }
        }
    }

    /// Builds a value of type `gt` from a scalar, rounding and clamping.
    ///
    /// For RGBA the clamped value is replicated into red, green and blue with
    /// an opaque alpha.
    pub fn from_f64(gt: GreyType, v: f64) -> Self {
        let (lo, hi) = gt.range();
        match gt {
            GreyType::Long => GreyValue::Long(nint(v).clamp(lo, hi) as i64),
            GreyType::Int => GreyValue::Int(nint(v).clamp(lo, hi) as i32),
            GreyType::Short => GreyValue::Short(nint(v).clamp(lo, hi) as i16),
            GreyType::UByte => GreyValue::UByte(channel_u8(v)),
            GreyType::Float => GreyValue::Float(v.clamp(lo, hi) as f32),
            GreyType::Double => GreyValue::Double(v),
            GreyType::Rgba => {
                let c = channel_u8(v);
                GreyValue::Rgba(rgba_pack(c, c, c, 255))
            }
        }
    }

    /// Builds an RGBA or scalar value from per-channel values.
    ///
    /// For scalar types only the first channel is used.
    pub fn from_channels(gt: GreyType, ch: [f64; 4]) -> Self {
        match gt {
            GreyType::Rgba => GreyValue::Rgba(rgba_pack(
                channel_u8(ch[0]),
                channel_u8(ch[1]),
                channel_u8(ch[2]),
                channel_u8(ch[3]),
            )),
            _ => Self::from_f64(gt, ch[0]),
        }
    }

    /// Per-channel values; scalars occupy channel 0.
    pub fn channels(&self) -> [f64; 4] {
        match *self {
            GreyValue::Rgba(v) => {
                let [r, g, b, a] = rgba_unpack(v);
                [r as f64, g as f64, b as f64, a as f64]
            }
            _ => [self.to_f64(), 0.0, 0.0, 0.0],
        }
    }

    /// Converts to another grey type.
    pub fn convert(&self, gt: GreyType) -> Self {
        if self.grey_type() == gt {
            return *self;
        }
        Self::from_f64(gt, self.to_f64())
    }
}

/// A flat vector of values of a single grey type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GreyBuffer {
    Long(Vec<i64>),
    Int(Vec<i32>),
    Short(Vec<i16>),
    UByte(Vec<u8>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Rgba(Vec<u32>),
}

macro_rules! each_buffer {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            GreyBuffer::Long($v) => $body,
            GreyBuffer::Int($v) => $body,
            GreyBuffer::Short($v) => $body,
            GreyBuffer::UByte($v) => $body,
            GreyBuffer::Float($v) => $body,
            GreyBuffer::Double($v) => $body,
            GreyBuffer::Rgba($v) => $body,
        }
    };
}

impl GreyBuffer {
    /// Creates a buffer of `len` copies of `value`.
    pub fn filled(value: GreyValue, len: usize) -> Self {
        match value {
            GreyValue::Long(v) => GreyBuffer::Long(vec![v; len]),
            GreyValue::Int(v) => GreyBuffer::Int(vec![v; len]),
            GreyValue::Short(v) => GreyBuffer::Short(vec![v; len]),
            GreyValue::UByte(v) => GreyBuffer::UByte(vec![v; len]),
            GreyValue::Float(v) => GreyBuffer::Float(vec![v; len]),
            GreyValue::Double(v) => GreyBuffer::Double(vec![v; len]),
            GreyValue::Rgba(v) => GreyBuffer::Rgba(vec![v; len]),
        }
    }

    /// Like [`GreyBuffer::filled`], reporting allocation failure.
    pub fn try_filled(value: GreyValue, len: usize) -> Result<Self> {
        fn alloc<T: Clone>(v: T, len: usize) -> Result<Vec<T>> {
            let mut out = Vec::new();
            out.try_reserve_exact(len)?;
            out.resize(len, v);
            Ok(out)
        }
        Ok(match value {
            GreyValue::Long(v) => GreyBuffer::Long(alloc(v, len)?),
            GreyValue::Int(v) => GreyBuffer::Int(alloc(v, len)?),
            GreyValue::Short(v) => GreyBuffer::Short(alloc(v, len)?),
            GreyValue::UByte(v) => GreyBuffer::UByte(alloc(v, len)?),
            GreyValue::Float(v) => GreyBuffer::Float(alloc(v, len)?),
            GreyValue::Double(v) => GreyBuffer::Double(alloc(v, len)?),
            GreyValue::Rgba(v) => GreyBuffer::Rgba(alloc(v, len)?),
        })
    }

    /// Creates a zero-filled buffer.
    pub fn zeros(gt: GreyType, len: usize) -> Self {
        match gt {
            GreyType::Rgba => GreyBuffer::Rgba(vec![0; len]),
            _ => Self::filled(GreyValue::zero(gt), len),
        }
    }

    pub fn grey_type(&self) -> GreyType {
        match self {
            GreyBuffer::Long(_) => GreyType::Long,
            GreyBuffer::Int(_) => GreyType::Int,
            GreyBuffer::Short(_) => GreyType::Short,
            GreyBuffer::UByte(_) => GreyType::UByte,
            GreyBuffer::Float(_) => GreyType::Float,
            GreyBuffer::Double(_) => GreyType::Double,
            GreyBuffer::Rgba(_) => GreyType::Rgba,
        }
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows or shrinks the buffer, filling new entries with zero.
    pub fn resize(&mut self, len: usize) {
        each_buffer!(self, v => v.resize(len, Default::default()))
    }

    pub fn get(&self, i: usize) -> Option<GreyValue> {
        match self {
            GreyBuffer::Long(v) => v.get(i).map(|&x| GreyValue::Long(x)),
            GreyBuffer::Int(v) => v.get(i).map(|&x| GreyValue::Int(x)),
            GreyBuffer::Short(v) => v.get(i).map(|&x| GreyValue::Short(x)),
            GreyBuffer::UByte(v) => v.get(i).map(|&x| GreyValue::UByte(x)),
            GreyBuffer::Float(v) => v.get(i).map(|&x| GreyValue::Float(x)),
            GreyBuffer::Double(v) => v.get(i).map(|&x| GreyValue::Double(x)),
            GreyBuffer::Rgba(v) => v.get(i).map(|&x| GreyValue::Rgba(x)),
        }
    }

    /// Stores `value` at `i`, converting it to the buffer's type.
    ///
    /// Returns `false` when `i` is out of range.
    pub fn set(&mut self, i: usize, value: GreyValue) -> bool {
        if i >= self.len() {
            return false;
        }
        let value = value.convert(self.grey_type());
        match (self, value) {
            (GreyBuffer::Long(v), GreyValue::Long(x)) => v[i] = x,
            (GreyBuffer::Int(v), GreyValue::Int(x)) => v[i] = x,
            (GreyBuffer::Short(v), GreyValue::Short(x)) => v[i] = x,
            (GreyBuffer::UByte(v), GreyValue::UByte(x)) => v[i] = x,
            (GreyBuffer::Float(v), GreyValue::Float(x)) => v[i] = x,
            (GreyBuffer::Double(v), GreyValue::Double(x)) => v[i] = x,
            (GreyBuffer::Rgba(v), GreyValue::Rgba(x)) => v[i] = x,
            _ => return false,
        }
        true
    }

    #[inline]
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            GreyBuffer::Double(v) => v.get(i).copied(),
            _ => self.get(i).map(|g| g.to_f64()),
        }
    }

    /// Stores a scalar at `i`, rounding and clamping for integer types.
    #[inline]
    pub fn set_f64(&mut self, i: usize, value: f64) -> bool {
        let gt = self.grey_type();
        self.set(i, GreyValue::from_f64(gt, value))
    }

    /// Borrow as doubles when the buffer holds doubles.
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match self {
            GreyBuffer::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_slice_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            GreyBuffer::Double(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_round_trip_channels() {
        let v = rgba_pack(1, 2, 3, 4);
        assert_eq!(rgba_unpack(v), [1, 2, 3, 4]);
    }

    #[test]
    fn conversion_rounds_and_clamps() {
        assert_eq!(GreyValue::Double(2.5).convert(GreyType::Int), GreyValue::Int(3));
        assert_eq!(GreyValue::Double(-2.5).convert(GreyType::Int), GreyValue::Int(-2));
        assert_eq!(GreyValue::Int(300).convert(GreyType::UByte), GreyValue::UByte(255));
        assert_eq!(GreyValue::Int(-40000).convert(GreyType::Short), GreyValue::Short(i16::MIN));
        assert_eq!(
            GreyValue::UByte(7).convert(GreyType::Rgba),
            GreyValue::Rgba(rgba_pack(7, 7, 7, 255))
        );
        assert_eq!(GreyValue::Rgba(rgba_pack(3, 6, 9, 0)).to_f64(), 6.0);
    }

    #[test]
    fn buffer_set_converts_to_store_type() {
        let mut buf = GreyBuffer::zeros(GreyType::Short, 3);
        assert!(buf.set(1, GreyValue::Double(12.6)));
        assert!(!buf.set(3, GreyValue::Short(1)));
        assert_eq!(buf.get(1), Some(GreyValue::Short(13)));
        assert_eq!(buf.get_f64(0), Some(0.0));
        assert!(buf.as_f64_slice().is_none());
    }

    #[test]
    fn buffer_set_clamps_to_store_range() {
        let mut buf = GreyBuffer::zeros(GreyType::UByte, 2);
        assert!(buf.set(0, GreyValue::Int(300)));
        assert!(buf.set(1, GreyValue::Double(-4.0)));
        assert_eq!(buf.get(0), Some(GreyValue::UByte(255)));
        assert_eq!(buf.get(1), Some(GreyValue::UByte(0)));
    }

    #[test]
    fn buffer_resize_zero_fills() {
        let mut buf = GreyBuffer::filled(GreyValue::Double(1.5), 2);
        buf.resize(4);
        assert_eq!(buf.as_f64_slice(), Some(&[1.5, 1.5, 0.0, 0.0][..]));
    }
}
