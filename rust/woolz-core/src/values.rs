// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indexed values: fixed-shape numeric tuples keyed by mesh entity index.
//!
//! The store is flat. Entity `i` occupies
//! `data[i * tuple_len .. (i + 1) * tuple_len]`, so a node or element index
//! addresses its tuple without any lookup. Tombstoned entities keep their
//! slot in the store.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grey::{GreyBuffer, GreyType, GreyValue};

/// Which mesh entity the values are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueAttach {
    Node,
    Element,
}

impl ValueAttach {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueAttach::Node => "node",
            ValueAttach::Element => "element",
        }
    }
}

/// Per-entity value tuples of one grey type and one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedValues {
    attach: ValueAttach,
    dims: Vec<usize>,
    data: GreyBuffer,
}

fn tuple_len_of(dims: &[usize]) -> usize {
    dims.iter().product()
}

impl IndexedValues {
    /// Creates a zero-filled store for `count` entities.
    pub fn new(
        attach: ValueAttach,
        dims: Vec<usize>,
        grey: GreyType,
        count: usize,
    ) -> Result<Self> {
        let tuple_len = tuple_len_of(&dims);
        if tuple_len == 0 {
            return Err(Error::ParamData(format!("value dimensions {:?} are empty", dims)));
        }
        let len = count
            .checked_mul(tuple_len)
            .ok_or(Error::OutOfMemory)?;
        Ok(Self {
            attach,
            dims,
            data: GreyBuffer::zeros(grey, len),
        })
    }

    /// Wraps an existing buffer, which must hold a whole number of tuples.
    pub fn from_buffer(attach: ValueAttach, dims: Vec<usize>, data: GreyBuffer) -> Result<Self> {
        let tuple_len = tuple_len_of(&dims);
        if tuple_len == 0 {
            return Err(Error::ParamData(format!("value dimensions {:?} are empty", dims)));
        }
        if data.len() % tuple_len != 0 {
            return Err(Error::ValuesData(format!(
                "{} values do not divide into tuples of {}",
                data.len(),
                tuple_len
            )));
        }
        Ok(Self { attach, dims, data })
    }

    /// Node-attached rank-1 doubles, the shape of a displacement store.
    pub fn node_doubles(dim: usize, count: usize) -> Result<Self> {
        Self::new(ValueAttach::Node, vec![dim], GreyType::Double, count)
    }

    #[inline]
    pub fn attach(&self) -> ValueAttach {
        self.attach
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Values per entity (1 for rank 0).
    #[inline]
    pub fn tuple_len(&self) -> usize {
        tuple_len_of(&self.dims)
    }

    #[inline]
    pub fn grey_type(&self) -> GreyType {
        self.data.grey_type()
    }

    /// Number of entity slots the store covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.tuple_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &GreyBuffer {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut GreyBuffer {
        &mut self.data
    }

    /// Borrowed double tuple of entity `i`, without copying.
    #[inline]
    pub fn doubles(&self, i: usize) -> Option<&[f64]> {
        let n = self.tuple_len();
        self.data.as_f64_slice()?.get(i * n..(i + 1) * n)
    }

    #[inline]
    pub fn doubles_mut(&mut self, i: usize) -> Option<&mut [f64]> {
        let n = self.tuple_len();
        self.data.as_f64_slice_mut()?.get_mut(i * n..(i + 1) * n)
    }

    /// Component `c` of entity `i` as a double.
    #[inline]
    pub fn value_f64(&self, i: usize, c: usize) -> Option<f64> {
        let n = self.tuple_len();
        if c >= n {
            return None;
        }
        self.data.get_f64(i * n + c)
    }

    /// Stores component `c` of entity `i`, rounding and clamping for integer
    /// stores. Returns `false` when the index is out of range.
    pub fn set_f64(&mut self, i: usize, c: usize, v: f64) -> bool {
        let n = self.tuple_len();
        c < n && self.data.set_f64(i * n + c, v)
    }

    pub fn grey_value(&self, i: usize, c: usize) -> Option<GreyValue> {
        let n = self.tuple_len();
        if c >= n {
            return None;
        }
        self.data.get(i * n + c)
    }

    pub fn set_grey_value(&mut self, i: usize, c: usize, v: GreyValue) -> bool {
        let n = self.tuple_len();
        c < n && self.data.set(i * n + c, v)
    }

    /// Grows the store with zeros so that it covers `count` entities.
    pub fn ensure_len(&mut self, count: usize) -> Result<()> {
        let want = count.checked_mul(self.tuple_len()).ok_or(Error::OutOfMemory)?;
        if want > self.data.len() {
            self.data.resize(want);
        }
        Ok(())
    }
}
