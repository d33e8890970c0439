// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rectangular grey value tables for domain objects.

use serde::{Deserialize, Serialize};

use crate::domain::{IntervalDomain, PlaneDomain};
use crate::error::{Error, Result};
use crate::grey::{GreyBuffer, GreyType, GreyValue};

/// Grey values over the bounding box of a 2D domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTable2D {
    line1: i32,
    kol1: i32,
    width: usize,
    height: usize,
    data: GreyBuffer,
    background: GreyValue,
}

impl ValueTable2D {
    /// Creates a table over `line1..=lastln` by `kol1..=lastkl` filled with
    /// the background value.
    pub fn new(
        line1: i32,
        lastln: i32,
        kol1: i32,
        lastkl: i32,
        grey: GreyType,
        background: GreyValue,
    ) -> Result<Self> {
        if lastln < line1 || lastkl < kol1 {
            return Err(Error::DomainData(format!(
                "value table bounds lines {}..={} columns {}..={} are empty",
                line1, lastln, kol1, lastkl
            )));
        }
        let width = (lastkl as i64 - kol1 as i64 + 1) as usize;
        let height = (lastln as i64 - line1 as i64 + 1) as usize;
        let len = width.checked_mul(height).ok_or(Error::OutOfMemory)?;
        let background = background.convert(grey);
        Ok(Self {
            line1,
            kol1,
            width,
            height,
            data: GreyBuffer::try_filled(background, len)?,
            background,
        })
    }

    /// Creates a background-filled table covering `domain`.
    pub fn for_domain(
        domain: &IntervalDomain,
        grey: GreyType,
        background: GreyValue,
    ) -> Result<Self> {
        Self::new(domain.line1(), domain.lastln(), domain.kol1(), domain.lastkl(), grey, background)
    }

    #[inline]
    pub fn grey_type(&self) -> GreyType {
        self.data.grey_type()
    }

    #[inline]
    pub fn background(&self) -> GreyValue {
        self.background
    }

    #[inline]
    pub fn line1(&self) -> i32 {
        self.line1
    }

    #[inline]
    pub fn kol1(&self) -> i32 {
        self.kol1
    }

    #[inline]
    pub fn lastln(&self) -> i32 {
        self.line1 + self.height as i32 - 1
    }

    #[inline]
    pub fn lastkl(&self) -> i32 {
        self.kol1 + self.width as i32 - 1
    }

    #[inline]
    fn offset(&self, line: i32, kol: i32) -> Option<usize> {
        let l = line as i64 - self.line1 as i64;
        let k = kol as i64 - self.kol1 as i64;
        if l < 0 || k < 0 || l >= self.height as i64 || k >= self.width as i64 {
            return None;
        }
        Some(l as usize * self.width + k as usize)
    }

    /// Stored value, `None` outside the table's rectangle.
    #[inline]
    pub fn get(&self, line: i32, kol: i32) -> Option<GreyValue> {
        self.data.get(self.offset(line, kol)?)
    }

    /// Stores a value, converting to the table's type.
    pub fn set(&mut self, line: i32, kol: i32, v: GreyValue) -> bool {
        match self.offset(line, kol) {
            Some(i) => self.data.set(i, v),
            None => false,
        }
    }

    #[inline]
    pub fn get_f64(&self, line: i32, kol: i32) -> Option<f64> {
        self.data.get_f64(self.offset(line, kol)?)
    }

    pub fn set_f64(&mut self, line: i32, kol: i32, v: f64) -> bool {
        match self.offset(line, kol) {
            Some(i) => self.data.set_f64(i, v),
            None => false,
        }
    }

    pub fn data(&self) -> &GreyBuffer {
        &self.data
    }
}

/// Per-plane value tables for a 3D domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelValues {
    plane1: i32,
    planes: Vec<Option<ValueTable2D>>,
    grey: GreyType,
    background: GreyValue,
}

impl VoxelValues {
    /// Creates background-filled tables for every non-empty plane of `domain`.
    pub fn for_domain(domain: &PlaneDomain, grey: GreyType, background: GreyValue) -> Result<Self> {
        let count = (domain.lastpl() as i64 - domain.plane1() as i64 + 1).max(0) as usize;
        let mut planes = Vec::new();
        planes.try_reserve_exact(count)?;
        planes.resize(count, None);
        for (p, d) in domain.planes() {
            planes[(p - domain.plane1()) as usize] =
                Some(ValueTable2D::for_domain(d, grey, background)?);
        }
        Ok(Self {
            plane1: domain.plane1(),
            planes,
            grey,
            background: background.convert(grey),
        })
    }

    #[inline]
    pub fn grey_type(&self) -> GreyType {
        self.grey
    }

    #[inline]
    pub fn background(&self) -> GreyValue {
        self.background
    }

    pub fn plane(&self, p: i32) -> Option<&ValueTable2D> {
        let i = p as i64 - self.plane1 as i64;
        if i < 0 {
            return None;
        }
        self.planes.get(i as usize)?.as_ref()
    }

    pub fn plane_mut(&mut self, p: i32) -> Option<&mut ValueTable2D> {
        let i = p as i64 - self.plane1 as i64;
        if i < 0 {
            return None;
        }
        self.planes.get_mut(i as usize)?.as_mut()
    }

    #[inline]
    pub fn get(&self, plane: i32, line: i32, kol: i32) -> Option<GreyValue> {
        self.plane(plane)?.get(line, kol)
    }

    pub fn set(&mut self, plane: i32, line: i32, kol: i32, v: GreyValue) -> bool {
        self.plane_mut(plane).is_some_and(|t| t.set(line, kol, v))
    }
}
