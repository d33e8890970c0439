// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Random-access grey value lookup with a background flag.
//!
//! Pixels outside the object's domain, or in planes without a value table,
//! read as the background value.

use crate::domain::{IntervalDomain, PlaneDomain};
use crate::error::{Error, Result};
use crate::grey::{GreyType, GreyValue};
use crate::object::{DomainObject2D, DomainObject3D};
use crate::table::{ValueTable2D, VoxelValues};

/// A looked-up value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: GreyValue,
    /// The position was outside the valued domain.
    pub background: bool,
}

enum Source<'a> {
    Plane {
        domain: &'a IntervalDomain,
        values: &'a ValueTable2D,
    },
    Volume {
        domain: &'a PlaneDomain,
        values: &'a VoxelValues,
    },
}

/// Grey lookup bound to a domain object with values.
pub struct GreyLookup<'a> {
    source: Source<'a>,
    background: GreyValue,
    grey: GreyType,
}

impl<'a> GreyLookup<'a> {
    pub fn new_2d(obj: &'a DomainObject2D) -> Result<Self> {
        let values = obj.values.as_ref().ok_or(Error::ValuesNull)?;
        Ok(Self {
            source: Source::Plane {
                domain: &obj.domain,
                values,
            },
            background: values.background(),
            grey: values.grey_type(),
        })
    }

    pub fn new_3d(obj: &'a DomainObject3D) -> Result<Self> {
        let values = obj.values.as_ref().ok_or(Error::ValuesNull)?;
        Ok(Self {
            source: Source::Volume {
                domain: &obj.domain,
                values,
            },
            background: values.background(),
            grey: values.grey_type(),
        })
    }

    #[inline]
    pub fn background(&self) -> GreyValue {
        self.background
    }

    #[inline]
    pub fn grey_type(&self) -> GreyType {
        self.grey
    }

    /// Value at a voxel; 2D sources ignore `plane`.
    pub fn get(&self, plane: i32, line: i32, kol: i32) -> Sample {
        let found = match &self.source {
            Source::Plane { domain, values } => {
                if domain.is_inside(line, kol) {
                    values.get(line, kol)
                } else {
                    None
                }
            }
            Source::Volume { domain, values } => {
                if domain.is_inside(plane, line, kol) {
                    values.get(plane, line, kol)
                } else {
                    None
                }
            }
        };
        match found {
            Some(value) => Sample {
                value,
                background: false,
            },
            None => Sample {
                value: self.background,
                background: true,
            },
        }
    }

    /// The 2 by 2 neighbourhood with `(line, kol)` as its low corner,
    /// ordered `(l, k), (l, k+1), (l+1, k), (l+1, k+1)`.
    ///
    /// `None` when any neighbour is background.
    pub fn get_con2(&self, line: i32, kol: i32) -> Option<[GreyValue; 4]> {
        let mut out = [self.background; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let s = self.get(0, line + (i >> 1) as i32, kol + (i & 1) as i32);
            if s.background {
                return None;
            }
            *slot = s.value;
        }
        Some(out)
    }

    /// The 2 by 2 by 2 neighbourhood with `(plane, line, kol)` as its low
    /// corner; neighbour `i` is offset by `(i >> 2, (i >> 1) & 1, i & 1)`.
    ///
    /// `None` when any neighbour is background.
    pub fn get_con3(&self, plane: i32, line: i32, kol: i32) -> Option<[GreyValue; 8]> {
        let mut out = [self.background; 8];
        for (i, slot) in out.iter_mut().enumerate() {
            let s = self.get(
                plane + (i >> 2) as i32,
                line + ((i >> 1) & 1) as i32,
                kol + (i & 1) as i32,
            );
            if s.background {
                return None;
            }
            *slot = s.value;
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> DomainObject2D {
        let domain = IntervalDomain::rect(0, 2, 0, 2).unwrap();
        let mut t = ValueTable2D::for_domain(&domain, GreyType::Int, GreyValue::Int(-1)).unwrap();
        for l in 0..=2 {
            for k in 0..=2 {
                t.set_f64(l, k, (l * 10 + k) as f64);
            }
        }
        DomainObject2D::new(domain, Some(t))
    }

    #[test]
    fn outside_reads_background() {
        let obj = ramp();
        let g = GreyLookup::new_2d(&obj).unwrap();
        assert_eq!(g.get(0, 1, 2), Sample { value: GreyValue::Int(12), background: false });
        assert_eq!(g.get(0, 3, 0), Sample { value: GreyValue::Int(-1), background: true });
    }

    #[test]
    fn connected_neighbourhood() {
        let obj = ramp();
        let g = GreyLookup::new_2d(&obj).unwrap();
        let n = g.get_con2(1, 1).unwrap();
        assert_eq!(
            n,
            [GreyValue::Int(11), GreyValue::Int(12), GreyValue::Int(21), GreyValue::Int(22)]
        );
        assert!(g.get_con2(2, 2).is_none());
    }

    #[test]
    fn lookup_needs_values() {
        let obj = DomainObject2D::new(IntervalDomain::rect(0, 0, 0, 0).unwrap(), None);
        assert!(matches!(GreyLookup::new_2d(&obj), Err(Error::ValuesNull)));
    }
}
