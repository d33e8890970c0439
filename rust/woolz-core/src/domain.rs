// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run-length interval domains in 2D and 3D.
//!
//! An [`IntervalDomain`] stores, for every line in its bounding box, the
//! columns it covers as disjoint, increasing, inclusive intervals in
//! absolute column coordinates. A [`PlaneDomain`] stacks optional interval
//! domains over a range of planes.
//!
//! An empty domain has no lines; its `lastln` is `line1 - 1`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive run of columns on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub left: i32,
    pub right: i32,
}

impl Interval {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Number of columns covered.
    #[inline]
    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64 + 1
    }

    #[inline]
    pub fn contains(&self, kol: i32) -> bool {
        kol >= self.left && kol <= self.right
    }
}

/// One line of bits over a column range, used to union runs.
#[derive(Debug, Clone)]
pub struct LineMask {
    kol1: i32,
    bits: Vec<bool>,
}

impl LineMask {
    /// Creates a cleared mask over `kol1..=lastkl`.
    pub fn new(kol1: i32, lastkl: i32) -> Self {
        let width = (lastkl as i64 - kol1 as i64 + 1).max(0) as usize;
        Self {
            kol1,
            bits: vec![false; width],
        }
    }

    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = false);
    }

    /// Sets every column in `left..=right`, clipped to the mask.
    pub fn set_run(&mut self, left: i32, right: i32) {
        let lo = (left as i64 - self.kol1 as i64).max(0);
        let hi = (right as i64 - self.kol1 as i64).min(self.bits.len() as i64 - 1);
        if lo > hi {
            return;
        }
        self.bits[lo as usize..=hi as usize]
            .iter_mut()
            .for_each(|b| *b = true);
    }

    pub fn set(&mut self, kol: i32) {
        self.set_run(kol, kol);
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Maximal runs of set columns in increasing order.
    pub fn runs(&self) -> Vec<Interval> {
        let mut out = Vec::new();
        let mut start: Option<usize> = None;
        for (i, &b) in self.bits.iter().enumerate() {
            match (b, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    out.push(self.interval(s, i - 1));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push(self.interval(s, self.bits.len() - 1));
        }
        out
    }

    fn interval(&self, lo: usize, hi: usize) -> Interval {
        Interval::new(self.kol1 + lo as i32, self.kol1 + hi as i32)
    }
}

/// A 2D domain: per-line interval lists over a bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalDomain {
    line1: i32,
    lastln: i32,
    kol1: i32,
    lastkl: i32,
    lines: Vec<Vec<Interval>>,
}

impl IntervalDomain {
    /// Creates a domain with the given bounds and no intervals.
    pub fn new(line1: i32, lastln: i32, kol1: i32, lastkl: i32) -> Result<Self> {
        if lastln < line1 || lastkl < kol1 {
            return Err(Error::DomainData(format!(
                "bounds lines {}..={} columns {}..={} are empty",
                line1, lastln, kol1, lastkl
            )));
        }
        Ok(Self {
            line1,
            lastln,
            kol1,
            lastkl,
            lines: vec![Vec::new(); (lastln - line1 + 1) as usize],
        })
    }

    /// A domain with no pixels.
    pub fn empty() -> Self {
        Self {
            line1: 0,
            lastln: -1,
            kol1: 0,
            lastkl: -1,
            lines: Vec::new(),
        }
    }

    /// A fully covered rectangle.
    pub fn rect(line1: i32, lastln: i32, kol1: i32, lastkl: i32) -> Result<Self> {
        let mut d = Self::new(line1, lastln, kol1, lastkl)?;
        for l in d.lines.iter_mut() {
            l.push(Interval::new(kol1, lastkl));
        }
        Ok(d)
    }

    #[inline]
    pub fn line1(&self) -> i32 {
        self.line1
    }

    #[inline]
    pub fn lastln(&self) -> i32 {
        self.lastln
    }

    #[inline]
    pub fn kol1(&self) -> i32 {
        self.kol1
    }

    #[inline]
    pub fn lastkl(&self) -> i32 {
        self.lastkl
    }

    /// Columns in the bounding box.
    pub fn width(&self) -> usize {
        (self.lastkl as i64 - self.kol1 as i64 + 1).max(0) as usize
    }

    /// Lines in the bounding box.
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }

    /// Appends an interval to a line.
    ///
    /// Intervals on a line must arrive left to right without overlap; an
    /// interval touching the previous one extends it.
    pub fn push_interval(&mut self, line: i32, left: i32, right: i32) -> Result<()> {
        if line < self.line1
            || line > self.lastln
            || left > right
            || left < self.kol1
            || right > self.lastkl
        {
            return Err(Error::DomainData(format!(
                "interval {}..={} on line {} is outside the domain bounds",
                left, right, line
            )));
        }
        let runs = &mut self.lines[(line - self.line1) as usize];
        match runs.last_mut() {
            Some(prev) if left <= prev.right => Err(Error::DomainData(format!(
                "interval {}..={} on line {} is out of order",
                left, right, line
            ))),
            Some(prev) if left == prev.right + 1 => {
                prev.right = right;
                Ok(())
            }
            _ => {
                runs.push(Interval::new(left, right));
                Ok(())
            }
        }
    }

    /// Appends the runs of `mask` to a line.
    pub fn push_mask(&mut self, line: i32, mask: &LineMask) -> Result<()> {
        for run in mask.runs() {
            self.push_interval(line, run.left, run.right)?;
        }
        Ok(())
    }

    /// Intervals on `line`, empty outside the bounds.
    pub fn line(&self, line: i32) -> &[Interval] {
        if line < self.line1 || line > self.lastln {
            return &[];
        }
        &self.lines[(line - self.line1) as usize]
    }

    /// Lines with their intervals in raster order.
    pub fn lines(&self) -> impl Iterator<Item = (i32, &[Interval])> {
        let line1 = self.line1;
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, l)| (line1 + i as i32, l.as_slice()))
    }

    /// Every interval in raster order, with its line.
    pub fn intervals(&self) -> impl Iterator<Item = (i32, Interval)> + '_ {
        self.lines().flat_map(|(l, runs)| runs.iter().map(move |&iv| (l, iv)))
    }

    /// Trims the bounding box to the covered pixels.
    pub fn standardize(&mut self) {
        let first = self.lines.iter().position(|l| !l.is_empty());
        let last = self.lines.iter().rposition(|l| !l.is_empty());
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                *self = Self::empty();
                return;
            }
        };
        self.lines.truncate(last + 1);
        self.lines.drain(..first);
        self.line1 += first as i32;
        self.lastln = self.line1 + self.lines.len() as i32 - 1;
        self.kol1 = self
            .lines
            .iter()
            .filter_map(|l| l.first().map(|iv| iv.left))
            .min()
            .unwrap_or(self.kol1);
        self.lastkl = self
            .lines
            .iter()
            .filter_map(|l| l.last().map(|iv| iv.right))
            .max()
            .unwrap_or(self.lastkl);
    }

    pub fn is_inside(&self, line: i32, kol: i32) -> bool {
        let runs = self.line(line);
        let i = runs.partition_point(|iv| iv.right < kol);
        runs.get(i).is_some_and(|iv| iv.left <= kol)
    }

    /// Number of covered pixels.
    pub fn area(&self) -> i64 {
        self.intervals().map(|(_, iv)| iv.width()).sum()
    }

    /// Nearest-neighbour scaling by `s` about the origin.
    ///
    /// Output pixel `o` is covered when `floor((o + 0.5) / s)` is covered.
    pub fn scaled(&self, s: f64) -> Result<Self> {
        if !s.is_finite() || s == 0.0 {
            return Err(Error::ParamData(format!("scale factor {} is degenerate", s)));
        }
        if self.is_empty() {
            return Ok(Self::empty());
        }
        let (l0, l1) = scaled_range(self.line1, self.lastln, s);
        let (k0, k1) = scaled_range(self.kol1, self.lastkl, s);
        let mut out = Self::new(l0, l1, k0, k1)?;
        let mut mask = LineMask::new(k0, k1);
        for ol in l0..=l1 {
            let sl = back_map(ol, s);
            let src = self.line(sl);
            if src.is_empty() {
                continue;
            }
            mask.clear();
            for ok in k0..=k1 {
                if self.is_inside(sl, back_map(ok, s)) {
                    mask.set(ok);
                }
            }
            out.push_mask(ol, &mask)?;
        }
        out.standardize();
        Ok(out)
    }
}

fn scaled_range(lo: i32, hi: i32, s: f64) -> (i32, i32) {
    let a = lo as f64 * s;
    let b = (hi as f64 + 1.0) * s;
    let first = a.min(b).floor() as i32;
    let last = (a.max(b).ceil() as i32 - 1).max(first);
    (first, last)
}

#[inline]
fn back_map(o: i32, s: f64) -> i32 {
    ((o as f64 + 0.5) / s).floor() as i32
}

/// A 3D domain: optional interval domains over a range of planes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneDomain {
    plane1: i32,
    lastpl: i32,
    line1: i32,
    lastln: i32,
    kol1: i32,
    lastkl: i32,
    planes: Vec<Option<IntervalDomain>>,
    pub voxel_size: [f64; 3],
}

impl PlaneDomain {
    /// Creates a plane domain with no planes filled in.
    pub fn new(
        plane1: i32,
        lastpl: i32,
        line1: i32,
        lastln: i32,
        kol1: i32,
        lastkl: i32,
    ) -> Result<Self> {
        if lastpl < plane1 || lastln < line1 || lastkl < kol1 {
            return Err(Error::DomainData(format!(
                "bounds planes {}..={} lines {}..={} columns {}..={} are empty",
                plane1, lastpl, line1, lastln, kol1, lastkl
            )));
        }
        Ok(Self {
            plane1,
            lastpl,
            line1,
            lastln,
            kol1,
            lastkl,
            planes: vec![None; (lastpl - plane1 + 1) as usize],
            voxel_size: [1.0; 3],
        })
    }

    /// A domain with no voxels.
    pub fn empty() -> Self {
        Self {
            plane1: 0,
            lastpl: -1,
            line1: 0,
            lastln: -1,
            kol1: 0,
            lastkl: -1,
            planes: Vec::new(),
            voxel_size: [1.0; 3],
        }
    }

    /// A fully covered box.
    pub fn cuboid(
        plane1: i32,
        lastpl: i32,
        line1: i32,
        lastln: i32,
        kol1: i32,
        lastkl: i32,
    ) -> Result<Self> {
        let mut d = Self::new(plane1, lastpl, line1, lastln, kol1, lastkl)?;
        let rect = IntervalDomain::rect(line1, lastln, kol1, lastkl)?;
        for p in d.planes.iter_mut() {
            *p = Some(rect.clone());
        }
        Ok(d)
    }

    #[inline]
    pub fn plane1(&self) -> i32 {
        self.plane1
    }

    #[inline]
    pub fn lastpl(&self) -> i32 {
        self.lastpl
    }

    #[inline]
    pub fn line1(&self) -> i32 {
        self.line1
    }

    #[inline]
    pub fn lastln(&self) -> i32 {
        self.lastln
    }

    #[inline]
    pub fn kol1(&self) -> i32 {
        self.kol1
    }

    #[inline]
    pub fn lastkl(&self) -> i32 {
        self.lastkl
    }

    pub fn is_empty(&self) -> bool {
        self.planes.iter().flatten().all(IntervalDomain::is_empty)
    }

    pub fn plane(&self, p: i32) -> Option<&IntervalDomain> {
        if p < self.plane1 || p > self.lastpl {
            return None;
        }
        self.planes[(p - self.plane1) as usize].as_ref()
    }

    /// Stores the domain of plane `p`, widening nothing.
    pub fn set_plane(&mut self, p: i32, dom: IntervalDomain) -> Result<()> {
        if p < self.plane1 || p > self.lastpl {
            return Err(Error::DomainData(format!(
                "plane {} is outside {}..={}",
                p, self.plane1, self.lastpl
            )));
        }
        if !dom.is_empty()
            && (dom.line1() < self.line1
                || dom.lastln() > self.lastln
                || dom.kol1() < self.kol1
                || dom.lastkl() > self.lastkl)
        {
            return Err(Error::DomainData(format!("plane {} domain exceeds the bounding box", p)));
        }
        self.planes[(p - self.plane1) as usize] = Some(dom);
        Ok(())
    }

    /// Non-empty planes in increasing order.
    pub fn planes(&self) -> impl Iterator<Item = (i32, &IntervalDomain)> {
        let plane1 = self.plane1;
        self.planes
            .iter()
            .enumerate()
            .filter_map(move |(i, d)| d.as_ref().map(|d| (plane1 + i as i32, d)))
            .filter(|(_, d)| !d.is_empty())
    }

    pub fn is_inside(&self, plane: i32, line: i32, kol: i32) -> bool {
        self.plane(plane).is_some_and(|d| d.is_inside(line, kol))
    }

    /// Number of covered voxels.
    pub fn volume(&self) -> i64 {
        self.planes().map(|(_, d)| d.area()).sum()
    }

    /// Standardizes every plane and trims the bounds to the covered voxels.
    pub fn standardize(&mut self) {
        for d in self.planes.iter_mut().flatten() {
            d.standardize();
        }
        for slot in self.planes.iter_mut() {
            if slot.as_ref().is_some_and(IntervalDomain::is_empty) {
                *slot = None;
            }
        }
        let first = self.planes.iter().position(Option::is_some);
        let last = self.planes.iter().rposition(Option::is_some);
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                let voxel_size = self.voxel_size;
                *self = Self::empty();
                self.voxel_size = voxel_size;
                return;
            }
        };
        self.planes.truncate(last + 1);
        self.planes.drain(..first);
        self.plane1 += first as i32;
        self.lastpl = self.plane1 + self.planes.len() as i32 - 1;
        let live = || self.planes.iter().flatten();
        let line1 = live().map(IntervalDomain::line1).min();
        let lastln = live().map(IntervalDomain::lastln).max();
        let kol1 = live().map(IntervalDomain::kol1).min();
        let lastkl = live().map(IntervalDomain::lastkl).max();
        if let (Some(l0), Some(l1), Some(k0), Some(k1)) = (line1, lastln, kol1, lastkl) {
            self.line1 = l0;
            self.lastln = l1;
            self.kol1 = k0;
            self.lastkl = k1;
        }
    }

    /// Nearest-neighbour scaling by `s` about the origin.
    pub fn scaled(&self, s: f64) -> Result<Self> {
        if !s.is_finite() || s == 0.0 {
            return Err(Error::ParamData(format!("scale factor {} is degenerate", s)));
        }
        if self.is_empty() {
            return Ok(Self::empty());
        }
        let (p0, p1) = scaled_range(self.plane1, self.lastpl, s);
        let (l0, l1) = scaled_range(self.line1, self.lastln, s);
        let (k0, k1) = scaled_range(self.kol1, self.lastkl, s);
        let mut out = Self::new(p0, p1, l0, l1, k0, k1)?;
        out.voxel_size = self.voxel_size;
        let mut cached: Option<(i32, IntervalDomain)> = None;
        for op in p0..=p1 {
            let sp = back_map(op, s);
            let Some(src) = self.plane(sp) else {
                continue;
            };
            let dom = match &cached {
                Some((p, d)) if *p == sp => d.clone(),
                _ => {
                    let d = src.scaled(s)?;
                    cached = Some((sp, d.clone()));
                    d
                }
            };
            if !dom.is_empty() {
                out.set_plane(op, dom)?;
            }
        }
        out.standardize();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_overlap_and_merges_touching() {
        let mut d = IntervalDomain::new(0, 2, 0, 9).unwrap();
        d.push_interval(1, 2, 3).unwrap();
        d.push_interval(1, 4, 5).unwrap();
        assert_eq!(d.line(1), &[Interval::new(2, 5)]);
        assert!(d.push_interval(1, 5, 6).is_err());
        assert!(d.push_interval(3, 0, 0).is_err());
        assert!(d.push_interval(0, 4, 3).is_err());
    }

    #[test]
    fn mask_unions_runs() {
        let mut m = LineMask::new(-2, 10);
        m.set_run(0, 3);
        m.set_run(2, 5);
        m.set_run(8, 20);
        assert_eq!(m.runs(), vec![Interval::new(0, 5), Interval::new(8, 10)]);
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    fn standardize_trims_bounds() {
        let mut d = IntervalDomain::new(-5, 5, -5, 5).unwrap();
        d.push_interval(-1, 0, 2).unwrap();
        d.push_interval(2, -3, -1).unwrap();
        d.standardize();
        assert_eq!((d.line1(), d.lastln(), d.kol1(), d.lastkl()), (-1, 2, -3, 2));
        assert_eq!(d.area(), 6);
        assert!(d.is_inside(2, -2));
        assert!(!d.is_inside(0, 0));

        let mut e = IntervalDomain::new(0, 3, 0, 3).unwrap();
        e.standardize();
        assert!(e.is_empty());
        assert_eq!(e.lastln(), e.line1() - 1);
    }

    #[test]
    fn scaling_a_rectangle() {
        let d = IntervalDomain::rect(0, 1, 0, 1).unwrap();
        let s = d.scaled(2.0).unwrap();
        assert_eq!((s.line1(), s.lastln(), s.kol1(), s.lastkl()), (0, 3, 0, 3));
        assert_eq!(s.area(), 16);
        let h = IntervalDomain::rect(0, 3, 0, 3).unwrap().scaled(0.5).unwrap();
        assert_eq!(h.area(), 4);
        assert!(d.scaled(0.0).is_err());
    }

    #[test]
    fn plane_domain_standardize_and_volume() {
        let mut p = PlaneDomain::new(0, 4, 0, 4, 0, 4).unwrap();
        p.set_plane(2, IntervalDomain::rect(1, 2, 1, 3).unwrap()).unwrap();
        p.set_plane(3, IntervalDomain::new(0, 4, 0, 4).unwrap()).unwrap();
        p.standardize();
        assert_eq!((p.plane1(), p.lastpl()), (2, 2));
        assert_eq!((p.line1(), p.lastln(), p.kol1(), p.lastkl()), (1, 2, 1, 3));
        assert_eq!(p.volume(), 6);
        assert!(p.is_inside(2, 2, 3));
        assert!(!p.is_inside(3, 2, 3));
    }
}
