// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-line accumulator combining every sample that lands on a destination
//! pixel.

use smallvec::SmallVec;
use woolz_core::{GreyType, GreyValue, Result};

use crate::config::Overlap;

/// Column sums and counts for one destination interval.
///
/// RGBA values accumulate per channel; other types use one channel. In
/// majority mode each column tallies its distinct values instead.
#[derive(Debug, Clone)]
pub struct OverlapBuffer {
    grey: GreyType,
    background: GreyValue,
    channels: usize,
    overlap: Overlap,
    width: usize,
    sums: Vec<f64>,
    counts: Vec<u32>,
    votes: Vec<SmallVec<[(GreyValue, u32); 2]>>,
}

impl OverlapBuffer {
    /// Creates a buffer able to hold `capacity` columns without reallocating.
    pub fn new(grey: GreyType, background: GreyValue, capacity: usize) -> Result<Self> {
        let channels = grey.channels();
        let mut sums = Vec::new();
        sums.try_reserve_exact(capacity.saturating_mul(channels))?;
        let mut counts = Vec::new();
        counts.try_reserve_exact(capacity)?;
        Ok(Self {
            grey,
            background: background.convert(grey),
            channels,
            overlap: Overlap::Mean,
            width: 0,
            sums,
            counts,
            votes: Vec::new(),
        })
    }

    pub fn with_overlap(mut self, overlap: Overlap) -> Self {
        self.overlap = overlap;
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Zeroes the first `width` columns.
    pub fn clear(&mut self, width: usize) {
        self.width = width;
        self.sums.clear();
        self.sums.resize(width * self.channels, 0.0);
        self.counts.clear();
        self.counts.resize(width, 0);
        if self.overlap == Overlap::Majority {
            self.votes.clear();
            self.votes.resize(width, SmallVec::new());
        }
    }

    /// Adds a sample at column offset `col`; out of range offsets are ignored.
    pub fn add(&mut self, col: usize, value: GreyValue) {
        self.add_channels(col, value.channels());
    }

    /// Adds an already separated sample, one entry per channel.
    pub fn add_channels(&mut self, col: usize, ch: [f64; 4]) {
        if col >= self.width {
            return;
        }
        self.counts[col] += 1;
        match self.overlap {
            Overlap::Mean => {
                let base = col * self.channels;
                for (c, v) in ch.iter().take(self.channels).enumerate() {
                    self.sums[base + c] += v;
                }
            }
            Overlap::Majority => {
                let value = GreyValue::from_channels(self.grey, ch);
                let tally = &mut self.votes[col];
                match tally.iter_mut().find(|(v, _)| *v == value) {
                    Some((_, n)) => *n += 1,
                    None => tally.push((value, 1)),
                }
            }
        }
    }

    #[inline]
    pub fn count(&self, col: usize) -> u32 {
        self.counts.get(col).copied().unwrap_or(0)
    }

    /// The combined samples at `col`, or the background when none landed.
    ///
    /// Means of integer types round to nearest.
    pub fn flush(&self, col: usize) -> GreyValue {
        let n = self.count(col);
        if n == 0 {
            return self.background;
        }
        if self.overlap == Overlap::Majority {
            return self.votes[col]
                .iter()
                .max_by(|a, b| a.1.cmp(&b.1).then(a.0.to_f64().total_cmp(&b.0.to_f64())))
                .map_or(self.background, |&(v, _)| v);
        }
        let base = col * self.channels;
        let mut ch = [0.0; 4];
        for (c, slot) in ch.iter_mut().take(self.channels).enumerate() {
            *slot = self.sums[base + c] / n as f64;
        }
        GreyValue::from_channels(self.grey, ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use woolz_core::grey::rgba_pack;

    #[test]
    fn averages_and_rounds() {
        let mut b = OverlapBuffer::new(GreyType::UByte, GreyValue::UByte(9), 4).unwrap();
        b.clear(3);
        b.add(0, GreyValue::UByte(10));
        b.add(0, GreyValue::UByte(13));
        b.add(1, GreyValue::UByte(4));
        assert_eq!(b.flush(0), GreyValue::UByte(12));
        assert_eq!(b.flush(1), GreyValue::UByte(4));
        assert_eq!(b.flush(2), GreyValue::UByte(9));
        b.clear(3);
        assert_eq!(b.flush(0), GreyValue::UByte(9));
    }

    #[test]
    fn rgba_is_averaged_per_channel() {
        let mut b = OverlapBuffer::new(GreyType::Rgba, GreyValue::Rgba(0), 1).unwrap();
        b.clear(1);
        b.add(0, GreyValue::Rgba(rgba_pack(10, 0, 100, 255)));
        b.add(0, GreyValue::Rgba(rgba_pack(20, 50, 0, 255)));
        assert_eq!(b.flush(0), GreyValue::Rgba(rgba_pack(15, 25, 50, 255)));
    }

    #[test]
    fn majority_never_invents_a_value() {
        let mut b = OverlapBuffer::new(GreyType::Int, GreyValue::Int(0), 3)
            .unwrap()
            .with_overlap(Overlap::Majority);
        b.clear(3);
        for v in [1, 3, 1, 3, 1] {
            b.add(0, GreyValue::Int(v));
        }
        b.add(1, GreyValue::Int(1));
        b.add(1, GreyValue::Int(3));
        assert_eq!(b.flush(0), GreyValue::Int(1));
        assert_eq!(b.flush(1), GreyValue::Int(3));
        assert_eq!(b.flush(2), GreyValue::Int(0));
        b.clear(1);
        assert_eq!(b.count(0), 0);
        assert_eq!(b.flush(0), GreyValue::Int(0));
    }

    #[test]
    fn out_of_range_column_is_ignored() {
        let mut b = OverlapBuffer::new(GreyType::Double, GreyValue::Double(-1.0), 2).unwrap();
        b.clear(2);
        b.add(5, GreyValue::Double(3.0));
        assert_eq!(b.count(5), 0);
        assert_eq!(b.flush(1), GreyValue::Double(-1.0));
    }
}
