// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lazily solved per-element maps.
//!
//! Each element caches at most one map, valid for one direction. Asking for
//! the other direction replaces it.

use crate::affine::Solved;

/// Map direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Source positions to displaced positions.
    Forward,
    /// Displaced positions back to source positions.
    Reverse,
}

/// Cached map state of one element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CacheState<A> {
    #[default]
    Empty,
    Forward(A),
    Reverse(A),
}

impl<A: Copy> CacheState<A> {
    /// The cached map when it is valid for `dir`.
    #[inline]
    pub fn get(&self, dir: Direction) -> Option<A> {
        match (self, dir) {
            (CacheState::Forward(a), Direction::Forward)
            | (CacheState::Reverse(a), Direction::Reverse) => Some(*a),
            _ => None,
        }
    }

    #[inline]
    pub fn is_valid_for(&self, dir: Direction) -> bool {
        self.get(dir).is_some()
    }
}

/// Scan element: the cache for one mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanElement<A> {
    pub state: CacheState<A>,
    /// The last solve found the element squashed.
    pub squashed: bool,
}

impl<A: Copy> ScanElement<A> {
    /// Returns the map for `dir`, calling `solve` only when the cache is
    /// empty or holds the other direction.
    pub fn touch(&mut self, dir: Direction, solve: impl FnOnce(Direction) -> Solved<A>) -> A {
        if let Some(a) = self.state.get(dir) {
            return a;
        }
        let solved = solve(dir);
        self.squashed = solved.squashed;
        self.state = match dir {
            Direction::Forward => CacheState::Forward(solved.map),
            Direction::Reverse => CacheState::Reverse(solved.map),
        };
        solved.map
    }

    pub fn invalidate(&mut self) {
        self.state = CacheState::Empty;
        self.squashed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affine::{Affine2D, Affine3D};

    fn solver(
        calls: &mut u32,
        value: i32,
        squashed: bool,
    ) -> impl FnOnce(Direction) -> Solved<i32> + '_ {
        move |_| {
            *calls += 1;
            Solved { map: value, squashed }
        }
    }

    #[test]
    fn same_direction_is_cached() {
        let mut e: ScanElement<i32> = ScanElement::default();
        let mut calls = 0;
        assert_eq!(e.touch(Direction::Forward, solver(&mut calls, 1, false)), 1);
        assert_eq!(e.touch(Direction::Forward, solver(&mut calls, 2, false)), 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn direction_flip_recomputes() {
        let mut e: ScanElement<i32> = ScanElement::default();
        let mut calls = 0;
        e.touch(Direction::Forward, solver(&mut calls, 1, false));
        assert_eq!(e.touch(Direction::Reverse, solver(&mut calls, -1, true)), -1);
        assert!(e.squashed);
        assert!(!e.state.is_valid_for(Direction::Forward));
        assert_eq!(e.touch(Direction::Forward, solver(&mut calls, 1, false)), 1);
        assert_eq!(calls, 3);
        e.invalidate();
        assert_eq!(e.state, CacheState::Empty);
    }

    #[test]
    fn affine_elements_start_empty() {
        let e: ScanElement<Affine2D> = ScanElement::default();
        assert_eq!(e.state, CacheState::Empty);
        assert!(!e.squashed);
        let f: ScanElement<Affine3D> = ScanElement::default();
        assert_eq!(f.state.get(Direction::Reverse), None);
    }
}
