//! Coordinate-bucketed arena used to look up cells by position.
//!
//! Elements live in an append-only arena and are addressed by stable [`Handle`]s. A separate
//! map from bucket coordinates to handle lists serves radius-bounded queries, so relocating an
//! element only moves its handle between two bucket lists.

use crate::random::RandomSource;
use simulation_common::Point;
use std::collections::HashMap;
use thiserror::Error;

/// Stable address of an element stored in a [`SpatialHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SpatialHashError {
    #[error("bucket resolution must be finite and positive, got {0}")]
    InvalidResolution(f64),
    #[error("no element stored under key ({x}, {y})")]
    KeyNotFound { x: f64, y: f64 },
    #[error("unknown handle {0}")]
    UnknownHandle(usize),
}

type BucketKey = (i64, i64);

#[derive(Debug, Clone)]
struct Entry<T> {
    key: Point,
    bucket: BucketKey,
    value: T,
}

#[derive(Debug, Clone)]
pub struct SpatialHash<T> {
    resolution: f64,
    inv_resolution: f64,
    entries: Vec<Entry<T>>,
    buckets: HashMap<BucketKey, Vec<Handle>>,
}

impl<T> SpatialHash<T> {
    /// Creates an empty hash whose buckets are squares of side `resolution`.
    pub fn new(resolution: f64) -> Result<Self, SpatialHashError> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(SpatialHashError::InvalidResolution(resolution));
        }
        Ok(SpatialHash {
            resolution,
            inv_resolution: 1.0 / resolution,
            entries: Vec::new(),
            buckets: HashMap::new(),
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of occupied buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline(always)]
    fn bucket_of(&self, p: Point) -> BucketKey {
        // `as` saturates, so unbounded coordinates land in the outermost buckets
        (
            (p.x * self.inv_resolution).floor() as i64,
            (p.y * self.inv_resolution).floor() as i64,
        )
    }

    /// Stores `value` under `key`. Keys need not be unique.
    pub fn insert(&mut self, key: Point, value: T) -> Handle {
        let handle = Handle(self.entries.len());
        let bucket = self.bucket_of(key);
        self.entries.push(Entry { key, bucket, value });
        self.buckets.entry(bucket).or_default().push(handle);
        handle
    }

    /// Moves the element stored under exactly `old_key` to `new_key`.
    pub fn update(&mut self, old_key: Point, new_key: Point) -> Result<Handle, SpatialHashError> {
        let bucket = self.bucket_of(old_key);
        let handle = self
            .buckets
            .get(&bucket)
            .and_then(|handles| handles.iter().copied().find(|h| self.entries[h.0].key == old_key))
            .ok_or(SpatialHashError::KeyNotFound { x: old_key.x, y: old_key.y })?;
        self.relocate(handle, new_key)?;
        Ok(handle)
    }

    /// Moves the element addressed by `handle` to `new_key`.
    pub fn relocate(&mut self, handle: Handle, new_key: Point) -> Result<(), SpatialHashError> {
        let new_bucket = self.bucket_of(new_key);
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or(SpatialHashError::UnknownHandle(handle.0))?;
        let old_bucket = entry.bucket;
        entry.key = new_key;
        entry.bucket = new_bucket;
        if old_bucket == new_bucket {
            return Ok(());
        }

        if let Some(handles) = self.buckets.get_mut(&old_bucket) {
            if let Some(pos) = handles.iter().position(|h| *h == handle) {
                handles.swap_remove(pos);
            }
            if handles.is_empty() {
                self.buckets.remove(&old_bucket);
            }
        }
        self.buckets.entry(new_bucket).or_default().push(handle);
        Ok(())
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(handle.0).map(|e| &e.value)
    }

    /// Mutable access to a value. Changing the value never moves its key; use `relocate`.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries.get_mut(handle.0).map(|e| &mut e.value)
    }

    pub fn key(&self, handle: Handle) -> Option<Point> {
        self.entries.get(handle.0).map(|e| e.key)
    }

    /// Full traversal in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.entries.iter().enumerate().map(|(i, e)| (Handle(i), &e.value))
    }

    /// Full traversal with in-place mutation of the values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> + '_ {
        self.entries.iter_mut().enumerate().map(|(i, e)| (Handle(i), &mut e.value))
    }

    /// Handles of every element stored right now. Use this when the traversal itself
    /// inserts or relocates: later insertions are not visited and nothing is visited twice.
    pub fn handles(&self) -> Vec<Handle> {
        (0..self.entries.len()).map(Handle).collect()
    }

    /// Elements whose buckets intersect the disk of `radius` around `center`.
    /// Over-approximates: callers apply the exact distance filter.
    pub fn neighborhood(&self, center: Point, radius: f64) -> Neighborhood<'_, T> {
        let radius = radius.max(0.0);
        let lo = self.bucket_of(Point::new(center.x - radius, center.y - radius));
        let hi = self.bucket_of(Point::new(center.x + radius, center.y + radius));
        let span = (i128::from(hi.0) - i128::from(lo.0) + 1)
            .saturating_mul(i128::from(hi.1) - i128::from(lo.1) + 1);

        let in_range = |b: &BucketKey| b.0 >= lo.0 && b.0 <= hi.0 && b.1 >= lo.1 && b.1 <= hi.1;
        let keys: Vec<BucketKey> = if span <= self.buckets.len() as i128 {
            let mut keys = Vec::with_capacity(span as usize);
            for bx in lo.0..=hi.0 {
                for by in lo.1..=hi.1 {
                    let b = (bx, by);
                    if self.buckets.contains_key(&b) && self.bucket_intersects(b, center, radius) {
                        keys.push(b);
                    }
                }
            }
            keys
        } else {
            // Query rectangle is larger than the occupied area: scan occupied buckets instead
            self.buckets
                .keys()
                .filter(|b| in_range(b) && self.bucket_intersects(**b, center, radius))
                .copied()
                .collect()
        };

        Neighborhood { hash: self, buckets: keys.into_iter(), current: Default::default() }
    }

    fn bucket_intersects(&self, bucket: BucketKey, center: Point, radius: f64) -> bool {
        let x0 = bucket.0 as f64 * self.resolution;
        let y0 = bucket.1 as f64 * self.resolution;
        let nearest_x = center.x.max(x0).min(x0 + self.resolution);
        let nearest_y = center.y.max(y0).min(y0 + self.resolution);
        center.distance_squared(Point::new(nearest_x, nearest_y)) <= radius * radius
    }

    /// Picks one element uniformly at random in constant time.
    pub fn pick_random<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<Handle> {
        if self.entries.is_empty() {
            return None;
        }
        let n = self.entries.len();
        let idx = ((rng.unit() * n as f64) as usize).min(n - 1);
        Some(Handle(idx))
    }

    /// Checks that every element sits in the bucket of its key and that the bucket
    /// lists hold exactly the stored elements.
    pub fn is_consistent(&self) -> bool {
        let listed: usize = self.buckets.values().map(Vec::len).sum();
        listed == self.entries.len()
            && self.entries.iter().enumerate().all(|(i, e)| {
                e.bucket == self.bucket_of(e.key)
                    && self.buckets.get(&e.bucket).is_some_and(|hs| hs.contains(&Handle(i)))
            })
    }
}

/// Lazy iterator returned by [`SpatialHash::neighborhood`].
pub struct Neighborhood<'a, T> {
    hash: &'a SpatialHash<T>,
    buckets: std::vec::IntoIter<BucketKey>,
    current: std::slice::Iter<'a, Handle>,
}

impl<'a, T> Iterator for Neighborhood<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(handle) = self.current.next() {
                return Some((*handle, &self.hash.entries[handle.0].value));
            }
            let bucket = self.buckets.next()?;
            if let Some(handles) = self.hash.buckets.get(&bucket) {
                self.current = handles.iter();
            }
        }
    }
}
