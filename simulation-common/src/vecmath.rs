use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::{Add, Mul, Sub};

/// A 2D coordinate in the continuous simulation plane.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new Point.
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// The origin (0, 0).
    pub const fn origin() -> Self {
        Point { x: 0.0, y: 0.0 }
    }

    /// Squared Euclidean distance to another point.
    #[inline(always)]
    pub fn distance_squared(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[inline(always)]
    pub fn distance(&self, other: Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Distance from the origin.
    #[inline(always)]
    pub fn norm(&self) -> f64 {
        self.distance(Point::origin())
    }

    /// Returns this point moved by `length` in the direction `angle_rad`.
    #[inline(always)]
    pub fn offset(&self, angle_rad: f64, length: f64) -> Point {
        *self + angle_to_vec(angle_rad) * length
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

/// Converts an angle (in radians) to a unit vector.
#[inline(always)]
pub fn angle_to_vec(angle_rad: f64) -> Point {
    Point::new(angle_rad.cos(), angle_rad.sin())
}

/// Wraps an angle into [0, 2π).
#[inline(always)]
pub fn wrap_angle(angle_rad: f64) -> f64 {
    let wrapped = angle_rad.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Clamps a value between a minimum and maximum.
#[inline(always)]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
