// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Snaps each axis to the nearest multiple of `step`.
    ///
    /// A non-positive `step` returns the point unchanged.
    pub fn rounded(self, step: f64) -> Self {
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        let snap = |v: f64| {
            let snapped = (v / step).round() * step;
            // Collapse float noise such as 1.2000000000000002 to the decimal the step implies.
            let decimals = (-step.log10()).ceil().max(0.0) as i32;
            let scale = 10f64.powi(decimals);
            (snapped * scale).round() / scale
        };
        Self::new(snap(self.x), snap(self.y), snap(self.z))
    }

    pub fn axis(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set_axis(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Placement of a rendered object. Rotation is stored as Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Vec3;

    #[test]
    fn rounding_snaps_to_one_decimal() {
        let p = Vec3::new(1.04, 2.06, -0.349).rounded(0.1);
        assert_eq!(p, Vec3::new(1.0, 2.1, -0.3));
    }

    #[test]
    fn rounding_removes_float_noise() {
        let p = Vec3::new(1.15000001, 0.3, 0.7).rounded(0.1);
        assert_eq!(p.x, 1.2);
        assert_eq!(p.y, 0.3);
        assert_eq!(p.z, 0.7);
    }

    #[test]
    fn rounding_with_zero_step_is_identity() {
        let p = Vec3::new(1.2345, 0.0, 9.87);
        assert_eq!(p.rounded(0.0), p);
    }
}
