//! Hex grid coordinates and plane conversion.
//!
//! Cells are addressed with axial coordinates `(q, r)`; the third cube
//! coordinate `s = -q - r` is implicit. Layout is flat-top: `q` runs along
//! the x axis in steps of `1.5 × size`.
//!
//! ```
//! use hexskill_logic::hex::{AxialCoord, HexLayout};
//!
//! let layout = HexLayout::new(30.0);
//! let (x, y) = layout.to_plane(AxialCoord::new(2, -1));
//! assert!((x - 90.0).abs() < 1e-4 && y.abs() < 1e-4);
//! assert_eq!(layout.to_hex(x, y), AxialCoord::new(2, -1));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

const SQRT_3: f32 = 1.732_050_8;

/// The six unit directions, in a fixed order. Index `i` and `(i + 3) % 6`
/// are opposite.
pub const DIRECTIONS: [AxialCoord; 6] = [
    AxialCoord { q: 1, r: 0 },
    AxialCoord { q: 1, r: -1 },
    AxialCoord { q: 0, r: -1 },
    AxialCoord { q: -1, r: 0 },
    AxialCoord { q: -1, r: 1 },
    AxialCoord { q: 0, r: 1 },
];

/// One cell of an infinite hex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AxialCoord {
    pub q: i32,
    pub r: i32,
}

impl AxialCoord {
    pub const ORIGIN: AxialCoord = AxialCoord { q: 0, r: 0 };

    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Implicit third cube coordinate.
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }
}

impl Add for AxialCoord {
    type Output = AxialCoord;

    fn add(self, rhs: AxialCoord) -> AxialCoord {
        AxialCoord::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for AxialCoord {
    type Output = AxialCoord;

    fn sub(self, rhs: AxialCoord) -> AxialCoord {
        AxialCoord::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl Mul<i32> for AxialCoord {
    type Output = AxialCoord;

    fn mul(self, k: i32) -> AxialCoord {
        AxialCoord::new(self.q * k, self.r * k)
    }
}

/// Converts between hex cells and plane positions for a fixed cell size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    /// Cell radius, center to corner.
    pub size: f32,
}

impl Default for HexLayout {
    fn default() -> Self {
        Self::new(crate::constants::layout::HEX_SIZE)
    }
}

impl HexLayout {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    /// Center of `hex` on the plane.
    pub fn to_plane(&self, hex: AxialCoord) -> (f32, f32) {
        let q = hex.q as f32;
        let r = hex.r as f32;
        let x = self.size * 1.5 * q;
        let y = self.size * (SQRT_3 / 2.0 * q + SQRT_3 * r);
        (x, y)
    }

    /// Cell containing the plane point `(x, y)`.
    pub fn to_hex(&self, x: f32, y: f32) -> AxialCoord {
        let fq = (2.0 / 3.0 * x) / self.size;
        let fr = (-1.0 / 3.0 * x + SQRT_3 / 3.0 * y) / self.size;
        cube_round(fq, fr)
    }

    /// The six corners of `hex`, starting at angle 0 and going
    /// counter-clockwise in math orientation.
    pub fn corners(&self, hex: AxialCoord) -> [(f32, f32); 6] {
        let (cx, cy) = self.to_plane(hex);
        let mut out = [(0.0, 0.0); 6];
        for (i, corner) in out.iter_mut().enumerate() {
            let angle = (60.0 * i as f32).to_radians();
            *corner = (cx + self.size * angle.cos(), cy + self.size * angle.sin());
        }
        out
    }

    /// Radius of the circle inscribed in a cell.
    pub fn inner_radius(&self) -> f32 {
        self.size * SQRT_3 / 2.0
    }
}

/// Round fractional axial coordinates to the nearest cell.
///
/// The cube coordinate with the strictly largest rounding error is
/// rebuilt from the other two so that `q + r + s == 0` holds.
pub fn cube_round(fq: f32, fr: f32) -> AxialCoord {
    let fs = -fq - fr;
    let mut rq = fq.round();
    let mut rr = fr.round();
    let rs = fs.round();

    let dq = (rq - fq).abs();
    let dr = (rr - fr).abs();
    let ds = (rs - fs).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    // Otherwise s absorbs the error; q and r stand.

    AxialCoord::new(rq as i32, rr as i32)
}

/// Neighbor of `hex` in direction `i` (taken modulo 6).
pub fn neighbor(hex: AxialCoord, i: usize) -> AxialCoord {
    hex + DIRECTIONS[i % 6]
}

/// All six neighbors in direction order.
pub fn neighbors(hex: AxialCoord) -> [AxialCoord; 6] {
    DIRECTIONS.map(|d| hex + d)
}

/// Grid distance in cell steps.
pub fn distance(a: AxialCoord, b: AxialCoord) -> i32 {
    let d = a - b;
    (d.q.abs() + (d.q + d.r).abs() + d.r.abs()) / 2
}

/// Cells at exactly `radius` steps from `center`, walked in direction
/// order. Radius 0 yields the center alone.
pub fn ring(center: AxialCoord, radius: u32) -> Vec<AxialCoord> {
    if radius == 0 {
        return vec![center];
    }
    let mut cells = Vec::with_capacity(6 * radius as usize);
    let mut hex = center + DIRECTIONS[4] * radius as i32;
    for side in 0..6 {
        for _ in 0..radius {
            cells.push(hex);
            hex = neighbor(hex, side);
        }
    }
    cells
}
