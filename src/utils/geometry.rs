// src/utils/geometry.rs

use crate::model::cell::Cell;
use nalgebra::Vector3;

type Point3 = [f64; 3];

/// Squared minimum-image separation between `a` and `b` (Å²).
///
/// The correction `d -= round(d / L) * L` is only applied on periodic axes.
#[inline]
pub fn separation2(a: Point3, b: Point3, cell: &Cell) -> f64 {
    let mut r2 = 0.0;
    for axis in 0..3 {
        let d = min_image(a[axis] - b[axis], axis, cell);
        r2 += d * d;
    }
    r2
}

/// Minimum-image separation in Angstroms.
pub fn separation(a: Point3, b: Point3, cell: &Cell) -> f64 {
    separation2(a, b, cell).sqrt()
}

/// Signed minimum-image vector pointing from `a` to `b`.
pub fn separation_vector(a: Point3, b: Point3, cell: &Cell) -> Vector3<f64> {
    Vector3::new(
        min_image(b[0] - a[0], 0, cell),
        min_image(b[1] - a[1], 1, cell),
        min_image(b[2] - a[2], 2, cell),
    )
}

/// Same as [`separation2`], also reporting per axis whether the periodic
/// correction changed the raw delta, i.e. whether the shortest path between
/// the two points crosses a cell boundary.
pub fn separation2_pbc_check(a: Point3, b: Point3, cell: &Cell) -> (f64, [bool; 3]) {
    let mut r2 = 0.0;
    let mut crossed = [false; 3];
    for axis in 0..3 {
        let raw = a[axis] - b[axis];
        let d = min_image(raw, axis, cell);
        crossed[axis] = d != raw;
        r2 += d * d;
    }
    (r2, crossed)
}

#[inline]
fn min_image(d: f64, axis: usize, cell: &Cell) -> f64 {
    if cell.pbc[axis] {
        let l = cell.dims[axis];
        d - (d / l).round() * l
    } else {
        d
    }
}

/// Point `index` of a flat `[x0, y0, z0, x1, ...]` position array.
#[inline]
pub fn point_at(pos: &[f64], index: usize) -> Point3 {
    let i3 = 3 * index;
    [pos[i3], pos[i3 + 1], pos[i3 + 2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn periodic_cell() -> Cell {
        Cell::cubic(10.0).unwrap()
    }

    #[test]
    fn test_short_way_round() {
        let cell = periodic_cell();
        let d = separation([0.0, 0.0, 0.0], [0.5, 0.0, 0.0], &cell);
        assert!((d - 0.5).abs() < 1e-12);

        // 9.5 apart raw, 0.5 across the boundary
        let d = separation([0.0, 0.0, 0.0], [9.5, 0.0, 0.0], &cell);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_free_axis_is_not_wrapped() {
        let cell = Cell::new([10.0; 3], [false, true, true]).unwrap();
        let d = separation([0.0, 0.0, 0.0], [9.5, 0.0, 0.0], &cell);
        assert!((d - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_vector_direction() {
        let cell = periodic_cell();
        let v = separation_vector([9.8, 1.0, 1.0], [0.2, 1.0, 2.0], &cell);
        assert!((v.x - 0.4).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
        assert!((v.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pbc_check_flags() {
        let cell = periodic_cell();
        let (r2, crossed) = separation2_pbc_check([9.8, 1.0, 1.0], [0.2, 1.5, 1.0], &cell);
        assert!((r2 - (0.16 + 0.25)).abs() < 1e-9);
        assert_eq!(crossed, [true, false, false]);

        let (_, crossed) = separation2_pbc_check([1.0, 1.0, 1.0], [2.0, 2.0, 2.0], &cell);
        assert_eq!(crossed, [false, false, false]);
    }

    #[test]
    fn test_point_at() {
        let pos = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(point_at(&pos, 1), [3.0, 4.0, 5.0]);
    }

    proptest! {
        #[test]
        fn separation_is_symmetric(
            ax in 0.0f64..10.0, ay in 0.0f64..10.0, az in 0.0f64..10.0,
            bx in 0.0f64..10.0, by in 0.0f64..10.0, bz in 0.0f64..10.0,
            px: bool, py: bool, pz: bool,
        ) {
            let cell = Cell::new([10.0, 7.0, 5.0], [px, py, pz]).unwrap();
            let a = [ax, ay * 0.7, az * 0.5];
            let b = [bx, by * 0.7, bz * 0.5];
            prop_assert_eq!(separation2(a, b, &cell), separation2(b, a, &cell));
        }

        #[test]
        fn min_image_component_within_half_extent(
            ax in -20.0f64..20.0, bx in -20.0f64..20.0,
            ay in -20.0f64..20.0, by in -20.0f64..20.0,
        ) {
            let cell = Cell::new([10.0, 6.0, 4.0], [true, true, true]).unwrap();
            let v = separation_vector([ax, ay, 0.0], [bx, by, 0.0], &cell);
            prop_assert!(v.x.abs() <= 5.0 + 1e-9);
            prop_assert!(v.y.abs() <= 3.0 + 1e-9);
        }
    }
}
