//! Quadtree addressing.
//!
//! Converts between a flat grid cell `(row, col)` and the directory path that
//! holds its tile in a quadtree pyramid. Each level of the pyramid contributes
//! one digit, chosen from the quadrant the cell falls into:
//!
//! ```text
//!  +---+---+
//!  | 0 | 1 |      digit = col_bit + 2 * row_bit
//!  +---+---+
//!  | 2 | 3 |      most significant bit = shallowest directory
//!  +---+---+
//! ```
//!
//! Everything here is pure: no filesystem access, no state.

mod types;

pub use types::{QuadDigit, QuadPath, QuadPathError, MAX_DEPTH};

/// Number of tiles per side of the grid for a pyramid of `depth` levels.
#[inline]
pub fn grid_width(depth: u32) -> u32 {
    1u32 << depth
}

/// Resolve the directory path of the tile at `(row, col)`.
///
/// Row and column are read as `depth`-bit numbers, most significant bit
/// first, and interleaved into one digit per level.
///
/// # Panics
///
/// Debug builds assert that `row` and `col` lie inside the grid and that
/// `depth <= MAX_DEPTH`.
#[inline]
pub fn address(row: u32, col: u32, depth: u32) -> QuadPath {
    debug_assert!(depth <= MAX_DEPTH, "depth {} exceeds {}", depth, MAX_DEPTH);
    debug_assert!(row < grid_width(depth) && col < grid_width(depth));

    let digits = (0..depth)
        .rev()
        .map(|shift| {
            let row_bit = ((row >> shift) & 1) as u8;
            let col_bit = ((col >> shift) & 1) as u8;
            QuadDigit::from_bits(row_bit, col_bit)
        })
        .collect();

    QuadPath::from_digits(digits)
}

/// Recover `(row, col)` from a directory path.
///
/// The merge itself only performs forward lookups; this is the inverse used
/// to verify the mapping and to report where a located tile lands.
#[inline]
pub fn locate(path: &QuadPath) -> (u32, u32) {
    path.digits().iter().fold((0u32, 0u32), |(row, col), digit| {
        (
            (row << 1) | u32::from(digit.row_bit()),
            (col << 1) | u32::from(digit.col_bit()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_of(path: &QuadPath) -> String {
        path.to_string()
    }

    #[test]
    fn test_grid_width_is_power_of_two() {
        assert_eq!(grid_width(0), 1);
        assert_eq!(grid_width(1), 2);
        assert_eq!(grid_width(3), 8);
        assert_eq!(grid_width(10), 1024);
    }

    #[test]
    fn test_depth_zero_is_empty_path() {
        let path = address(0, 0, 0);
        assert!(path.is_empty());
        assert_eq!(path.depth(), 0);
        assert_eq!(locate(&path), (0, 0));
    }

    #[test]
    fn test_depth_one_quadrants() {
        assert_eq!(digits_of(&address(0, 0, 1)), "0");
        assert_eq!(digits_of(&address(0, 1, 1)), "1");
        assert_eq!(digits_of(&address(1, 0, 1)), "2");
        assert_eq!(digits_of(&address(1, 1, 1)), "3");
    }

    #[test]
    fn test_shallowest_level_decides_top_bit() {
        // Row 5 = 101, col 2 = 010 at depth 3
        // level 0: row 1, col 0 -> 2
        // level 1: row 0, col 1 -> 1
        // level 2: row 1, col 0 -> 2
        assert_eq!(digits_of(&address(5, 2, 3)), "212");
    }

    #[test]
    fn test_bottom_right_corner_is_all_threes() {
        let depth = 6;
        let last = grid_width(depth) - 1;
        assert_eq!(digits_of(&address(last, last, depth)), "333333");
    }

    #[test]
    fn test_locate_inverts_known_path() {
        let path: QuadPath = "212".parse().unwrap();
        assert_eq!(locate(&path), (5, 2));
    }

    #[test]
    fn test_every_cell_has_unique_path() {
        let depth = 4;
        let width = grid_width(depth);
        let mut seen = std::collections::HashSet::new();

        for row in 0..width {
            for col in 0..width {
                let path = address(row, col, depth);
                assert_eq!(path.depth(), depth);
                assert!(
                    seen.insert(path.clone()),
                    "Duplicate path {} for ({}, {})",
                    path,
                    row,
                    col
                );
            }
        }

        assert_eq!(seen.len(), (width * width) as usize);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_address_roundtrip(
                depth in 0u32..=16,
                row_raw in 0u32..65536,
                col_raw in 0u32..65536
            ) {
                let width = grid_width(depth);
                let row = row_raw % width;
                let col = col_raw % width;

                let path = address(row, col, depth);

                prop_assert_eq!(path.depth(), depth);
                prop_assert_eq!(locate(&path), (row, col));
            }

            #[test]
            fn test_distinct_cells_distinct_paths(
                depth in 1u32..=12,
                a_raw in (0u32..4096, 0u32..4096),
                b_raw in (0u32..4096, 0u32..4096)
            ) {
                let width = grid_width(depth);
                let a = (a_raw.0 % width, a_raw.1 % width);
                let b = (b_raw.0 % width, b_raw.1 % width);

                let path_a = address(a.0, a.1, depth);
                let path_b = address(b.0, b.1, depth);

                prop_assert_eq!(a == b, path_a == path_b);
            }

            #[test]
            fn test_digits_stay_in_alphabet(
                depth in 0u32..=16,
                row_raw in 0u32..65536,
                col_raw in 0u32..65536
            ) {
                let width = grid_width(depth);
                let path = address(row_raw % width, col_raw % width, depth);

                for c in path.to_string().chars() {
                    prop_assert!(('0'..='3').contains(&c), "digit {} out of range", c);
                }
            }

            #[test]
            fn test_parse_display_roundtrip(digits in "[0-3]{0,16}") {
                let path: QuadPath = digits.parse()?;
                prop_assert_eq!(path.to_string(), digits);
            }
        }
    }
}
