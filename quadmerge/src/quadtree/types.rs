//! Quadtree address types.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Deepest pyramid the addressing supports.
///
/// A depth-24 grid is already 16M tiles per side; anything beyond is not a
/// tile pyramid a raster engine could stitch.
pub const MAX_DEPTH: u32 = 24;

/// One level of a quadtree address: the quadrant of the parent tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuadDigit {
    /// Top-left quadrant.
    TopLeft = 0,
    /// Top-right quadrant.
    TopRight = 1,
    /// Bottom-left quadrant.
    BottomLeft = 2,
    /// Bottom-right quadrant.
    BottomRight = 3,
}

impl QuadDigit {
    /// Build a digit from one row bit and one column bit.
    #[inline]
    pub fn from_bits(row_bit: u8, col_bit: u8) -> Self {
        match (row_bit & 1, col_bit & 1) {
            (0, 0) => QuadDigit::TopLeft,
            (0, _) => QuadDigit::TopRight,
            (_, 0) => QuadDigit::BottomLeft,
            _ => QuadDigit::BottomRight,
        }
    }

    /// Parse the single-character directory or file stem naming this digit.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(QuadDigit::TopLeft),
            '1' => Some(QuadDigit::TopRight),
            '2' => Some(QuadDigit::BottomLeft),
            '3' => Some(QuadDigit::BottomRight),
            _ => None,
        }
    }

    #[inline]
    pub fn row_bit(self) -> u8 {
        (self as u8) >> 1
    }

    #[inline]
    pub fn col_bit(self) -> u8 {
        (self as u8) & 1
    }

    #[inline]
    pub fn as_char(self) -> char {
        (b'0' + self as u8) as char
    }
}

/// Errors from parsing a quadtree address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuadPathError {
    /// A component is not one of `0`, `1`, `2`, `3`.
    #[error("Invalid quadtree digit '{0}' (must be 0-3)")]
    InvalidDigit(String),

    /// The address is deeper than [`MAX_DEPTH`].
    #[error("Quadtree address too deep: {} levels (max {})", .0, MAX_DEPTH)]
    TooDeep(usize),
}

/// A full quadtree address, shallowest level first.
///
/// The empty address is the pyramid root (depth 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadPath {
    digits: Vec<QuadDigit>,
}

impl QuadPath {
    pub fn from_digits(digits: Vec<QuadDigit>) -> Self {
        Self { digits }
    }

    pub fn digits(&self) -> &[QuadDigit] {
        &self.digits
    }

    /// Number of levels in this address.
    pub fn depth(&self) -> u32 {
        self.digits.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Read the address of a tile file from its path relative to the pyramid root.
    ///
    /// `0/3/1.png` becomes `031`. Returns `None` when a component is not a
    /// single quadtree digit or the file does not carry `extension`.
    pub fn from_relative_path(relative: &Path, extension: &str) -> Option<Self> {
        let components: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        let (file, dirs) = components.split_last()?;
        let stem = file
            .strip_suffix(extension)
            .and_then(|rest| rest.strip_suffix('.'))?;

        let mut digits = Vec::with_capacity(components.len());
        for name in dirs.iter().copied().chain(std::iter::once(stem)) {
            digits.push(single_digit(name)?);
        }

        if digits.len() > MAX_DEPTH as usize {
            return None;
        }

        Some(Self { digits })
    }

    /// Path of the tile file for this address below `root`.
    ///
    /// The last digit names the file, the others name directories. The empty
    /// address resolves to `root` itself.
    pub fn to_tile_path(&self, root: &Path, extension: &str) -> PathBuf {
        let Some((last, dirs)) = self.digits.split_last() else {
            return root.to_path_buf();
        };

        let mut path = root.to_path_buf();
        for digit in dirs {
            path.push(digit.as_char().to_string());
        }
        path.push(format!("{}.{}", last.as_char(), extension));
        path
    }
}

fn single_digit(name: &str) -> Option<QuadDigit> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => QuadDigit::from_char(c),
        _ => None,
    }
}

impl fmt::Display for QuadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.digits {
            write!(f, "{}", digit.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for QuadPath {
    type Err = QuadPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_DEPTH as usize {
            return Err(QuadPathError::TooDeep(s.len()));
        }

        let digits = s
            .chars()
            .map(|c| {
                QuadDigit::from_char(c).ok_or_else(|| QuadPathError::InvalidDigit(c.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { digits })
    }
}
