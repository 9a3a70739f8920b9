use std::fmt;

use super::Region;

/// Reason why a quadtree couldn't be built from an image.
///
/// All of these are caught before construction begins; the builder itself
/// never corrects a parameter on the caller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
	/// The error threshold is not a positive, finite number.
	InvalidThreshold(f64),
	/// The minimum block size is zero.
	InvalidMinBlockSize(u32),
	/// The image has a width or height of zero.
	EmptyImage,
	/// The target compression ratio lies outside `[0, 1]`.
	InvalidTargetRatio(f64),
}

impl fmt::Display for BuildError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BuildError::InvalidThreshold(t) =>
				write!(f, "threshold must be a positive number, got {}", t),
			BuildError::InvalidMinBlockSize(s) =>
				write!(f, "minimum block size must be at least 1, got {}", s),
			BuildError::EmptyImage => write!(f, "image has no pixels"),
			BuildError::InvalidTargetRatio(r) =>
				write!(f, "target compression ratio must be between 0 and 1, got {}", r),
		}
	}
}

impl std::error::Error for BuildError {}

/// Reason why a quadtree couldn't be rendered to an image buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawError {
	/// The buffer's dimensions differ from those the tree was built from.
	DimensionMismatch {
		/// Dimensions of the source image.
		expected: (u32, u32),
		/// Dimensions of the supplied buffer.
		actual: (u32, u32),
	},
	/// A tile size of zero was requested for tiled rendering.
	ZeroTileSize,
}

impl fmt::Display for DrawError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DrawError::DimensionMismatch { expected, actual } => write!(
				f,
				"output buffer is {}x{}, tree was built for {}x{}",
				actual.0, actual.1, expected.0, expected.1
			),
			DrawError::ZeroTileSize => write!(f, "tile size must be non-zero"),
		}
	}
}

impl std::error::Error for DrawError {}

/// A structural invariant of a built tree does not hold.
///
/// Seeing one of these means there is a bug in the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantError {
	/// A node's region reaches outside the image.
	OutOfBounds(Region),
	/// A leaf covers pixels already covered by another leaf.
	Overlap(Region),
	/// Children of a split node don't exactly tile it.
	BadSplit(Region),
	/// Some pixels of the image are not covered by any leaf.
	Uncovered {
		/// Number of pixels left uncovered.
		missing: u64,
	},
	/// The recorded node count disagrees with the tree.
	NodeCount {
		/// Count stored on the tree.
		recorded: usize,
		/// Count found by walking the tree.
		actual: usize,
	},
	/// The recorded depth disagrees with the tree.
	Depth {
		/// Depth stored on the tree.
		recorded: usize,
		/// Depth found by walking the tree.
		actual: usize,
	},
}

impl fmt::Display for InvariantError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvariantError::OutOfBounds(r) => write!(f, "region {} lies outside the image", r),
			InvariantError::Overlap(r) => write!(f, "leaf {} overlaps another leaf", r),
			InvariantError::BadSplit(r) => write!(f, "children of {} don't tile it", r),
			InvariantError::Uncovered { missing } =>
				write!(f, "{} pixels are not covered by any leaf", missing),
			InvariantError::NodeCount { recorded, actual } =>
				write!(f, "node count is {} but the tree has {} nodes", recorded, actual),
			InvariantError::Depth { recorded, actual } =>
				write!(f, "depth is {} but the tree is {} levels deep", recorded, actual),
		}
	}
}

impl std::error::Error for InvariantError {}
