//! Lossy image compression by quadtree block averaging.
//!
//! An image is split recursively into quarters until each block is either
//! uniform enough under the chosen [`ErrorMethod`] or too small to split;
//! every leaf is then painted with its average color. Optionally, the error
//! threshold is tuned to reach a target compression ratio, and snapshots
//! of the build are kept for an animation.

pub mod animation;
pub mod node;
pub mod stats;
pub mod tune;

pub use node::*;
pub use node::error::{BuildError, DrawError, InvariantError};
pub use node::metric::ErrorMethod;
pub use node::snapshot::SnapshotOptions;
pub use tune::TuneReport;

use std::fmt;
use std::time::{Duration, Instant};

/// Everything a compression run needs besides the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressOptions {
	pub method: ErrorMethod,
	/// Error threshold; ignored when `target_ratio` is non-zero.
	pub threshold: f64,
	pub min_block_size: u32,
	/// Compression ratio to tune the threshold for, between 0 and 1; 0
	/// keeps `threshold` as given.
	pub target_ratio: f64,
	/// Whether to capture snapshots for an animation.
	pub capture: bool,
}

impl Default for CompressOptions {
	fn default() -> Self {
		CompressOptions {
			method: ErrorMethod::Variance,
			threshold: 50.,
			min_block_size: 4,
			target_ratio: 0.,
			capture: false,
		}
	}
}

impl CompressOptions {
	/// Checks the options without looking at an image.
	///
	/// The threshold only matters (and is only checked) when no target
	/// ratio is set.
	pub fn validate(&self) -> Result<(), BuildError> {
		if !(0. ..=1.).contains(&self.target_ratio) {
			return Err(BuildError::InvalidTargetRatio(self.target_ratio));
		}
		if self.min_block_size == 0 {
			return Err(BuildError::InvalidMinBlockSize(self.min_block_size));
		}
		if self.target_ratio == 0. {
			self.params(self.threshold).validate()?;
		}
		Ok(())
	}

	fn params(&self, threshold: f64) -> BuildParams {
		BuildParams { method: self.method, threshold, min_block_size: self.min_block_size }
	}
}

/// Result of a compression run.
#[derive(Clone, Debug)]
pub struct Compressed {
	/// The reconstructed image, same size as the input.
	pub image: image::RgbImage,
	pub node_count: usize,
	pub depth: usize,
	/// Threshold the final tree was built with.
	pub threshold: f64,
	/// Outcome of threshold tuning, if a target ratio was set.
	pub tuning: Option<TuneReport>,
	/// Snapshots of the build, first the original and last the result;
	/// empty unless capture was requested.
	pub frames: Vec<image::RgbImage>,
	/// Time spent tuning, building and rendering.
	pub elapsed: Duration,
}

/// Compresses `img`: tunes the threshold if asked to, builds the tree,
/// checks it and renders it.
pub fn compress(img: &image::RgbImage, options: &CompressOptions) -> Result<Compressed, Error> {
	options.validate()?;
	let start = Instant::now();

	let tuning = tune::tune_threshold(img, options.method, options.min_block_size, options.target_ratio)?;
	let threshold = tuning.map_or(options.threshold, |t| t.threshold);
	let params = options.params(threshold);

	let mut tree = if options.capture {
		Quadtree::from_image_with_snapshots(img, &params, SnapshotOptions::default())?
	} else {
		Quadtree::from_image(img, &params)?
	};
	tree.verify()?;
	let image = match tree.final_frame() {
		Some(frame) => frame.clone(),
		None => tree.render(),
	};

	Ok(Compressed {
		image,
		node_count: tree.node_count(),
		depth: tree.depth(),
		threshold,
		tuning,
		frames: tree.take_frames().unwrap_or_default(),
		elapsed: start.elapsed(),
	})
}

/// Broad category of an `Error`, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
	/// The caller supplied unusable parameters or image data.
	BadInput,
	/// Reading or writing a file failed.
	Io,
	/// The crate broke one of its own invariants.
	Internal,
}

/// Any error a compression run can end with.
#[derive(Debug)]
pub enum Error {
	Build(BuildError),
	Draw(DrawError),
	Invariant(InvariantError),
	Image(image::ImageError),
	Io(std::io::Error),
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Build(_) => ErrorKind::BadInput,
			Error::Draw(_) | Error::Invariant(_) => ErrorKind::Internal,
			Error::Image(e) => match e {
				image::ImageError::IoError(_) | image::ImageError::Encoding(_) => ErrorKind::Io,
				_ => ErrorKind::BadInput,
			},
			Error::Io(_) => ErrorKind::Io,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Build(e) => write!(f, "invalid input: {}", e),
			Error::Draw(e) => write!(f, "rendering failed: {}", e),
			Error::Invariant(e) => write!(f, "internal error: {}", e),
			Error::Image(e) => write!(f, "image error: {}", e),
			Error::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Build(e) => Some(e),
			Error::Draw(e) => Some(e),
			Error::Invariant(e) => Some(e),
			Error::Image(e) => Some(e),
			Error::Io(e) => Some(e),
		}
	}
}

impl From<BuildError> for Error {
	fn from(e: BuildError) -> Self {
		Error::Build(e)
	}
}

impl From<DrawError> for Error {
	fn from(e: DrawError) -> Self {
		Error::Draw(e)
	}
}

impl From<InvariantError> for Error {
	fn from(e: InvariantError) -> Self {
		Error::Invariant(e)
	}
}

impl From<image::ImageError> for Error {
	fn from(e: image::ImageError) -> Self {
		Error::Image(e)
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		Error::Io(e)
	}
}
