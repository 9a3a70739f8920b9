//! Binary search for the error threshold that gives a requested
//! compression ratio.
//!
//! Trial trees are built on a half-size copy of the image with half the
//! minimum block size, so tuning costs a fraction of the final build.

use image::imageops::{self, FilterType};
use log::debug;

use crate::node::error::BuildError;
use crate::node::metric::ErrorMethod;
use crate::node::{BuildParams, Quadtree};

/// Trial builds to try before settling.
pub const MAX_ITERATIONS: usize = 8;

/// How close the achieved ratio has to be to the target to stop early.
pub const TOLERANCE: f64 = 0.05;

/// Outcome of a threshold search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuneReport {
	/// Threshold whose trial came closest to the target.
	pub threshold: f64,
	/// Compression ratio of the trial at `threshold`.
	pub ratio: f64,
	/// Number of trial trees built.
	pub iterations: usize,
	/// Whether `ratio` is within `TOLERANCE` of the target.
	pub converged: bool,
}

/// Upper end of the threshold search for `method`.
///
/// The bounded metrics are searched over their whole range. Variance spans
/// four orders of magnitude, so its search stops at the top of its useful
/// range instead; otherwise the finest step of the search would sit above
/// most useful thresholds.
pub fn search_bound(method: ErrorMethod) -> f64 {
	match method {
		ErrorMethod::Variance => method.suggested_range().1,
		_ => method.max_error(),
	}
}

/// Searches `[0, search_bound(method)]` for a threshold whose tree has a
/// compression ratio (`1 - node_count / pixel_count`) close to
/// `target_ratio`.
///
/// A `target_ratio` of 0 means "don't tune" and gives `Ok(None)`.
///
/// The search stops as soon as a trial lands within `TOLERANCE`, or after
/// `MAX_ITERATIONS` trials; the threshold of the closest trial is reported
/// either way.
pub fn tune_threshold(
	img: &image::RgbImage,
	method: ErrorMethod,
	min_block_size: u32,
	target_ratio: f64
) -> Result<Option<TuneReport>, BuildError> {
	if !(0. ..=1.).contains(&target_ratio) {
		return Err(BuildError::InvalidTargetRatio(target_ratio));
	}
	if min_block_size == 0 {
		return Err(BuildError::InvalidMinBlockSize(min_block_size));
	}
	if img.width() == 0 || img.height() == 0 {
		return Err(BuildError::EmptyImage);
	}
	if target_ratio == 0. {
		return Ok(None);
	}

	let trial_img = trial_image(img);
	let trial_block = (min_block_size / 2).max(1);
	let (mut low, mut high) = (0., search_bound(method));
	let mut best: Option<TuneReport> = None;

	for iteration in 1..=MAX_ITERATIONS {
		let threshold = (low + high) / 2.;
		let params = BuildParams { method, threshold, min_block_size: trial_block };
		let ratio = Quadtree::from_image(&trial_img, &params)?.compression_ratio();
		let converged = (ratio - target_ratio).abs() < TOLERANCE;
		debug!("trial {}: threshold {} gives ratio {:.4}", iteration, threshold, ratio);

		let closer = best.map_or(true, |b| (ratio - target_ratio).abs() < (b.ratio - target_ratio).abs());
		if closer {
			best = Some(TuneReport { threshold, ratio, iterations: iteration, converged });
		}
		if let Some(b) = best.as_mut() {
			b.iterations = iteration;
		}
		if converged {
			break;
		}
		// Higher thresholds split less, which raises the ratio.
		if ratio < target_ratio {
			low = threshold;
		} else {
			high = threshold;
		}
	}
	Ok(best)
}

/// The image at half size (at least one pixel each way).
fn trial_image(img: &image::RgbImage) -> image::RgbImage {
	let width = (img.width() / 2).max(1);
	let height = (img.height() / 2).max(1);
	imageops::resize(img, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Rgb, RgbImage};

	/// Squares of `cell` pixels alternating between two colors.
	fn checkerboard(size: u32, cell: u32) -> RgbImage {
		RgbImage::from_fn(size, size, |x, y| {
			if (x / cell + y / cell) % 2 == 0 { Rgb([20, 40, 60]) } else { Rgb([230, 210, 190]) }
		})
	}

	#[test]
	fn zero_target_disables_tuning() {
		let img = checkerboard(16, 4);
		assert_eq!(tune_threshold(&img, ErrorMethod::Variance, 1, 0.).unwrap(), None);
	}

	#[test]
	fn rejects_bad_input() {
		let img = checkerboard(16, 4);
		assert_eq!(
			tune_threshold(&img, ErrorMethod::Variance, 1, 1.5),
			Err(BuildError::InvalidTargetRatio(1.5))
		);
		assert!(tune_threshold(&img, ErrorMethod::Variance, 1, f64::NAN).is_err());
		assert_eq!(
			tune_threshold(&img, ErrorMethod::Variance, 0, 0.5),
			Err(BuildError::InvalidMinBlockSize(0))
		);
		assert_eq!(
			tune_threshold(&RgbImage::new(0, 0), ErrorMethod::Variance, 1, 0.5),
			Err(BuildError::EmptyImage)
		);
	}

	#[test]
	fn flat_image_converges_immediately() {
		let img = RgbImage::from_pixel(64, 64, Rgb([9, 9, 9]));
		let report = tune_threshold(&img, ErrorMethod::Entropy, 4, 0.99).unwrap().unwrap();
		assert!(report.converged);
		assert_eq!(report.iterations, 1);
		assert_eq!(report.threshold, ErrorMethod::Entropy.max_error() / 2.);
	}

	#[test]
	fn checkerboard_converges_or_exhausts_budget() {
		let img = checkerboard(128, 8);
		for method in ErrorMethod::ALL.iter() {
			for target in [0.5, 0.8, 0.95, 0.999].iter() {
				let report = tune_threshold(&img, *method, 2, *target).unwrap().unwrap();
				assert!(
					report.converged || report.iterations == MAX_ITERATIONS,
					"{} for {}: {:?}", method, target, report
				);
				assert_eq!(report.converged, (report.ratio - target).abs() < TOLERANCE);
				assert!(report.threshold > 0. && report.threshold < method.max_error());
			}
		}
	}

	#[test]
	fn reported_ratio_matches_a_trial_build() {
		let img = checkerboard(64, 4);
		let report = tune_threshold(&img, ErrorMethod::MaxPixelDifference, 2, 0.9).unwrap().unwrap();
		let trial = trial_image(&img);
		let params = BuildParams {
			method: ErrorMethod::MaxPixelDifference,
			threshold: report.threshold,
			min_block_size: 1,
		};
		let tree = Quadtree::from_image(&trial, &params).unwrap();
		assert_eq!(tree.compression_ratio(), report.ratio);
	}

	#[test]
	fn reaches_low_variance_thresholds() {
		// Flat 4x4 cells with gentle steps between them: any threshold up to
		// about 16 keeps every cell apart, anything above ~24 merges them all.
		let img = RgbImage::from_fn(128, 128, |x, y| {
			let (cx, cy) = (x / 4, y / 4);
			Rgb([(100 + (cx * 7 + cy * 13) % 23) as u8; 3])
		});
		let report = tune_threshold(&img, ErrorMethod::Variance, 4, 0.70).unwrap().unwrap();
		assert!(report.converged, "{:?}", report);
		assert!(report.threshold < 64., "{:?}", report);
		assert!((report.ratio - 0.70).abs() < TOLERANCE);
	}

	#[test]
	fn variance_search_is_bounded_by_useful_range() {
		assert_eq!(search_bound(ErrorMethod::Variance), 1000.);
		assert!(search_bound(ErrorMethod::Variance) <= ErrorMethod::Variance.max_error());
		for method in ErrorMethod::ALL.iter().filter(|m| **m != ErrorMethod::Variance) {
			assert_eq!(search_bound(*method), method.max_error());
		}
	}

	#[test]
	fn trial_image_is_half_size() {
		assert_eq!(trial_image(&RgbImage::new(101, 40)).dimensions(), (50, 20));
		assert_eq!(trial_image(&RgbImage::new(1, 1)).dimensions(), (1, 1));
	}
}
