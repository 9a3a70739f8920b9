//! Per-block statistics: the average color of a region and a scalar
//! "error" telling how badly that average represents the region.
//!
//! Every metric walks the full region; there is no sampling. Higher values
//! always mean "more detail", so a single threshold comparison decides
//! whether to split regardless of the metric in use.

use super::Region;

pub type Color = [u8; 3];

/// SSIM stabilizing constant for the luminance term, `(0.01 * 255)^2`.
pub const SSIM_C1: f64 = (0.01 * 255.) * (0.01 * 255.);
/// SSIM stabilizing constant for the contrast term, `(0.03 * 255)^2`.
pub const SSIM_C2: f64 = (0.03 * 255.) * (0.03 * 255.);

/// The way a block's error is measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorMethod {
	/// Mean squared deviation from the average color, averaged over channels.
	Variance,
	/// Mean absolute deviation from the average color, averaged over channels.
	MeanAbsoluteDeviation,
	/// Per-channel `max - min`, averaged over channels.
	MaxPixelDifference,
	/// Per-channel Shannon entropy (bits) of the intensity histogram.
	Entropy,
	/// `1 - SSIM` against a flat block of the average color.
	///
	/// The flat reference has no variance, so the covariance term vanishes
	/// and the score collapses to `var / (var + C2)` per channel. It is a
	/// bounded transform of the variance rather than a real structural
	/// comparison.
	StructuralSimilarity,
}

impl ErrorMethod {
	pub const ALL: [ErrorMethod; 5] = [
		ErrorMethod::Variance,
		ErrorMethod::MeanAbsoluteDeviation,
		ErrorMethod::MaxPixelDifference,
		ErrorMethod::Entropy,
		ErrorMethod::StructuralSimilarity,
	];

	/// Menu number of the method, starting at 1.
	pub fn id(self) -> u8 {
		match self {
			ErrorMethod::Variance => 1,
			ErrorMethod::MeanAbsoluteDeviation => 2,
			ErrorMethod::MaxPixelDifference => 3,
			ErrorMethod::Entropy => 4,
			ErrorMethod::StructuralSimilarity => 5,
		}
	}

	pub fn from_id(id: u8) -> Option<ErrorMethod> {
		ErrorMethod::ALL.iter().copied().find(|m| m.id() == id)
	}

	pub fn name(self) -> &'static str {
		match self {
			ErrorMethod::Variance => "Variance",
			ErrorMethod::MeanAbsoluteDeviation => "Mean Absolute Deviation",
			ErrorMethod::MaxPixelDifference => "Max Pixel Difference",
			ErrorMethod::Entropy => "Entropy",
			ErrorMethod::StructuralSimilarity => "Structural Similarity Index",
		}
	}

	/// Range of thresholds that tend to give useful results with this method.
	pub fn suggested_range(self) -> (f64, f64) {
		match self {
			ErrorMethod::Variance => (10., 1000.),
			ErrorMethod::MeanAbsoluteDeviation => (5., 100.),
			ErrorMethod::MaxPixelDifference => (10., 200.),
			ErrorMethod::Entropy => (0.1, 5.),
			ErrorMethod::StructuralSimilarity => (0.01, 0.5),
		}
	}

	/// An upper bound on any error this method can report for 8-bit channels.
	///
	/// A threshold at this value never splits anything.
	pub fn max_error(self) -> f64 {
		match self {
			// 127.5^2 around the true mean, plus the truncation of the mean
			ErrorMethod::Variance => 16384.,
			ErrorMethod::MeanAbsoluteDeviation => 255.,
			ErrorMethod::MaxPixelDifference => 255.,
			ErrorMethod::Entropy => 8.,
			ErrorMethod::StructuralSimilarity => 1.,
		}
	}

	/// Measures the error of `region` in `img`.
	///
	/// `avg` must be the result of `average_color` for the same region;
	/// it is taken as an argument because the builder needs it anyway.
	pub fn error(self, img: &image::RgbImage, region: Region, avg: Color) -> f64 {
		debug_assert!(region.area() > 0, "error of an empty region");
		match self {
			ErrorMethod::Variance => variance(img, region, avg),
			ErrorMethod::MeanAbsoluteDeviation => mean_absolute_deviation(img, region, avg),
			ErrorMethod::MaxPixelDifference => max_pixel_difference(img, region),
			ErrorMethod::Entropy => entropy(img, region),
			ErrorMethod::StructuralSimilarity => simplified_ssim(img, region, avg),
		}
	}
}

impl Default for ErrorMethod {
	fn default() -> Self {
		ErrorMethod::Variance
	}
}

impl std::fmt::Display for ErrorMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl std::str::FromStr for ErrorMethod {
	type Err = &'static str;

	/// Accepts either the menu number or a short name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Ok(id) = s.parse::<u8>() {
			return ErrorMethod::from_id(id).ok_or("method number must be between 1 and 5");
		}
		match s.to_ascii_lowercase().as_str() {
			"variance" | "var" => Ok(ErrorMethod::Variance),
			"mad" | "mean-absolute-deviation" => Ok(ErrorMethod::MeanAbsoluteDeviation),
			"max-diff" | "maxdiff" | "max-pixel-difference" => Ok(ErrorMethod::MaxPixelDifference),
			"entropy" => Ok(ErrorMethod::Entropy),
			"ssim" => Ok(ErrorMethod::StructuralSimilarity),
			_ => Err("unknown error method"),
		}
	}
}

/// Iterates over the pixels of `region`, row by row.
fn region_pixels<'a>(
	img: &'a image::RgbImage,
	region: Region
) -> impl Iterator<Item = &'a image::Rgb<u8>> + 'a {
	(region.y..region.y + region.height).flat_map(move |row| {
		(region.x..region.x + region.width).map(move |col| img.get_pixel(col, row))
	})
}

/// Integer-truncated mean of each channel over `region`.
pub fn average_color(img: &image::RgbImage, region: Region) -> Color {
	debug_assert!(region.area() > 0, "average of an empty region");
	let sums = region_pixels(img, region).fold([0u64; 3], |mut s, p| {
		for c in 0..3 {
			s[c] += p.0[c] as u64;
		}
		s
	});
	let count = region.area();
	[
		(sums[0] / count) as u8,
		(sums[1] / count) as u8,
		(sums[2] / count) as u8,
	]
}

/// Sums `f(channel value, channel mean)` per channel and returns the mean
/// over pixels, averaged over the three channels.
fn mean_deviation<F: Fn(f64, f64) -> f64>(
	img: &image::RgbImage,
	region: Region,
	avg: Color,
	f: F
) -> f64 {
	let sums = region_pixels(img, region).fold([0f64; 3], |mut s, p| {
		for c in 0..3 {
			s[c] += f(p.0[c] as f64, avg[c] as f64);
		}
		s
	});
	let count = region.area() as f64;
	sums.iter().map(|s| s / count).sum::<f64>() / 3.
}

fn variance(img: &image::RgbImage, region: Region, avg: Color) -> f64 {
	mean_deviation(img, region, avg, |v, m| (v - m) * (v - m))
}

fn mean_absolute_deviation(img: &image::RgbImage, region: Region, avg: Color) -> f64 {
	mean_deviation(img, region, avg, |v, m| (v - m).abs())
}

fn max_pixel_difference(img: &image::RgbImage, region: Region) -> f64 {
	let (min, max) = region_pixels(img, region).fold(
		([255u8; 3], [0u8; 3]),
		|(mut min, mut max), p| {
			for c in 0..3 {
				min[c] = min[c].min(p.0[c]);
				max[c] = max[c].max(p.0[c]);
			}
			(min, max)
		}
	);
	(0..3).map(|c| (max[c] - min[c]) as f64).sum::<f64>() / 3.
}

fn entropy(img: &image::RgbImage, region: Region) -> f64 {
	let mut histograms = [[0u32; 256]; 3];
	for p in region_pixels(img, region) {
		for c in 0..3 {
			histograms[c][p.0[c] as usize] += 1;
		}
	}
	let count = region.area() as f64;
	histograms.iter()
		.map(|h| h.iter()
			.filter(|n| **n > 0)
			.map(|n| {
				let p = *n as f64 / count;
				-p * p.log2()
			})
			.sum::<f64>())
		.sum::<f64>() / 3.
}

fn simplified_ssim(img: &image::RgbImage, region: Region, avg: Color) -> f64 {
	// The reference block is flat with the average color: its mean equals
	// ours and its variance is zero, and so is the covariance.
	let var_x = {
		let sums = region_pixels(img, region).fold([0f64; 3], |mut s, p| {
			for c in 0..3 {
				let d = p.0[c] as f64 - avg[c] as f64;
				s[c] += d * d;
			}
			s
		});
		let count = region.area() as f64;
		[sums[0] / count, sums[1] / count, sums[2] / count]
	};
	let (var_y, covar) = (0., 0.);
	let ssim = (0..3).map(|c| {
		let mu = avg[c] as f64;
		((2. * mu * mu + SSIM_C1) * (2. * covar + SSIM_C2)) /
			((mu * mu + mu * mu + SSIM_C1) * (var_x[c] + var_y + SSIM_C2))
	}).sum::<f64>() / 3.;
	1. - ssim
}
