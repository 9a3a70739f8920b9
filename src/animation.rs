//! Animated GIF of the snapshots taken while building a tree.

use std::io::Write;

use image::codecs::gif::{GifEncoder, Repeat};
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame, RgbImage};
use log::debug;

/// Display time of every frame but the last, in milliseconds.
pub const FRAME_DELAY_MS: u32 = 300;

/// Display time of the last frame, in milliseconds.
pub const FINAL_FRAME_DELAY_MS: u32 = 3000;

/// Frames bigger than this many pixels are scaled down before encoding.
pub const MAX_GIF_PIXELS: u64 = 1_000_000;

/// Writes `frames` to `writer` as a looping GIF.
///
/// All frames are expected to share the dimensions of the first.
pub fn write_gif<W: Write>(frames: &[RgbImage], writer: W) -> Result<(), ImageError> {
	let first = frames.first().ok_or_else(|| ImageError::Parameter(ParameterError::from_kind(
		ParameterErrorKind::Generic("no frames to animate".to_string())
	)))?;
	let (width, height) = gif_dimensions(first.width(), first.height());
	debug!("writing {} GIF frames at {}x{}", frames.len(), width, height);

	let mut encoder = GifEncoder::new(writer);
	encoder.set_repeat(Repeat::Infinite)?;
	let last = frames.len() - 1;
	encoder.encode_frames(frames.iter().enumerate().map(|(ind, frame)| {
		let scaled = if frame.dimensions() == (width, height) {
			DynamicImage::ImageRgb8(frame.clone())
		} else {
			DynamicImage::ImageRgb8(imageops::resize(frame, width, height, FilterType::Triangle))
		};
		let delay = if ind == last { FINAL_FRAME_DELAY_MS } else { FRAME_DELAY_MS };
		Frame::from_parts(scaled.into_rgba8(), 0, 0, Delay::from_numer_denom_ms(delay, 1))
	}))
}

/// Dimensions that keep the aspect ratio and stay within `MAX_GIF_PIXELS`.
fn gif_dimensions(width: u32, height: u32) -> (u32, u32) {
	let pixels = width as u64 * height as u64;
	if pixels <= MAX_GIF_PIXELS {
		return (width, height);
	}
	let scale = (MAX_GIF_PIXELS as f64 / pixels as f64).sqrt();
	(
		((width as f64 * scale) as u32).max(1),
		((height as f64 * scale) as u32).max(1),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgb;

	#[test]
	fn writes_a_gif() {
		let frames = vec![
			RgbImage::from_pixel(6, 4, Rgb([0, 0, 0])),
			RgbImage::from_pixel(6, 4, Rgb([255, 0, 0])),
			RgbImage::from_pixel(6, 4, Rgb([0, 0, 255])),
		];
		let mut out = Vec::new();
		write_gif(&frames, &mut out).unwrap();
		assert_eq!(&out[..6], b"GIF89a");
	}

	#[test]
	fn no_frames_is_an_error() {
		let mut out = Vec::new();
		assert!(write_gif(&[], &mut out).is_err());
	}

	#[test]
	fn large_frames_are_scaled() {
		assert_eq!(gif_dimensions(800, 600), (800, 600));
		let (w, h) = gif_dimensions(4000, 2000);
		assert!(w as u64 * h as u64 <= MAX_GIF_PIXELS);
		assert_eq!((w, h), (1414, 707));
	}
}
