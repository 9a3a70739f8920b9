//! Intermediate renderings taken while a tree is being built, for turning
//! into an animation of the compression process.
//!
//! The recorder keeps a canvas holding the original image dimmed to 30%,
//! and paints every finished leaf onto it with a dark outline. A frame is
//! a copy of that canvas, so it shows the tree built so far over what is
//! still left to do.

use log::{debug, warn};

use super::metric::Color;
use super::Region;

/// Most frames kept before the final one.
pub const MAX_FRAMES: usize = 25;

/// How much of the original shows through behind unfinished regions, in
/// tenths.
const BACKGROUND_TENTHS: u16 = 3;

/// Outline darkening, as the fraction of the leaf color kept (out of 255).
const OUTLINE_KEEP: u16 = 55;

/// Limits on snapshot capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotOptions {
	/// Number of frames after which intermediate capture stops. The final
	/// frame is added on top of these.
	pub max_frames: usize,
	/// Total bytes of frame data allowed, or `None` for no limit beyond
	/// what the allocator gives us.
	pub memory_budget: Option<usize>,
}

impl Default for SnapshotOptions {
	fn default() -> Self {
		SnapshotOptions { max_frames: MAX_FRAMES, memory_budget: None }
	}
}

/// How many splits to let pass between frames.
///
/// Early splits (shallow depth) are always captured; deeper in the tree,
/// bigger images are sampled more sparsely.
pub fn capture_frequency(depth: usize, total_pixels: u64) -> usize {
	if depth <= 2 {
		1
	} else if total_pixels < 250_000 {
		2
	} else if total_pixels < 1_000_000 {
		4
	} else {
		8
	}
}

/// Collects frames while a tree is mounted.
///
/// Capture stops for good when a frame can't be allocated or would exceed
/// the memory budget; frames taken until then are kept. The tree being
/// built is never affected.
#[derive(Debug)]
pub struct SnapshotRecorder {
	canvas: image::RgbImage,
	frames: Vec<image::RgbImage>,
	options: SnapshotOptions,
	used_bytes: usize,
	split_counter: usize,
	total_pixels: u64,
	enabled: bool,
}

impl SnapshotRecorder {
	/// Starts recording the compression of `original`; the first frame is
	/// the original itself.
	pub fn new(original: &image::RgbImage, options: SnapshotOptions) -> SnapshotRecorder {
		let mut recorder = SnapshotRecorder {
			canvas: image::RgbImage::new(0, 0),
			frames: Vec::new(),
			options,
			used_bytes: 0,
			split_counter: 0,
			total_pixels: original.width() as u64 * original.height() as u64,
			enabled: true,
		};
		match try_copy(original) {
			Some(mut canvas) => {
				for p in canvas.pixels_mut() {
					for c in p.0.iter_mut() {
						*c = (*c as u16 * BACKGROUND_TENTHS / 10) as u8;
					}
				}
				recorder.canvas = canvas;
				recorder.push_frame(original);
			},
			None => recorder.disable("could not allocate the snapshot canvas"),
		}
		recorder
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn frame_count(&self) -> usize {
		self.frames.len()
	}

	/// Paints a finished leaf onto the canvas.
	pub fn paint_leaf(&mut self, region: Region, color: Color) {
		if !self.enabled {
			return;
		}
		let outline = region.width >= 3 && region.height >= 3;
		let dark = [
			(color[0] as u16 * OUTLINE_KEEP / 255) as u8,
			(color[1] as u16 * OUTLINE_KEEP / 255) as u8,
			(color[2] as u16 * OUTLINE_KEEP / 255) as u8,
		];
		for row in region.y..region.bottom() {
			for col in region.x..region.right() {
				let edge = row == region.y || row == region.bottom() - 1 ||
					col == region.x || col == region.right() - 1;
				let c = if outline && edge { dark } else { color };
				self.canvas.put_pixel(col, row, image::Rgb(c));
			}
		}
	}

	/// Called once a node at `depth` has been split; takes a frame when
	/// the throttling allows it.
	pub fn after_split(&mut self, depth: usize) {
		let frequency = capture_frequency(depth, self.total_pixels);
		if self.enabled &&
			self.split_counter % frequency == 0 &&
			self.frames.len() < self.options.max_frames {
			let canvas = std::mem::replace(&mut self.canvas, image::RgbImage::new(0, 0));
			self.push_frame(&canvas);
			// A failed push drops the canvas along with capture.
			if self.enabled {
				self.canvas = canvas;
			}
		}
		self.split_counter += 1;
	}

	/// Adds the finished rendering as the last frame and hands over
	/// everything captured.
	///
	/// `rendered` is moved in rather than copied. It is dropped when capture
	/// has already stopped or it doesn't fit the budget; use `frame_count`
	/// beforehand to tell whether it made it in.
	pub fn finish(mut self, rendered: image::RgbImage) -> Vec<image::RgbImage> {
		if self.reserve_frame(rendered.as_raw().len()) {
			self.frames.push(rendered);
		}
		debug!("captured {} snapshot frames", self.frames.len());
		self.frames
	}

	fn push_frame(&mut self, source: &image::RgbImage) {
		if !self.reserve_frame(source.as_raw().len()) {
			return;
		}
		match try_copy(source) {
			Some(frame) => self.frames.push(frame),
			None => {
				self.used_bytes -= source.as_raw().len();
				self.disable("memory limit reached");
			},
		}
	}

	/// Makes room for one more frame of `bytes`, counting it against the
	/// budget. Disables capture and returns false if there is none.
	fn reserve_frame(&mut self, bytes: usize) -> bool {
		if !self.enabled {
			return false;
		}
		if let Some(budget) = self.options.memory_budget {
			if self.used_bytes + bytes > budget {
				self.disable("snapshot memory budget reached");
				return false;
			}
		}
		if self.frames.try_reserve(1).is_err() {
			self.disable("memory limit reached");
			return false;
		}
		self.used_bytes += bytes;
		true
	}

	fn disable(&mut self, reason: &str) {
		warn!("{}, stopping frame capture", reason);
		self.enabled = false;
		self.canvas = image::RgbImage::new(0, 0);
	}
}

/// Copies an image without aborting the process if memory runs out.
fn try_copy(source: &image::RgbImage) -> Option<image::RgbImage> {
	let mut buf = Vec::new();
	buf.try_reserve_exact(source.as_raw().len()).ok()?;
	buf.extend_from_slice(source.as_raw());
	image::RgbImage::from_raw(source.width(), source.height(), buf)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Rgb, RgbImage};

	#[test]
	fn frequency_by_depth_and_size() {
		assert_eq!(capture_frequency(0, 10_000_000), 1);
		assert_eq!(capture_frequency(2, 10_000_000), 1);
		assert_eq!(capture_frequency(3, 100), 2);
		assert_eq!(capture_frequency(3, 500_000), 4);
		assert_eq!(capture_frequency(5, 1_000_000), 8);
	}

	#[test]
	fn first_frame_is_the_original() {
		let img = RgbImage::from_pixel(4, 4, Rgb([100, 200, 50]));
		let recorder = SnapshotRecorder::new(&img, SnapshotOptions::default());
		assert_eq!(recorder.frame_count(), 1);
		let frames = recorder.finish(img.clone());
		assert_eq!(frames.len(), 2);
		assert_eq!(frames[0], img);
	}

	#[test]
	fn canvas_dims_background_and_paints_leaves() {
		let img = RgbImage::from_pixel(8, 8, Rgb([100, 200, 50]));
		let mut recorder = SnapshotRecorder::new(&img, SnapshotOptions::default());
		recorder.paint_leaf(Region::new(0, 0, 4, 4), [255, 0, 0]);
		recorder.after_split(0);
		let frames = recorder.finish(img.clone());
		let frame = &frames[1];
		assert_eq!(frame.get_pixel(6, 6), &Rgb([30, 60, 15]));
		assert_eq!(frame.get_pixel(1, 1), &Rgb([255, 0, 0]));
		assert_eq!(frame.get_pixel(0, 0), &Rgb([55, 0, 0]));
	}

	#[test]
	fn stops_at_max_frames() {
		let img = RgbImage::new(2, 2);
		let options = SnapshotOptions { max_frames: 3, memory_budget: None };
		let mut recorder = SnapshotRecorder::new(&img, options);
		for _ in 0..10 {
			recorder.after_split(0);
		}
		assert_eq!(recorder.frame_count(), 3);
		assert!(recorder.is_enabled());
		assert_eq!(recorder.finish(img.clone()).len(), 4);
	}

	#[test]
	fn budget_exhaustion_disables_capture() {
		let img = RgbImage::new(4, 4);
		// Room for exactly two frames of 4x4x3 bytes.
		let options = SnapshotOptions { max_frames: 10, memory_budget: Some(96) };
		let mut recorder = SnapshotRecorder::new(&img, options);
		recorder.after_split(0);
		assert!(recorder.is_enabled());
		recorder.after_split(0);
		assert!(!recorder.is_enabled());
		// Painting after capture stopped is harmless.
		recorder.paint_leaf(Region::new(0, 0, 4, 4), [1, 2, 3]);
		assert_eq!(recorder.finish(img.clone()).len(), 2);
	}

	#[test]
	fn disabling_releases_the_canvas() {
		let img = RgbImage::from_pixel(64, 64, Rgb([7, 8, 9]));
		let options = SnapshotOptions { max_frames: 10, memory_budget: Some(64 * 64 * 3) };
		let mut recorder = SnapshotRecorder::new(&img, options);
		assert_eq!(recorder.canvas.dimensions(), (64, 64));
		recorder.after_split(0);
		assert!(!recorder.is_enabled());
		assert_eq!(recorder.canvas.dimensions(), (0, 0));
		assert_eq!(recorder.frame_count(), 1);
	}

	#[test]
	fn final_frame_is_moved_in() {
		let img = RgbImage::from_pixel(3, 3, Rgb([1, 1, 1]));
		let rendered = RgbImage::from_pixel(3, 3, Rgb([2, 2, 2]));
		let recorder = SnapshotRecorder::new(&img, SnapshotOptions::default());
		let frames = recorder.finish(rendered.clone());
		assert_eq!(frames, vec![img, rendered]);
	}
}
