use log::info;

use super::error::*;
use super::metric::Color;
use super::snapshot::{SnapshotOptions, SnapshotRecorder};
use super::{BuildParams, Quadtree, QuadtreeNode, Region};

/// Images with more pixels than this are rendered tile by tile.
pub const TILED_RENDER_PIXELS: u64 = 8_000_000;

/// Side length of the square tiles used for tiled rendering.
pub const TILE_SIZE: u32 = 512;

fn fill(img: &mut image::RgbImage, region: Region, color: Color) {
	let pixel = image::Rgb(color);
	for row in region.y..region.bottom() {
		for col in region.x..region.right() {
			img.put_pixel(col, row, pixel);
		}
	}
}

impl QuadtreeNode {
	/// Paints every leaf below this node into `img` with its average color.
	///
	/// Branch nodes paint nothing themselves. A node without subsections is
	/// a leaf, so a tree that is still being built renders whatever it has
	/// so far.
	///
	/// `img` must contain the node's region.
	pub fn to_image(&self, img: &mut image::RgbImage) {
		match self.sections() {
			None => fill(img, self.region, self.color),
			Some(sects) => for section in sects.iter() {
				section.to_image(img);
			},
		}
	}

	/// Renders like `to_image`, but one `tile_size` square of `img` at a
	/// time, descending only into nodes that overlap the current tile.
	///
	/// The output is identical to that of `to_image`; the working set per
	/// pass is one tile's worth of pixels instead of the whole buffer.
	pub fn to_image_tiled(&self, img: &mut image::RgbImage, tile_size: u32) -> Result<(), DrawError> {
		if tile_size == 0 {
			return Err(DrawError::ZeroTileSize);
		}
		self.paint_tiles(img, tile_size);
		Ok(())
	}

	/// Tile loop behind `to_image_tiled`; `tile_size` must be non-zero.
	fn paint_tiles(&self, img: &mut image::RgbImage, tile_size: u32) {
		debug_assert!(tile_size > 0);
		let (width, height) = img.dimensions();
		for tile_y in (0..height).step_by(tile_size as usize) {
			for tile_x in (0..width).step_by(tile_size as usize) {
				let tile = Region::new(
					tile_x,
					tile_y,
					tile_size.min(width - tile_x),
					tile_size.min(height - tile_y),
				);
				self.paint_tile(img, &tile);
			}
		}
	}

	fn paint_tile(&self, img: &mut image::RgbImage, tile: &Region) {
		if !self.region.intersects(tile) {
			return;
		}
		match self.sections() {
			None => if let Some(part) = self.region.intersection(tile) {
				fill(img, part, self.color);
			},
			Some(sects) => for section in sects.iter() {
				section.paint_tile(img, tile);
			},
		}
	}
}

impl Quadtree {
	/// Analyzes an image into a quadtree.
	///
	/// Parameters are checked before anything is built; a bad threshold or
	/// block size is reported, never adjusted.
	pub fn from_image(img: &image::RgbImage, params: &BuildParams) -> Result<Quadtree, BuildError> {
		Quadtree::build(img, params, None)
	}

	/// Like `from_image`, additionally capturing snapshots of the build for
	/// an animation; see `frames` and `take_frames`.
	pub fn from_image_with_snapshots(
		img: &image::RgbImage,
		params: &BuildParams,
		options: SnapshotOptions
	) -> Result<Quadtree, BuildError> {
		Quadtree::build(img, params, Some(options))
	}

	fn build(
		img: &image::RgbImage,
		params: &BuildParams,
		snapshots: Option<SnapshotOptions>
	) -> Result<Quadtree, BuildError> {
		params.validate()?;
		let (width, height) = img.dimensions();
		if width == 0 || height == 0 {
			return Err(BuildError::EmptyImage);
		}

		let mut recorder = snapshots.map(|options| SnapshotRecorder::new(img, options));
		let (root, stats) = QuadtreeNode::mount(
			img,
			Region::new(0, 0, width, height),
			params,
			0,
			recorder.as_mut()
		);
		info!(
			"built {}x{} quadtree with {} ({}): {} nodes, depth {}",
			width, height, params.method, params.threshold, stats.node_count, stats.depth
		);

		let mut tree = Quadtree {
			root,
			width,
			height,
			params: *params,
			stats,
			frames: None,
			final_frame: false,
		};
		if let Some(recorder) = recorder {
			let captured = recorder.frame_count();
			let frames = if recorder.is_enabled() {
				recorder.finish(tree.render())
			} else {
				recorder.finish(image::RgbImage::new(0, 0))
			};
			tree.final_frame = frames.len() > captured;
			tree.frames = Some(frames);
		}
		Ok(tree)
	}

	/// Renders the tree into a new buffer the size of the source image.
	///
	/// Large images are rendered in tiles of `TILE_SIZE`.
	pub fn render(&self) -> image::RgbImage {
		let mut img = image::RgbImage::new(self.width, self.height);
		if self.width as u64 * self.height as u64 > TILED_RENDER_PIXELS {
			self.root.paint_tiles(&mut img, TILE_SIZE);
		} else {
			self.root.to_image(&mut img);
		}
		img
	}

	/// The finished rendering, when it was captured as the last snapshot.
	///
	/// `None` without capture, when capture stopped early, or once the
	/// frames have been taken.
	pub fn final_frame(&self) -> Option<&image::RgbImage> {
		if !self.final_frame {
			return None;
		}
		self.frames.as_deref().and_then(|f| f.last())
	}

	/// Renders the whole tree into `img` in a single pass.
	pub fn render_into(&self, img: &mut image::RgbImage) -> Result<(), DrawError> {
		self.check_dimensions(img)?;
		self.root.to_image(img);
		Ok(())
	}

	/// Renders the tree into `img` one `tile_size` square at a time.
	pub fn render_tiled_into(&self, img: &mut image::RgbImage, tile_size: u32) -> Result<(), DrawError> {
		self.check_dimensions(img)?;
		self.root.to_image_tiled(img, tile_size)
	}

	fn check_dimensions(&self, img: &image::RgbImage) -> Result<(), DrawError> {
		if img.dimensions() != (self.width, self.height) {
			return Err(DrawError::DimensionMismatch {
				expected: (self.width, self.height),
				actual: img.dimensions(),
			});
		}
		Ok(())
	}
}
