pub mod error;
pub mod metric;
pub mod snapshot;

use metric::{Color, ErrorMethod};
use snapshot::SnapshotRecorder;

/// An axis-aligned rectangle of pixels, `width` and `height` at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl Region {
	pub fn new(x: u32, y: u32, width: u32, height: u32) -> Region {
		Region { x, y, width, height }
	}

	pub fn area(&self) -> u64 {
		self.width as u64 * self.height as u64
	}

	/// One past the rightmost column.
	pub fn right(&self) -> u32 {
		self.x + self.width
	}

	/// One past the bottom row.
	pub fn bottom(&self) -> u32 {
		self.y + self.height
	}

	/// Splits the region into top-left, top-right, bottom-left and
	/// bottom-right quarters.
	///
	/// The left column and top row get the floor of half the size; odd
	/// remainders go to the right and bottom quarters, so the four always
	/// tile the region exactly. Quarters of a region narrower or shorter
	/// than 2 pixels are empty.
	pub fn quadrants(&self) -> [Region; 4] {
		let (hw, hh) = (self.width / 2, self.height / 2);
		let (rw, bh) = (self.width - hw, self.height - hh);
		[
			Region::new(self.x, self.y, hw, hh),
			Region::new(self.x + hw, self.y, rw, hh),
			Region::new(self.x, self.y + hh, hw, bh),
			Region::new(self.x + hw, self.y + hh, rw, bh),
		]
	}

	/// Whether the two rectangles share at least one pixel.
	pub fn intersects(&self, other: &Region) -> bool {
		self.x < other.right() && self.right() > other.x &&
			self.y < other.bottom() && self.bottom() > other.y
	}

	/// The pixels the two rectangles have in common, if any.
	pub fn intersection(&self, other: &Region) -> Option<Region> {
		if !self.intersects(other) {
			return None;
		}
		let (x, y) = (self.x.max(other.x), self.y.max(other.y));
		Some(Region::new(
			x,
			y,
			self.right().min(other.right()) - x,
			self.bottom().min(other.bottom()) - y,
		))
	}

	/// Whether `other` lies entirely inside this region.
	pub fn contains(&self, other: &Region) -> bool {
		other.x >= self.x && other.y >= self.y &&
			other.right() <= self.right() && other.bottom() <= self.bottom()
	}
}

impl std::fmt::Display for Region {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
	}
}

/// What the builder needs to know to decide when to stop splitting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildParams {
	pub method: ErrorMethod,
	/// Regions with an error above this (and large enough) are split.
	pub threshold: f64,
	/// Regions this narrow or this short are never split.
	pub min_block_size: u32,
}

impl BuildParams {
	pub fn validate(&self) -> Result<(), error::BuildError> {
		if !self.threshold.is_finite() || self.threshold <= 0. {
			return Err(error::BuildError::InvalidThreshold(self.threshold));
		}
		if self.min_block_size == 0 {
			return Err(error::BuildError::InvalidMinBlockSize(self.min_block_size));
		}
		Ok(())
	}
}

/// Node count and depth of a freshly built subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubtreeStats {
	pub node_count: usize,
	/// Deepest recursion level reached, counting the root as 0.
	pub depth: usize,
}

impl SubtreeStats {
	fn merge(self, other: SubtreeStats) -> SubtreeStats {
		SubtreeStats {
			node_count: self.node_count + other.node_count,
			depth: self.depth.max(other.depth),
		}
	}
}

/// Node in a quadtree approximating an image.
///
/// May contain subnodes (branch node) or no subnodes (leaf node). Every
/// node carries the average color and error of its region, but only leaves
/// are ever painted.
///
/// Subsections are always attached four at a time, in the order top-left,
/// top-right, bottom-left, bottom-right.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadtreeNode {
	region: Region,
	color: Color,
	error: f64,
	sections: Option<Box<[QuadtreeNode; 4]>>,
}

impl QuadtreeNode {
	/// Creates a leaf node.
	pub fn new(region: Region, color: Color, error: f64) -> QuadtreeNode {
		QuadtreeNode { region, color, error, sections: None }
	}

	pub fn region(&self) -> Region {
		self.region
	}

	pub fn color(&self) -> Color {
		self.color
	}

	pub fn error(&self) -> f64 {
		self.error
	}

	pub fn sections(&self) -> Option<&[QuadtreeNode; 4]> {
		self.sections.as_deref()
	}

	pub fn is_leaf(&self) -> bool {
		self.sections.is_none()
	}

	/// Turns a leaf into a branch by attaching its four subsections.
	///
	/// A node is only ever split once.
	pub fn split(&mut self, sections: [QuadtreeNode; 4]) {
		debug_assert!(self.sections.is_none(), "node {} split twice", self.region);
		self.sections = Some(Box::new(sections));
	}

	/// Analyzes `region` of `img` into a quadtree.
	///
	/// The region becomes a leaf when its error is within `params.threshold`
	/// or when either side is no larger than `params.min_block_size`;
	/// otherwise each quadrant is mounted in turn at `depth + 1`.
	///
	/// Node count and depth are returned rather than kept in shared
	/// counters, so sibling subtrees don't depend on each other.
	///
	/// For outside callers: pass a `depth` of 0 and no recorder, or use
	/// `Quadtree::from_image`.
	pub fn mount(
		img: &image::RgbImage,
		region: Region,
		params: &BuildParams,
		depth: usize,
		mut recorder: Option<&mut SnapshotRecorder>
	) -> (QuadtreeNode, SubtreeStats) {
		let color = metric::average_color(img, region);
		let error = params.method.error(img, region, color);
		let mut node = QuadtreeNode::new(region, color, error);
		let mut stats = SubtreeStats { node_count: 1, depth };

		if error <= params.threshold ||
			region.width <= params.min_block_size ||
			region.height <= params.min_block_size {
			if let Some(r) = recorder {
				r.paint_leaf(region, color);
			}
			return (node, stats);
		}

		let [tl, tr, bl, br] = region.quadrants();
		let mut mount_quadrant = |quadrant: Region, stats: &mut SubtreeStats| {
			let (child, child_stats) = QuadtreeNode::mount(
				img, quadrant, params, depth + 1, recorder.as_deref_mut());
			*stats = stats.merge(child_stats);
			child
		};
		let sections = [
			mount_quadrant(tl, &mut stats),
			mount_quadrant(tr, &mut stats),
			mount_quadrant(bl, &mut stats),
			mount_quadrant(br, &mut stats),
		];
		node.split(sections);

		if let Some(r) = recorder {
			r.after_split(depth);
		}
		(node, stats)
	}

	/// Iterates over this node and all of its descendants, parents before
	/// children.
	pub fn nodes(&self) -> Nodes<'_> {
		Nodes { stack: vec![self] }
	}

	/// Iterates over the leaves below (or at) this node, top-left first.
	pub fn leaves(&self) -> impl Iterator<Item = &QuadtreeNode> {
		self.nodes().filter(|n| n.is_leaf())
	}
}

/// Pre-order iterator over a subtree, see `QuadtreeNode::nodes`.
pub struct Nodes<'a> {
	stack: Vec<&'a QuadtreeNode>,
}

impl<'a> Iterator for Nodes<'a> {
	type Item = &'a QuadtreeNode;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		if let Some(sects) = node.sections() {
			self.stack.extend(sects.iter().rev());
		}
		Some(node)
	}
}

/// A fully built quadtree together with what it was built from.
///
/// Read-only once built: it can be rendered, measured and checked, and its
/// snapshots (if any were captured) handed out once.
#[derive(Clone, Debug)]
pub struct Quadtree {
	root: QuadtreeNode,
	width: u32,
	height: u32,
	params: BuildParams,
	stats: SubtreeStats,
	frames: Option<Vec<image::RgbImage>>,
	/// Whether the last of `frames` is the finished rendering.
	final_frame: bool,
}

impl Quadtree {
	pub fn root(&self) -> &QuadtreeNode {
		&self.root
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn params(&self) -> &BuildParams {
		&self.params
	}

	/// Deepest level at which a node was created; 0 for an unsplit tree.
	pub fn depth(&self) -> usize {
		self.stats.depth
	}

	/// Total number of nodes, branches and leaves alike.
	pub fn node_count(&self) -> usize {
		self.stats.node_count
	}

	pub fn leaf_count(&self) -> usize {
		self.root.leaves().count()
	}

	pub fn leaves(&self) -> impl Iterator<Item = &QuadtreeNode> {
		self.root.leaves()
	}

	/// `1 - node_count / pixel_count`, the leaf-count based estimate of how
	/// much smaller the tree is than the image.
	pub fn compression_ratio(&self) -> f64 {
		1. - self.stats.node_count as f64 / (self.width as f64 * self.height as f64)
	}

	/// Snapshots captured during construction, if capture was requested.
	pub fn frames(&self) -> Option<&[image::RgbImage]> {
		self.frames.as_deref()
	}

	/// Hands the captured snapshots over to the caller, leaving none behind.
	pub fn take_frames(&mut self) -> Option<Vec<image::RgbImage>> {
		self.frames.take()
	}
}

pub mod render;
pub mod verify;
