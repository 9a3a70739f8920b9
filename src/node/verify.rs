use bitvec::order::Msb0;
use bitvec::vec::BitVec;

use super::error::InvariantError;
use super::{Quadtree, QuadtreeNode, Region};

/// One bit per image pixel, row-major, set once a leaf covers it.
type CoverageMask = BitVec<u8, Msb0>;

/// What a walk over the tree found.
struct Walk {
	mask: CoverageMask,
	width: u32,
	node_count: usize,
	depth: usize,
}

impl Walk {
	fn visit(&mut self, node: &QuadtreeNode, depth: usize) -> Result<(), InvariantError> {
		let region = node.region();
		self.node_count += 1;
		self.depth = self.depth.max(depth);
		match node.sections() {
			None => self.cover(region),
			Some(sects) => {
				let area: u64 = sects.iter().map(|s| s.region().area()).sum();
				if area != region.area() || !sects.iter().all(|s| region.contains(&s.region())) {
					return Err(InvariantError::BadSplit(region));
				}
				for section in sects.iter() {
					self.visit(section, depth + 1)?;
				}
				Ok(())
			},
		}
	}

	fn cover(&mut self, region: Region) -> Result<(), InvariantError> {
		for row in region.y..region.bottom() {
			for col in region.x..region.right() {
				let index = row as usize * self.width as usize + col as usize;
				if self.mask[index] {
					return Err(InvariantError::Overlap(region));
				}
				self.mask.set(index, true);
			}
		}
		Ok(())
	}
}

impl Quadtree {
	/// Checks the structural invariants of the tree.
	///
	/// Every node lies inside the image, every split node is exactly tiled
	/// by its four subsections, the leaves cover every pixel exactly once,
	/// and the recorded node count and depth match the tree.
	pub fn verify(&self) -> Result<(), InvariantError> {
		let bounds = Region::new(0, 0, self.width, self.height);
		if let Some(outside) = self.root.nodes().find(|n| !bounds.contains(&n.region())) {
			return Err(InvariantError::OutOfBounds(outside.region()));
		}

		let mut walk = Walk {
			mask: CoverageMask::repeat(false, bounds.area() as usize),
			width: self.width,
			node_count: 0,
			depth: 0,
		};
		walk.visit(&self.root, 0)?;

		let missing = bounds.area() - walk.mask.count_ones() as u64;
		if missing > 0 {
			return Err(InvariantError::Uncovered { missing });
		}
		if walk.node_count != self.node_count() {
			return Err(InvariantError::NodeCount {
				recorded: self.node_count(),
				actual: walk.node_count,
			});
		}
		if walk.depth != self.depth() {
			return Err(InvariantError::Depth { recorded: self.depth(), actual: walk.depth });
		}
		Ok(())
	}
}
