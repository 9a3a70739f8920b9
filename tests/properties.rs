use image::{Rgb, RgbImage};

use quadtree_compress::{BuildParams, ErrorMethod, Quadtree, Region};

/// Deterministic, structure-free test image.
fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
	let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
	RgbImage::from_fn(width, height, |_, _| {
		state ^= state << 13;
		state ^= state >> 17;
		state ^= state << 5;
		Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8])
	})
}

/// Smooth gradients with a couple of hard edges.
fn scene(width: u32, height: u32) -> RgbImage {
	RgbImage::from_fn(width, height, |x, y| {
		if x > width / 2 && y > height / 3 {
			Rgb([250, 250, 250])
		} else {
			Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 64) as u8])
		}
	})
}

fn params(method: ErrorMethod, threshold: f64, min_block_size: u32) -> BuildParams {
	BuildParams { method, threshold, min_block_size }
}

/// A threshold that splits a fair bit but not everything.
fn moderate(method: ErrorMethod) -> f64 {
	method.max_error() / 30.
}

#[test]
fn single_pixel_is_one_leaf() {
	let img = RgbImage::from_pixel(1, 1, Rgb([1, 2, 3]));
	for method in ErrorMethod::ALL.iter() {
		for threshold in [1e-9, 1., 1e9].iter() {
			let tree = Quadtree::from_image(&img, &params(*method, *threshold, 1)).unwrap();
			assert_eq!(tree.node_count(), 1);
			assert_eq!(tree.leaf_count(), 1);
			assert_eq!(tree.depth(), 0);
		}
	}
}

#[test]
fn node_count_is_one_plus_four_per_branch() {
	for (ind, img) in [noise(40, 40, 1), noise(33, 17, 2), scene(64, 48)].iter().enumerate() {
		for method in ErrorMethod::ALL.iter() {
			let tree = Quadtree::from_image(img, &params(*method, moderate(*method), 1)).unwrap();
			let leaves = tree.leaf_count();
			let branches = tree.node_count() - leaves;
			assert_eq!(tree.node_count(), 1 + 4 * branches, "image {} with {}", ind, method);
			assert_eq!(tree.root().nodes().count(), tree.node_count());
			assert!(tree.root().nodes().filter(|n| !n.is_leaf())
				.all(|n| n.sections().map(|s| s.len()) == Some(4)));
		}
	}
}

#[test]
fn leaves_tile_the_image() {
	for (width, height) in [(1, 9), (7, 7), (31, 12), (64, 64), (100, 3)].iter() {
		let img = noise(*width, *height, width * 31 + height);
		for method in ErrorMethod::ALL.iter() {
			let tree = Quadtree::from_image(&img, &params(*method, moderate(*method), 1)).unwrap();
			let area: u64 = tree.leaves().map(|l| l.region().area()).sum();
			assert_eq!(area, *width as u64 * *height as u64, "{}x{} with {}", width, height, method);
			tree.verify().unwrap();
		}
	}
}

#[test]
fn whole_and_tiled_rendering_agree() {
	let img = scene(300, 200);
	for method in ErrorMethod::ALL.iter() {
		let tree = Quadtree::from_image(&img, &params(*method, moderate(*method), 3)).unwrap();
		let mut whole = RgbImage::new(300, 200);
		let mut tiled = RgbImage::new(300, 200);
		tree.render_into(&mut whole).unwrap();
		tree.render_tiled_into(&mut tiled, 64).unwrap();
		assert_eq!(whole, tiled, "{}", method);
		assert_eq!(tree.render(), whole);
	}
}

#[test]
fn raising_the_threshold_never_adds_nodes() {
	let img = scene(96, 80);
	for method in ErrorMethod::ALL.iter() {
		let mut previous = usize::MAX;
		for step in 1..=40 {
			let threshold = method.max_error() * step as f64 / 40.;
			let count = Quadtree::from_image(&img, &params(*method, threshold, 2)).unwrap().node_count();
			assert!(count <= previous, "{} at {}: {} > {}", method, threshold, count, previous);
			previous = count;
		}
		assert_eq!(previous, 1, "{} at its maximum error", method);
	}
}

#[test]
fn uniform_four_by_four() {
	let img = RgbImage::from_pixel(4, 4, Rgb([77, 66, 55]));
	for method in ErrorMethod::ALL.iter() {
		let tree = Quadtree::from_image(&img, &params(*method, 1., 1)).unwrap();
		assert_eq!(tree.node_count(), 1);
		assert_eq!(tree.leaf_count(), 1);
		assert_eq!(tree.depth(), 0);
		assert_eq!(tree.root().color(), [77, 66, 55]);
	}
}

#[test]
fn diagonal_four_by_four() {
	let img = RgbImage::from_fn(4, 4, |x, y| if x > y { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
	let tree = Quadtree::from_image(&img, &params(ErrorMethod::Variance, 1., 1)).unwrap();
	assert!(!tree.root().is_leaf());
	assert!(tree.depth() >= 1);
	let area: u64 = tree.leaves().map(|l| l.region().area()).sum();
	assert_eq!(area, 16);
	// Every leaf ends up flat, so the rendering is exact.
	assert_eq!(tree.render(), img);
}

#[test]
fn odd_dimensions_keep_the_last_row_and_column() {
	let img = RgbImage::from_fn(5, 5, |x, y| if x == 4 && y == 4 { Rgb([255; 3]) } else { Rgb([0; 3]) });
	let tree = Quadtree::from_image(&img, &params(ErrorMethod::MaxPixelDifference, 1., 1)).unwrap();
	let rendered = tree.render();
	assert_eq!(rendered.get_pixel(4, 4), &Rgb([255; 3]));
	assert_eq!(rendered, img);
	let last = tree.leaves().last().unwrap().region();
	assert_eq!((last.right(), last.bottom()), (5, 5));
}

#[test]
fn regions_stay_in_bounds() {
	let img = noise(23, 41, 9);
	let bounds = Region::new(0, 0, 23, 41);
	let tree = Quadtree::from_image(&img, &params(ErrorMethod::Entropy, 0.5, 1)).unwrap();
	assert!(tree.root().nodes().all(|n| bounds.contains(&n.region())));
}
