use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use quadtree_compress::{BuildParams, ErrorMethod, Quadtree};

fn scene() -> RgbImage {
	RgbImage::from_fn(512, 512, |x, y| {
		if (x / 64 + y / 64) % 3 == 0 {
			Rgb([200, 40, 40])
		} else {
			Rgb([(x / 2) as u8, (y / 2) as u8, ((x ^ y) & 0xff) as u8])
		}
	})
}

fn criterion_benchmark(c: &mut Criterion) {
	let img = scene();

	for method in ErrorMethod::ALL.iter() {
		let params = BuildParams {
			method: *method,
			threshold: method.max_error() / 50.,
			min_block_size: 4,
		};
		c.bench_function(&format!("build 512x512 {}", method), |b| {
			b.iter(|| Quadtree::from_image(black_box(&img), &params))
		});
	}

	let tree = Quadtree::from_image(&img, &BuildParams {
		method: ErrorMethod::Variance,
		threshold: 100.,
		min_block_size: 1,
	}).unwrap();
	c.bench_function("render 512x512", |b| b.iter(|| black_box(&tree).render()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
