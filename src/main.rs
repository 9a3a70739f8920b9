use image::error::ImageError;

use quadtree_compress::stats::CompressionStats;
use quadtree_compress::{animation, compress, CompressOptions, ErrorKind, ErrorMethod};

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Exit code and message for an image that couldn't be loaded.
fn image_error_exit(e: ImageError) -> ! {
	let (msg, code) = match e {
		ImageError::Decoding(_) => ("Invalid image data", 4),
		ImageError::Unsupported(_) => ("Unsupported image format", 4),
		ImageError::Limits(_) => ("Computation limits exceeded", 5),
		ImageError::IoError(_) => ("File not found or could not be read", 3),
		_ => ("An error occurred", 10)
	};
	error_exit(msg, code)
}

/// Parses an optional numeric argument, exiting on garbage.
fn numeric_arg<T: std::str::FromStr>(
	matches: &clap::ArgMatches,
	name: &str,
	default: T
) -> T {
	match matches.value_of(name) {
		None => default,
		Some(v) => match v.parse() {
			Ok(n) => n,
			Err(_) => error_exit(&format!("Non-numeric value for {}", name), 2)
		}
	}
}

/// `<dir>/<stem>.compressed.<ext>` for an input of `<dir>/<stem>.<ext>`.
fn default_output(input: &Path) -> PathBuf {
	let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| "output".to_string());
	let ext = input.extension().map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| "png".to_string());
	input.with_file_name(format!("{}.compressed.{}", stem, ext))
}

/// Creates the directory `path` is going to be written into, if it has one.
fn create_parent_dir(path: &Path) -> std::io::Result<()> {
	match path.parent().filter(|p| !p.as_os_str().is_empty()) {
		Some(parent) => fs::create_dir_all(parent),
		None => Ok(()),
	}
}

/// `clap`-based CLI for compressing an image with a quadtree.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 6: internal error (a bug)
///
/// 10: other, potentially unknown error
fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	let clap_matches = clap::App::new("quadtree_compress")
		.version("0.1.0")
		.author("vkcz")
		.about("Compresses an image by averaging the blocks of a quadtree.")
		.arg_from_usage("-m, --method=[METHOD] 'Error measurement method: 1-5 or variance, mad, max-diff, entropy, ssim; defaults to variance'")
		.arg_from_usage("-t, --threshold=[N] 'Error above which blocks are split; defaults to 50'")
		.arg_from_usage("-b, --min-block=[N] 'Minimum block size in pixels; defaults to 4'")
		.arg_from_usage("-r, --ratio=[R] 'Target compression ratio from 0 to 1, overriding the threshold; 0 (the default) disables tuning'")
		.arg_from_usage("-g, --gif=[PATH] 'Also write an animated GIF of the compression process to PATH'")
		.arg_from_usage("<INPUT> 'Path to input image'")
		.arg_from_usage("[OUTPUT] 'Path to output image; defaults to INPUT with .compressed before the extension'")
		.get_matches();

	let method = match clap_matches.value_of("method").unwrap_or("variance").parse::<ErrorMethod>() {
		Ok(m) => m,
		Err(e) => error_exit(&format!("Invalid error method: {}", e), 2)
	};
	let defaults = CompressOptions::default();
	let gif_path = clap_matches.value_of("gif").map(|p| {
		if p.to_ascii_lowercase().ends_with(".gif") { PathBuf::from(p) } else { PathBuf::from(format!("{}.gif", p)) }
	});
	let options = CompressOptions {
		method,
		threshold: numeric_arg(&clap_matches, "threshold", defaults.threshold),
		min_block_size: numeric_arg(&clap_matches, "min-block", defaults.min_block_size),
		target_ratio: numeric_arg(&clap_matches, "ratio", defaults.target_ratio),
		capture: gif_path.is_some(),
	};
	if let Err(e) = options.validate() {
		let (low, high) = method.suggested_range();
		error_exit(&format!("{} (suggested thresholds for {}: {}-{})", e, method, low, high), 2)
	}

	// `INPUT` is required, so `clap` has already checked it is present.
	let input_path = Path::new(clap_matches.value_of("INPUT").unwrap_or_default());
	let source = match image::open(input_path) {
		Ok(i) => i,
		Err(e) => image_error_exit(e)
	}.into_rgb8();
	let original_size = match fs::metadata(input_path) {
		Ok(m) => m.len(),
		Err(_) => error_exit("File not found or could not be read", 3)
	};

	let compressed = match compress(&source, &options) {
		Ok(c) => c,
		Err(e) => {
			let code = match e.kind() {
				ErrorKind::BadInput => 2,
				ErrorKind::Io => 3,
				ErrorKind::Internal => 6,
			};
			error_exit(&e.to_string(), code)
		}
	};
	if let Some(report) = compressed.tuning {
		println!(
			"Threshold tuned to {:.4} (ratio {:.4} after {} trials{})",
			report.threshold,
			report.ratio,
			report.iterations,
			if report.converged { "" } else { ", target not reached" }
		);
	}

	let output_path = clap_matches.value_of("OUTPUT").map(PathBuf::from)
		.unwrap_or_else(|| default_output(input_path));
	if create_parent_dir(&output_path).is_err() {
		error_exit("Could not create output directory", 3)
	}
	if compressed.image.save(&output_path).is_err() {
		error_exit("Could not save output", 3)
	}
	let compressed_size = match fs::metadata(&output_path) {
		Ok(m) => m.len(),
		Err(_) => error_exit("Could not read back output file", 3)
	};

	let stats = CompressionStats {
		original_size,
		compressed_size,
		depth: compressed.depth,
		node_count: compressed.node_count,
		elapsed: compressed.elapsed,
	};
	println!("\n{}", stats);
	println!("Compressed image saved to: {}", output_path.display());

	if let Some(gif_path) = gif_path {
		if compressed.frames.is_empty() {
			eprintln!("No frames were captured; skipping GIF");
			return;
		}
		println!("Creating GIF with {} frames...", compressed.frames.len());
		if create_parent_dir(&gif_path).is_err() {
			error_exit("Could not create GIF output directory", 3)
		}
		let out_fh = match File::create(&gif_path) {
			Ok(f) => f,
			Err(_) => error_exit("Could not open GIF output file", 3)
		};
		match animation::write_gif(&compressed.frames, BufWriter::new(out_fh)) {
			Ok(()) => println!("Compression process GIF saved to: {}", gif_path.display()),
			Err(_) => error_exit("Could not write GIF", 3)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_output_names() {
		assert_eq!(default_output(Path::new("pics/cat.png")), PathBuf::from("pics/cat.compressed.png"));
		assert_eq!(default_output(Path::new("cat")), PathBuf::from("cat.compressed.png"));
	}

	#[test]
	fn parent_dirs_are_created() {
		let root = std::env::temp_dir().join(format!("quadtree_compress_dirs_{}", std::process::id()));
		let gif = root.join("anim").join("deep").join("out.gif");
		create_parent_dir(&gif).unwrap();
		assert!(root.join("anim").join("deep").is_dir());
		// Bare file names have nothing to create.
		create_parent_dir(Path::new("out.gif")).unwrap();
		fs::remove_dir_all(&root).unwrap();
	}
}
