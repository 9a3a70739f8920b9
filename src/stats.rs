use std::fmt;
use std::time::Duration;

/// Figures describing one compression run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressionStats {
	/// Size of the input file in bytes.
	pub original_size: u64,
	/// Size of the written output file in bytes.
	pub compressed_size: u64,
	pub depth: usize,
	pub node_count: usize,
	pub elapsed: Duration,
}

impl CompressionStats {
	/// Fraction of the original file size saved, between 0 and 1 for any
	/// output that isn't larger than its input. 0 for an empty input.
	pub fn compression_percentage(&self) -> f64 {
		if self.original_size == 0 {
			return 0.;
		}
		1. - self.compressed_size as f64 / self.original_size as f64
	}
}

/// Formats a byte count as bytes, KB or MB.
pub fn format_size(size: u64) -> String {
	if size < 1024 {
		format!("{} bytes", size)
	} else if size < 1024 * 1024 {
		format!("{:.2} KB", size as f64 / 1024.)
	} else {
		format!("{:.2} MB", size as f64 / (1024. * 1024.))
	}
}

/// Formats a duration as milliseconds below a second, seconds above.
pub fn format_duration(elapsed: Duration) -> String {
	if elapsed.as_millis() < 1000 {
		format!("{} ms", elapsed.as_millis())
	} else {
		format!("{:.2} seconds", elapsed.as_secs_f64())
	}
}

impl fmt::Display for CompressionStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Compression Statistics:")?;
		writeln!(f, "--------------------")?;
		writeln!(f, "Execution time: {}", format_duration(self.elapsed))?;
		writeln!(f, "Original image size: {}", format_size(self.original_size))?;
		writeln!(f, "Compressed image size: {}", format_size(self.compressed_size))?;
		writeln!(f, "Compression percentage: {:.2}%", self.compression_percentage() * 100.)?;
		writeln!(f, "Quadtree depth: {}", self.depth)?;
		write!(f, "Number of nodes: {}", self.node_count)
	}
}
