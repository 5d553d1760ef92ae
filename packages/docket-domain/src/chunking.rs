#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
	/// Words per chunk.
	pub chunk_size: usize,
	/// Words shared by consecutive chunks. Must be smaller than `chunk_size`.
	pub chunk_overlap: usize,
}
impl Default for ChunkingConfig {
	fn default() -> Self {
		Self::from(&docket_config::Ingest::default())
	}
}
impl From<&docket_config::Ingest> for ChunkingConfig {
	fn from(cfg: &docket_config::Ingest) -> Self {
		Self { chunk_size: cfg.chunk_size as usize, chunk_overlap: cfg.chunk_overlap as usize }
	}
}

/// Unifies line endings, collapses horizontal whitespace runs, and limits blank lines to one.
pub fn normalize_text(text: &str) -> String {
	let unified = text.replace("\r\n", "\n").replace('\r', "\n");
	let mut out = String::with_capacity(unified.len());
	let mut newlines = 0_usize;
	let mut in_space = false;

	for ch in unified.chars() {
		match ch {
			'\n' => {
				in_space = false;
				newlines += 1;

				if newlines <= 2 {
					out.push('\n');
				}
			},
			' ' | '\t' => {
				newlines = 0;

				if !in_space {
					out.push(' ');
				}

				in_space = true;
			},
			_ => {
				in_space = false;
				newlines = 0;

				out.push(ch);
			},
		}
	}

	out.trim().to_string()
}

/// Splits normalized text into overlapping windows of whitespace-separated words.
///
/// Windows advance by `chunk_size - chunk_overlap` words. The last window ends at the final word.
/// Consecutive windows always share `chunk_overlap` words; the next window never jumps to the end
/// of the previous one.
pub fn split_words(text: &str, cfg: ChunkingConfig) -> Vec<String> {
	let normalized = normalize_text(text);
	let words = normalized.split_whitespace().collect::<Vec<_>>();
	let size = cfg.chunk_size.max(1);
	let stride = size.saturating_sub(cfg.chunk_overlap).max(1);
	let mut chunks = Vec::new();
	let mut start = 0;

	while start < words.len() {
		let end = (start + size).min(words.len());

		chunks.push(words[start..end].join(" "));

		if end == words.len() {
			break;
		}

		start += stride;
	}

	chunks
}
