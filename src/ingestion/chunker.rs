//! Fixed-policy text chunking for document ingestion.

/// Chunking policy: target size and overlap are in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub target_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: 1000,
            overlap: 200,
        }
    }
}

/// Split text into overlapping chunks.
///
/// Each chunk targets `target_size` characters. When a sentence or newline
/// boundary exists past the chunk's midpoint, the cut moves back to the
/// last such boundary; otherwise the chunk is cut at the target size. The
/// next chunk starts `overlap` characters before the previous cut. Chunks
/// that trim to nothing are dropped.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return Vec::new();
    }

    let target = config.target_size.max(1);
    let overlap = config.overlap.min(target.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let hard_end = (start + target).min(total);
        let end = if hard_end < total {
            let midpoint = start + target / 2;
            boundary_before(&chars, midpoint, hard_end).unwrap_or(hard_end)
        } else {
            hard_end
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= total {
            break;
        }
        start = (end.saturating_sub(overlap)).max(start + 1);
    }
    chunks
}

/// Last sentence/newline boundary in `from..to`, as the index one past the
/// boundary character. Sentence enders only count when followed by
/// whitespace (or end of text), so "3.14" does not split.
fn boundary_before(chars: &[char], from: usize, to: usize) -> Option<usize> {
    (from..to).rev().find_map(|i| {
        let c = chars[i];
        if c == '\n' {
            return Some(i + 1);
        }
        if matches!(c, '.' | '!' | '?') {
            let followed_by_space = chars.get(i + 1).map(|n| n.is_whitespace()).unwrap_or(true);
            if followed_by_space {
                return Some(i + 1);
            }
        }
        None
    })
}
