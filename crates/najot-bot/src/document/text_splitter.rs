//! Recursive character text splitting.
//!
//! Text is cut on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then single characters). Small pieces are merged
//! back into chunks of at most `chunk_size` characters, and each new chunk
//! starts with up to `chunk_overlap` characters carried over from the end of
//! the previous one. All lengths are in characters, never bytes, so
//! multi-byte Uzbek letters (o‘, g‘) are never split.

use super::pdf_loader::Page;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A retrieval unit cut from one page of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitter {
    /// Callers are expected to pass `chunk_overlap < chunk_size`; the overlap
    /// is clamped below the size otherwise.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split each page on its own so no chunk spans a page break.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .map(move |text| Chunk { text, page: page.number })
            })
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small_pieces: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small_pieces.push(piece);
                continue;
            }

            if !small_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&small_pieces));
                small_pieces.clear();
            }

            if remaining.is_empty() {
                if let Some(trimmed) = non_empty_trimmed(piece) {
                    chunks.push(trimmed);
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&small_pieces));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, keeping an overlapping tail.
    ///
    /// Pieces already carry their separator, so they are joined back
    /// without inserting anything between them.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut window_len = 0usize;

        for &piece in pieces {
            let piece_len = char_len(piece);

            if window_len + piece_len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window) {
                    chunks.push(chunk);
                }

                while window_len > self.chunk_overlap
                    || (window_len + piece_len > self.chunk_size && window_len > 0)
                {
                    let (_, dropped_len) = window.remove(0);
                    window_len -= dropped_len;
                }
            }

            window.push((piece, piece_len));
            window_len += piece_len;
        }

        if let Some(chunk) = join_window(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn non_empty_trimmed(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn join_window(window: &[(&str, usize)]) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    non_empty_trimmed(&joined)
}

/// Split `text` on `separator`, attaching each separator to the start of
/// the piece that follows it. An empty separator yields single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, c)| &text[start..start + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}
