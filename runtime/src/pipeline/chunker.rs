use crate::config::ChunkConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position in the document.
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub context_header: Option<String>,
}

impl Chunk {
    /// Text sent to the model, prefixed with the context header when present.
    pub fn body(&self) -> String {
        match self.context_header.as_deref() {
            Some(header) => format!("{header}\n----\n{}", self.text),
            None => self.text.clone(),
        }
    }
}

pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Vec<String>;
}

#[derive(Debug, Default, Clone)]
pub struct CharWindowChunker;

impl Chunker for CharWindowChunker {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Vec<String> {
        chunk_text(content, config.max_chars, config.overlap_chars)
    }
}

/// Splits `text` into windows of at most `max_chars` characters where each
/// window after the first starts `overlap_chars` before the previous end.
pub fn chunk_text(text: &str, max_chars: i64, overlap_chars: i64) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    if max_chars <= 0 {
        return vec![text.to_string()];
    }

    let max_chars = max_chars as usize;
    let overlap_chars = overlap_chars.max(0) as usize;

    // byte offset of every char boundary, plus the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let text_len = boundaries.len() - 1;

    if text_len <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < text_len {
        let end = (start + max_chars).min(text_len);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end >= text_len {
            break;
        }
        let next_start = end.saturating_sub(overlap_chars);
        start = if next_start <= start { end } else { next_start };
    }
    chunks
}

/// Wraps raw chunk texts into ordered [`Chunk`]s sharing one context header.
pub fn into_chunks(texts: Vec<String>, context_header: Option<&str>) -> Vec<Chunk> {
    let total = texts.len();
    texts
        .into_iter()
        .enumerate()
        .map(|(position, text)| Chunk {
            index: position + 1,
            total,
            text,
            context_header: context_header.map(str::to_string),
        })
        .collect()
}
