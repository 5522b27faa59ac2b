//! Loading documents and splitting them into overlapping chunks for retrieval.

use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use log::{info, warn};
use text_splitter::{ChunkConfig, TextSplitter};

/// Extensions [load_documents] understands.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// A loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// A fragment of a document. `start` is the byte offset of `text` in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub start: usize,
    pub text: String,
}

/// Split a document into chunks of at most `chunk_size` characters, consecutive chunks sharing up to
/// `chunk_overlap` characters. Splits prefer paragraph, then line, then word boundaries.
pub fn split_document(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    let config = ChunkConfig::new(chunk_size).with_overlap(chunk_overlap)?;
    let splitter = TextSplitter::new(config);
    Ok(splitter
        .chunk_indices(&document.text)
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(start, text)| Chunk {
            source: document.source.clone(),
            start,
            text: text.to_string(),
        })
        .collect())
}

/// Split many documents with the same settings.
pub fn split_documents(documents: &[Document], chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(split_document(document, chunk_size, chunk_overlap)?);
    }
    Ok(chunks)
}

/// Load every supported document in a folder, in file name order. Unsupported or unreadable files are skipped.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("failed to read folder {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            warn!("skipping unsupported file {}", path.display());
            continue;
        }
        match Document::load(&path) {
            Ok(document) => {
                info!("Successfully loaded: {}", path.display());
                documents.push(document);
            }
            Err(e) => warn!("Error loading {}: {:#}", path.display(), e),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod test_splitter {
    use std::fs;
    use super::{load_documents, split_document, Document};

    #[test]
    fn test_chunks_respect_size_and_offsets() {
        let text = "Rust is a language. ".repeat(40);
        let document = Document::new("notes.txt", text.as_str());
        let chunks = split_document(&document, 100, 10).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
            assert_eq!(chunk.text, &text[chunk.start..chunk.start + chunk.text.len()]);
            assert_eq!("notes.txt", chunk.source);
        }
    }

    #[test]
    fn test_overlap_larger_than_size_is_rejected() {
        let document = Document::new("a", "text");
        assert!(split_document(&document, 10, 20).is_err());
    }

    #[test]
    fn test_load_documents_skips_unsupported() {
        let dir = std::env::temp_dir().join(format!("promptbook-splitter-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b.md"), "# B").unwrap();
        fs::write(dir.join("a.txt"), "A").unwrap();
        fs::write(dir.join("c.pdf"), "binary").unwrap();

        let documents = load_documents(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(2, documents.len());
        assert_eq!("A", documents[0].text);
        assert_eq!("# B", documents[1].text);
    }
}
