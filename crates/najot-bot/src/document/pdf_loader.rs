//! Page-by-page text extraction from the brochure PDF.
//!
//! Parsing is CPU-bound, so it runs on the blocking pool and never stalls
//! request handlers sharing the runtime.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Text of one PDF page. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// Read `path` and extract the text of every page that has any.
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Vec<Page>> {
    let path = path.as_ref().to_path_buf();
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read PDF file {}", path.display()))?;

    let pages = tokio::task::spawn_blocking(move || extract_pages(&data))
        .await
        .context("PDF extraction task failed")??;

    info!("Loaded {} page(s) from {}", pages.len(), path.display());
    Ok(pages)
}

/// Synchronous extraction over an in-memory PDF.
pub fn extract_pages(data: &[u8]) -> Result<Vec<Page>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| anyhow::anyhow!("Failed to parse PDF: {}", e))?;

    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) if !text.trim().is_empty() => pages.push(Page { number: page_num, text }),
            Ok(_) => debug!("Page {} has no extractable text", page_num),
            Err(e) => debug!("Failed to extract text from page {}: {}", page_num, e),
        }
    }

    if pages.is_empty() {
        anyhow::bail!("PDF contains no extractable text");
    }

    Ok(pages)
}
