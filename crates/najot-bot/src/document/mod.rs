//! Source document handling: PDF text extraction and chunking

pub mod pdf_loader;
pub mod text_splitter;

pub use pdf_loader::{load_pdf, Page};
pub use text_splitter::{Chunk, RecursiveCharacterTextSplitter};
