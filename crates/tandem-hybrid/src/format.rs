//! Human-readable rendering of retrieval output.

use tandem_core::types::Chunk;

/// Render chunks as numbered citations with source and page headers.
///
/// The 1-indexed page shift happens here and nowhere else; chunks
/// without a page omit the page marker.
pub fn format_results(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return "No matching passages found.".to_string();
    }

    let mut out = format!("Found {} matching passages:\n", chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let source = chunk.metadata.source_file.as_deref().unwrap_or("unknown");
        out.push_str(&format!("\n[{}] source: {}", i + 1, source));
        if let Some(page) = chunk.metadata.display_page() {
            out.push_str(&format!(" (page {})", page));
        }
        out.push_str(&format!("\n{}\n", chunk.content.trim()));
    }
    out
}
