//! Prompt assembly

use crate::types::RetrievedChunk;

pub(crate) const NO_CONTEXT: &str = "No relevant documents were found.";

/// Render retrieved chunks as numbered, attributed context blocks
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut source = format!("{} ({})", chunk.source_file, chunk.repository);
            if let Some(page) = chunk.page {
                source.push_str(&format!(", page {}", page));
            }
            format!("[{}] {}\n{}", i + 1, source, chunk.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Combine context and question into the model prompt
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        r#"Context information is below, surrounded by ---------------------

---------------------
{context}
---------------------

Given the context and not prior knowledge, answer the question.
If the answer is not in the context, say that you cannot answer it.

Question: {question}

Answer:"#
    )
}
