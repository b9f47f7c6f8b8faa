//! Packs page text into the summarization prompt.

/// Page text beyond this many characters is dropped before prompting.
pub const MAX_CONTENT_CHARS: usize = 4 * 3200;

pub const CONTENT_SEPARATOR: &str = "The content is as follows: ";

pub const SUMMARY_INSTRUCTIONS: &str = r#"Think step by step and provide a clear, concise, yet comprehensive summary of the provided content. Your task is to distil the content into a structured written format, using markdown for readability and organization.

In your summary, please ensure to:

1. **Include the content's main title**: This will set the context and provide an idea about the content, if available.
2. **Identify and summarize the key points/highlights**: List out the primary points, arguments, discoveries, or themes presented in the content. Consider these as the "need-to-know" points for understanding the content's core message/content.
3. **Provide detail without losing clarity**: After the key points, provide a more detailed summary. Include significant sub-points, illustrative examples, discussions, and any conclusions or implications. Aim for this detailed section to complement and expand on the key points, but ensure it remains digestible and clear.
4. **Structure your summary with markdown**: Use headers for different sections (e.g., Key Points, Detailed Summary), bullet points for listing items, bold or italic text for emphasis, and tables where appropriate.
5. **Capture the content's essence without unnecessary length**: Strive for a balance of detail and brevity. Capture all the necessary information, but avoid overly long sentences and excessive detail.

Remember, the goal is to ensure that someone who reads your summary will gain a complete and accurate understanding of the content, even if they haven't watched it themselves.
If the content includes visual elements crucial to its understanding (like a graph, diagram, or scene description), please describe it briefly within the relevant part of the summary.

Here's a template to guide your summary:
# [title]

## TLDR
(Provide a short summary of the content in a maximum of 3 sentences)

## Key Points/Highlights
- Main Point/Highlight 1
- Main Point/Highlight 2
- ...

## Detailed Summary
(Expand on the key points with sub-points, examples, discussions, conclusions or implications)

## Conclusion
(Any conclusions made in the content, the final thoughts of the speaker, etc.)"#;

/// Keeps the first [`MAX_CONTENT_CHARS`] characters. Cuts mid-word when the limit lands there.
#[must_use]
pub fn truncate_content(raw_text: &str) -> &str {
    match raw_text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((byte_index, _)) => &raw_text[..byte_index],
        None => raw_text,
    }
}

#[must_use]
pub fn build_prompt(raw_text: &str) -> String {
    let content = truncate_content(raw_text);
    let mut prompt =
        String::with_capacity(SUMMARY_INSTRUCTIONS.len() + CONTENT_SEPARATOR.len() + content.len());
    prompt.push_str(SUMMARY_INSTRUCTIONS);
    prompt.push_str(CONTENT_SEPARATOR);
    prompt.push_str(content);
    prompt
}
