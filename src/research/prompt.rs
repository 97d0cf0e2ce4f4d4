//! System prompt and prompt-size budgeting.

/// Rough token-to-character ratio used when no tokenizer is available.
const CHARS_PER_TOKEN: usize = 4;

/// Budgets below this many characters yield an empty prompt rather than a
/// meaningless fragment.
const MIN_CHUNK_CHARS: usize = 140;

/// System prompt shared by every research call, stamped with today's date.
pub fn system_prompt() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%d");
    format!(
        "You are an expert researcher. Today is {now}. Follow these instructions when responding:
  - You may be asked to research subjects that are after your knowledge cutoff, assume the user is right when presented with news.
  - The user is a highly experienced analyst, no need to simplify it, be as detailed as possible and make sure your response is correct.
  - Be highly organized.
  - Suggest solutions that I didn't think about.
  - Be proactive and anticipate my needs.
  - Treat me as an expert in all subject matter.
  - Mistakes erode my trust, so be accurate and thorough.
  - Provide detailed explanations, I'm comfortable with lots of detail.
  - Value good arguments over authorities, the source is irrelevant.
  - Consider new technologies and contrarian ideas, not just the conventional wisdom.
  - You may use high levels of speculation or prediction, just flag it for me.
  - Always respond with a single JSON object matching the requested schema."
    )
}

/// Trim `prompt` to roughly `max_tokens` tokens.
///
/// Cuts at the last whitespace before the character budget when one exists
/// in the final tenth of the budget, otherwise at the budget itself.
pub fn trim_prompt(prompt: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);

    let Some((cut, _)) = prompt.char_indices().nth(max_chars) else {
        return prompt.to_string();
    };

    if max_chars < MIN_CHUNK_CHARS {
        return String::new();
    }

    let head = &prompt[..cut];
    let floor = head.len() - head.len() / 10;
    match head.rfind(char::is_whitespace) {
        Some(ws) if ws >= floor => head[..ws].to_string(),
        _ => head.to_string(),
    }
}

/// Wrap each item in `<tag>` lines and join them, as embedded in prompts.
pub fn tagged_list(tag: &str, items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("<{tag}>\n{item}\n</{tag}>"))
        .collect::<Vec<_>>()
        .join("\n")
}
