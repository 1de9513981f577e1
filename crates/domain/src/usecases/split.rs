//! Message splitting - breaks a reply into platform-sized chunks

use crate::errors::BotError;
use crate::ports::LengthValidator;

/// Split `text` into chunks that each pass `validator`.
///
/// Text that is already valid comes back untouched as a single chunk.
/// Otherwise chunks are cut at the last whitespace that keeps them valid, or
/// mid-word when no such whitespace exists.
pub fn split_message(
    text: &str,
    validator: &dyn LengthValidator,
) -> Result<Vec<String>, BotError> {
    if is_valid(text, validator)? {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if is_valid(rest, validator)? {
            chunks.push(rest.to_string());
            break;
        }

        let cut = match last_valid_break(rest, validator)? {
            Some(cut) => cut,
            None => longest_valid_prefix(rest, validator)?,
        };

        let (head, tail) = rest.split_at(cut);
        let head = head.trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = tail.trim_start();
    }

    if chunks.is_empty() {
        return Err(BotError::CannotSplitMessage("message is empty".to_string()));
    }

    tracing::debug!(chunks = chunks.len(), "Split reply into chunks");
    Ok(chunks)
}

fn is_valid(text: &str, validator: &dyn LengthValidator) -> Result<bool, BotError> {
    validator
        .validate(text)
        .map_err(|e| BotError::CannotSplitMessage(e.to_string()))
}

/// Byte offset of the last whitespace boundary whose prefix is still valid
fn last_valid_break(text: &str, validator: &dyn LengthValidator) -> Result<Option<usize>, BotError> {
    let mut best = None;
    for (offset, _) in text.char_indices().filter(|(_, c)| c.is_whitespace()) {
        let candidate = text[..offset].trim_end();
        if candidate.is_empty() {
            continue;
        }
        if !is_valid(candidate, validator)? {
            break;
        }
        best = Some(offset);
    }
    Ok(best)
}

/// Byte offset ending the longest valid prefix, cut on a char boundary
fn longest_valid_prefix(text: &str, validator: &dyn LengthValidator) -> Result<usize, BotError> {
    let ends: Vec<usize> = text
        .char_indices()
        .map(|(offset, c)| offset + c.len_utf8())
        .collect();

    // Invariant: prefixes ending at ends[..low] are known valid
    let mut low = 0;
    let mut high = ends.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if is_valid(&text[..ends[mid]], validator)? {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    match low.checked_sub(1) {
        Some(last) => Ok(ends[last]),
        None => Err(BotError::CannotSplitMessage(format!(
            "no valid prefix in {:?}",
            text.chars().next().unwrap_or_default()
        ))),
    }
}
