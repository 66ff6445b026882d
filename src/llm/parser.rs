use crate::error::AdviceGenerationError;
use crate::schema::{AdviceResult, ADVICE_ITEM_COUNT};

/// Removes a surrounding Markdown code fence (```json ... ```) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the info string ("json"), which may share a line with the body
    let body = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim_start();

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Decodes and validates a model response.
///
/// All four fields must be present and both lists must hold exactly
/// [`ADVICE_ITEM_COUNT`] entries. Any failure carries the raw text.
pub fn parse_advice_response(raw: &str) -> std::result::Result<AdviceResult, AdviceGenerationError> {
    let parse_error = |reason: String| AdviceGenerationError::Parse {
        raw_response: raw.to_string(),
        reason,
    };

    let advice: AdviceResult = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| parse_error(format!("invalid advice JSON: {}", e)))?;

    if advice.problem_areas.len() != ADVICE_ITEM_COUNT {
        return Err(parse_error(format!(
            "expected {} problem_areas, got {}",
            ADVICE_ITEM_COUNT,
            advice.problem_areas.len()
        )));
    }

    if advice.recommendations.len() != ADVICE_ITEM_COUNT {
        return Err(parse_error(format!(
            "expected {} recommendations, got {}",
            ADVICE_ITEM_COUNT,
            advice.recommendations.len()
        )));
    }

    Ok(advice)
}
