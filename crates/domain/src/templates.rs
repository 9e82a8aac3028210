//! Prompt templates for trend extraction and report drafting
//!
//! Templates use `{{name}}` placeholders filled by [`compose_prompt`].

/// Asks for structured trend data derived from the window analysis
pub const TREND_EXTRACTION_TEMPLATE: &str = r#"You are a social media analyst. Below is an analysis of {{post_count}} recent posts from monitored accounts.

## Analysis
{{analysis}}

## Most engaged post
{{most_engaged}}

## Task
Identify the main themes, emerging trends, most mentioned accounts and notable posts.

Respond with ONLY a JSON object matching this exact schema:
{
  "themes": [
    { "name": "theme name", "count": 0, "sentiment": "positive | neutral | negative" }
  ],
  "trends": ["one-sentence trend statement"],
  "top_mentions": ["handle"],
  "notable_posts": ["post id"]
}

Rules:
- Use only information present in the analysis
- If nothing stands out, return empty arrays
"#;

/// Asks for the publishable digest text
pub const DRAFT_REPORT_TEMPLATE: &str = r#"You are {{agent_name}}. {{bio}}

Write a trend report for your followers based on this trend data:
{{trend_data}}

Style: {{style}}

Format rules:
- Start with a short headline line
- Up to 3 sections with a header each, every section at most 3 bullet points
- Each line at most 100 characters
- At most {{max_chars}} characters in total
- At most 2 emojis and at most {{max_hashtags}} hashtags
- No preamble and no commentary, output only the report text
"#;

/// Placeholder used when the window has no notable post
pub const NO_NOTABLE_POSTS: &str = "No notable posts in this window.";

/// Substitute `{{name}}` placeholders. Unknown placeholders are left intact.
pub fn compose_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |prompt, (name, value)| {
        prompt.replace(&format!("{{{{{}}}}}", name), value)
    })
}

/// Extract JSON from a model reply (handles markdown code blocks)
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    // Check for ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    trimmed
}
