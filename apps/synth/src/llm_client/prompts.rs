// Shared prompt fragments.
// Stage-specific templates live in generation::prompts; this file holds the
// pieces several templates append.

/// Prompt sent once at startup to confirm the server answers.
pub const CONNECTIVITY_PROBE: &str = "test";

/// Appended to prompts whose whole answer is used verbatim.
pub const PLAIN_TEXT_INSTRUCTION: &str = "Write ONLY the requested text, nothing else. \
    No headings, no introduction, no closing remarks.";

/// Appended to prompts whose answer is parsed as a JSON object.
pub const JSON_OBJECT_INSTRUCTION: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";
