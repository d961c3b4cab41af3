// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps extraction verbatim instead of generative.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Copy values from the supplied text. Do NOT infer, summarize, \
    or invent details that are not present in the text.";
