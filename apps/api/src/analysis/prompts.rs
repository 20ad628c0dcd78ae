//! Prompt constants and assembly for the gap-analysis flow.
//!
//! `build_analysis_prompt` is a pure function of (role, retrieved chunks,
//! resume) — no model call, fully testable. Oversized inputs are truncated
//! deterministically: the retrieved-context block and the resume are capped
//! independently, cut at a char boundary and suffixed with a marker.

use crate::index::RetrievedChunk;

/// Cap on the concatenated retrieved-postings block.
pub const MAX_CONTEXT_CHARS: usize = 12_000;
/// Cap on the resume text.
pub const MAX_RESUME_CHARS: usize = 8_000;

const TRUNCATION_MARKER: &str = "\n[truncated]";

/// System prompt for the gap-analysis call.
pub const GAP_ANALYSIS_SYSTEM: &str = "\
You are an expert career advisor analyzing the gap between a candidate's \
current skills (from their resume) and what the job market actually asks \
for (from retrieved job postings).

Your analysis framework:

1. HARD SKILLS GAP — compare the technical skills in the resume against \
the requirements in the postings. Be specific: name the missing skill and \
the posting that asks for it, and acknowledge skills that are covered.

2. EXPERIENCE GAP — note mismatches in seniority or years of experience \
between what the postings require and what the resume shows.

3. ACTIONABLE RECOMMENDATIONS — for each gap, suggest a concrete next \
step: a course, a weekend project, or an open-source contribution that \
would plausibly close it. Prioritize the three most important gaps first.

Ground every claim in the supplied postings or the resume — do not invent \
market requirements that are not in the context. If the context notes that \
no market data was available, say so explicitly and fall back to general \
expectations for the role.

Use clear markdown sections. Be encouraging but honest: if the candidate \
is close to qualified, say so.";

/// User prompt template. Placeholders: {role}, {job_context}, {resume}.
pub const GAP_ANALYSIS_PROMPT_TEMPLATE: &str = "\
## Target Role:
{role}

## Relevant Job Postings:
{job_context}

## Candidate Resume:
{resume}

---

Provide a comprehensive skill gap analysis report for this candidate \
targeting the role above, following your analysis framework.";

/// Inserted in place of postings when retrieval came back empty.
pub const NO_MARKET_DATA_NOTE: &str = "\
(No job postings were available in the index for this role. Base the \
analysis on general expectations for the role and state that market data \
was unavailable.)";

/// Assembles the full user prompt. Pure and deterministic.
pub fn build_analysis_prompt(role: &str, retrieved: &[RetrievedChunk], resume: &str) -> String {
    let job_context = if retrieved.is_empty() {
        NO_MARKET_DATA_NOTE.to_string()
    } else {
        let joined = retrieved
            .iter()
            .map(|hit| format!("Source: {}\n\n{}", hit.chunk.source, hit.chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        truncate_chars(&joined, MAX_CONTEXT_CHARS)
    };

    GAP_ANALYSIS_PROMPT_TEMPLATE
        .replace("{role}", role)
        .replace("{job_context}", &job_context)
        .replace("{resume}", &truncate_chars(resume, MAX_RESUME_CHARS))
}

/// Cuts `s` to at most `max` characters (plus marker), at a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            let mut out = s[..idx].to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentChunk;
    use uuid::Uuid;

    fn make_hit(text: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            score: 0.9,
            chunk: DocumentChunk {
                id: Uuid::new_v4(),
                text: text.to_string(),
                source: source.to_string(),
                seq: 0,
            },
        }
    }

    #[test]
    fn test_prompt_contains_role_resume_and_attributed_chunks() {
        let hits = vec![make_hit("Requires Python and Docker experience", "acme.txt")];
        let prompt = build_analysis_prompt("Backend Engineer", &hits, "Skilled in Java");

        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("Skilled in Java"));
        assert!(prompt.contains("Requires Python and Docker experience"));
        assert!(prompt.contains("Source: acme.txt"));
    }

    #[test]
    fn test_empty_retrieval_inserts_no_market_data_note() {
        let prompt = build_analysis_prompt("Backend Engineer", &[], "Skilled in Java");
        assert!(prompt.contains("No job postings were available"));
        assert!(!prompt.contains("Source:"));
    }

    #[test]
    fn test_multiple_chunks_are_separated() {
        let hits = vec![make_hit("First posting", "a.txt"), make_hit("Second posting", "b.txt")];
        let prompt = build_analysis_prompt("Role", &hits, "Resume");
        assert!(prompt.contains("Source: a.txt"));
        assert!(prompt.contains("Source: b.txt"));
        assert!(prompt.contains("\n\n---\n\n"));
    }

    #[test]
    fn test_oversized_resume_is_truncated_deterministically() {
        let resume = "j".repeat(MAX_RESUME_CHARS + 500);
        let prompt_a = build_analysis_prompt("Role", &[], &resume);
        let prompt_b = build_analysis_prompt("Role", &[], &resume);

        assert_eq!(prompt_a, prompt_b);
        assert!(prompt_a.contains("[truncated]"));
        // The full oversized resume must not survive into the prompt.
        assert!(!prompt_a.contains(&resume));
    }

    #[test]
    fn test_oversized_context_is_truncated() {
        let hits = vec![make_hit(&"k".repeat(MAX_CONTEXT_CHARS + 100), "big.txt")];
        let prompt = build_analysis_prompt("Role", &hits, "Resume");
        assert!(prompt.contains("[truncated]"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "héllo wörld".repeat(100);
        let out = truncate_chars(&s, 500);
        assert!(out.chars().count() <= 500 + TRUNCATION_MARKER.chars().count());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_short_input_is_untouched() {
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
