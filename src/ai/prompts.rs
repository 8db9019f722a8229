//! Prompt templates for commit message generation.

use crate::ai::GenerationOptions;

/// Fixed instructions shared by every request.
const BASE_INSTRUCTIONS: &str = r#"You are an expert software engineer writing git commit messages. You will receive the diff of a single commit and must respond with one commit message for it.

Analysis rules:
1. Read the diff content to understand what actually changed
   - Look at lines with + (added) and - (removed) to see exactly what changed
   - Identify new functions, modified logic, added features, bug fixes, etc.
   - Focus on WHAT the code does, not WHERE it lives
2. Use conventional commit format: <type>(<scope>): <description>
   with types feat, fix, docs, style, refactor, test, chore, build, ci, perf
3. Use imperative mood ("add feature" not "added feature")
4. Use lowercase for the description and no trailing period
5. Keep the subject line under 72 characters
6. If the diff is empty (binary-only change), describe the commit as a binary or asset update

Respond with ONLY the commit message text. No surrounding quotes, no markdown fences, no commentary."#;

/// Builds the system prompt for the given generation options.
pub fn system_prompt(options: &GenerationOptions) -> String {
    let mut prompt = String::from(BASE_INSTRUCTIONS);

    if options.emoji {
        prompt.push_str(
            "\n\nPrefix the subject line with a single GitMoji matching the change type \
             (for example \u{1f41b} for a bug fix, ✨ for a feature).",
        );
    }

    if options.describe {
        prompt.push_str(
            "\n\nAfter the subject line, add a blank line and a short body (1-3 sentences) \
             explaining what changed and why.",
        );
    } else {
        prompt.push_str("\n\nRespond with the subject line only, no body.");
    }

    if !options.language.eq_ignore_ascii_case("english") {
        prompt.push_str(&format!(
            "\n\nWrite the entire message in {}.",
            options.language
        ));
    }

    prompt
}

/// Builds the user prompt wrapping a single commit diff.
pub fn user_prompt(diff: &str) -> String {
    format!("Write a commit message for this diff:\n\n```diff\n{}\n```", diff)
}
