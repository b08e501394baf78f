// prompts.rs

use crate::customization::{ClusterProfile, CustomizationOptions};

pub fn customization_prompt(
    question: &str,
    profile: &ClusterProfile,
    options: &CustomizationOptions,
) -> String {
    let interests = if profile.career_interests.is_empty() {
        "none recorded".to_string()
    } else {
        profile.career_interests.join(", ")
    };

    let gpa = if profile.average_gpa > 0.0 {
        format!("{:.2}", profile.average_gpa)
    } else {
        "unknown".to_string()
    };

    let difficulty = if options.preserve_difficulty {
        "Keep the difficulty, the skills assessed and the expected answer format exactly as in the original question."
    } else {
        "You may adjust the difficulty to suit the group's average GPA, but keep the skills assessed the same."
    };

    let context = if options.include_context {
        "In \"context\", explain in one or two sentences why this framing suits the group."
    } else {
        "Leave \"context\" as an empty string."
    };

    format!(
        r#"You are helping a teacher adapt an exam question for a specific group of students.

STUDENT GROUP PROFILE:
Major: {}
Academic level: {}
Career interests: {}
Average GPA: {}

ORIGINAL QUESTION:
{}

Rewrite the question so its scenario, examples and vocabulary connect to this group's major and
career interests. {}

{}

Respond with a single JSON object and nothing else:
{{"customized_question": "<the rewritten question>", "context": "<short rationale>"}}"#,
        profile.major, profile.academic_level, interests, gpa, question, difficulty, context
    )
}
