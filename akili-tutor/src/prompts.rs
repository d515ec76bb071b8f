/// Prompt construction
///
/// Every pipeline builds its domain prompt here. [`assemble`] adds the
/// shared instructions (system prompt, JSON-only output, LaTeX rules for
/// STEM subjects) once, before the prompt enters the tier cascade, so every
/// tier receives exactly the same text.

/// Subject fragments that switch on LaTeX formatting rules
const STEM_KEYWORDS: &[&str] = &[
    "math",
    "physics",
    "chemistry",
    "biology",
    "science",
    "drawing",
    "economics",
    "account",
    "calculat",
    "sets",
];

pub const JSON_INSTRUCTION: &str = "\nYour output MUST be a single, valid, raw JSON object.";

pub const LATEX_INSTRUCTION: &str = concat!(
    "\n\nIMPORTANT FORMATTING RULE FOR MATH/SCIENCE:",
    "\n1. You must use LaTeX for all mathematical expressions.",
    "\n2. JSON ESCAPING RULES (Follow Strictly):",
    "\n   - USE DOUBLE BACKSLASHES for commands: Write '\\\\frac{1}{2}' (not \\frac).",
    "\n   - FOR SETS: You must escape curly braces.",
    "\n     Write: '$\\\\{ 1, 2, 3 \\\\}$' to display {1, 2, 3}.",
    "\n     Write: '$\\\\{ x | x > 5 \\\\}$' for set builder notation.",
    "\n   - FOR TEXT INSIDE MATH: Write '\\\\text{...}' (exactly two backslashes).",
    "\n   - DO NOT write '\\\\\\\\text' (four backslashes) or it will break.",
);

/// Longest syllabus excerpt embedded in a prompt, in characters
pub const SYLLABUS_EXCERPT_CHARS: usize = 500;

/// Whether a subject needs mathematical notation
pub fn needs_latex(subject: Option<&str>) -> bool {
    let Some(subject) = subject else {
        return false;
    };
    let subject = subject.to_lowercase();
    STEM_KEYWORDS.iter().any(|keyword| subject.contains(keyword))
}

/// Final prompt text: `system + json + latex + "\n\n" + prompt`
pub fn assemble(
    system_prompt: Option<&str>,
    prompt: &str,
    wants_json: bool,
    subject_hint: Option<&str>,
) -> String {
    let mut full = String::with_capacity(prompt.len() + 1024);
    if let Some(system) = system_prompt {
        full.push_str(system);
    }
    if wants_json {
        full.push_str(JSON_INSTRUCTION);
    }
    if needs_latex(subject_hint) {
        full.push_str(LATEX_INSTRUCTION);
    }
    full.push_str("\n\n");
    full.push_str(prompt);
    full
}

/// First `max_chars` characters of `text`, cut on a char boundary
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Asks for exactly `count` modules wrapped as `{"modules": [...]}`
pub fn module_list(subject: &str, context: &str, overview: &str, syllabus: &str, count: usize) -> String {
    format!(
        r#"You are an expert Nigerian education curriculum planner. Generate a structured
study plan consisting of EXACTLY {count} modules for a student studying {subject}
({context}).

Curriculum overview:
{overview}

Syllabus reference:
{syllabus}

Return a JSON object with a single key "modules" holding a list of {count} objects.
Each object must have two keys: "title" (a concise module title) and "topic"
(a single specific syllabus topic covered by the module). Order the modules
from foundational to advanced.

Example:
{{"modules": [
  {{"title": "Introduction to Linear Motion", "topic": "Uniform acceleration and deceleration"}}
]}}"#,
        syllabus = excerpt(syllabus, SYLLABUS_EXCERPT_CHARS),
    )
}

/// Asks for a Markdown lesson on one module
pub fn lesson(subject: &str, context: &str, module_title: &str, topic: &str) -> String {
    format!(
        r#"You are an experienced Nigerian secondary-school {subject} teacher preparing
students for {context}. Write a complete lesson for the module "{module_title}",
covering the syllabus topic "{topic}".

Write in Markdown. Structure the lesson as:
1. A short introduction explaining why the topic matters.
2. Clear explanations of each key concept with headings.
3. At least two worked examples, step by step.
4. Common mistakes students make.
5. A brief summary of the key points.

Use examples relevant to Nigerian students. Do not include raw HTML."#
    )
}

/// Asks for `count` MCQs on one module wrapped as `{"questions": [...]}`
pub fn quiz(subject: &str, context: &str, module_title: &str, topic: &str, count: usize) -> String {
    format!(
        r#"You are an expert Nigerian education assessor. Generate a quiz consisting
of EXACTLY {count} multiple-choice questions for the subject "{subject}" ({context}),
focusing on the module "{module_title}" and the topic "{topic}".

Return a JSON object with a single key "questions" holding a list of {count} objects.
Use only the keys: "question_text", "choices" (list of exactly 4 strings),
"correct_index" (integer 0-3) and "explanation".

Example:
{{"questions": [
  {{"question_text": "A car accelerates at 2 m/s^2 for 5 s from rest. What is its final velocity?",
    "choices": ["10 m/s", "2.5 m/s", "15 m/s", "20 m/s"],
    "correct_index": 0,
    "explanation": "v = u + at = 0 + 2 x 5 = 10 m/s."}}
]}}"#
    )
}

/// Asks for a course-wide mock exam covering `topics`
pub fn exam(subject: &str, context: &str, topics: &[String], syllabus: &str, count: usize) -> String {
    let topics = if topics.is_empty() {
        subject.to_string()
    } else {
        topics.join(", ")
    };

    format!(
        r#"You are an expert Nigerian exam creator. Generate EXACTLY {count} multiple-choice
questions for a {context} {subject} mock exam.

Cover these course topics comprehensively: {topics}

STRICT REQUIREMENTS:
1. Return ONLY a JSON object of the form
   {{"questions": [{{"question": "...", "options": ["...", "...", "...", "..."], "correct_index": 0, "explanation": "..."}}]}}
2. Each question MUST have exactly 4 options.
3. "correct_index" MUST be an integer from 0 to 3.
4. Mix difficulty levels (easy, medium, hard) and spread questions across the topics.
5. NO markdown formatting, NO code blocks, NO extra text.

Syllabus reference:
{syllabus}"#,
        syllabus = excerpt(syllabus, SYLLABUS_EXCERPT_CHARS),
    )
}

/// Review prompt for the content validator
pub fn review(content: &str) -> String {
    format!(
        r#"You are a university professor. Review the following lesson content for accuracy.

Respond with ONLY 'OK' if the content is correct.
If errors are found, respond with the full corrected content and nothing else.

Content to review:
{content}"#
    )
}
