// All LLM prompt constants for the jobs module.

/// Question generation prompt template.
/// Replace: {count}, {purpose}, {cv_text}, {description}, {job_title}, {company}
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Generate {count} highly probable interview questions for this specific role, taking into account the candidate's CV and the job description.

Candidate Context:
- Goal: {purpose}
- CV: {cv_text}

Job/Context Description: {description}
Role Title: {job_title} at {company}

Return a STRICT JSON array:
[
  { "question": "Question text...", "aiExpectedAnswer": "Short hint on what a good answer includes" }
]"#;

/// Practice evaluation prompt template.
/// Replace: {question}, {notes}, {answer}, {second_person}
pub const PRACTICE_PROMPT_TEMPLATE: &str = r#"Evaluate this answer to an interview question.

Question: "{question}"
Candidate's Notes (Context/Plan): "{notes}"
Candidate's Answer (transcribed from audio): "{answer}"

{second_person}

Provide short, specific feedback, a score from 0 to 100, and an improved version of the answer that stays true to what the candidate said.

Return a JSON object:
{ "score": 85, "feedback": "...", "improvedAnswer": "..." }"#;
