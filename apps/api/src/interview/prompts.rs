// All LLM prompt constants for the interview module.

/// Interviewer system instruction. Replace `{purpose}` before sending.
pub const INTERVIEWER_SYSTEM_TEMPLATE: &str = "You are an empathetic interview coach conducting a {purpose}. \
    Keep questions short. \
    Analyze the user's answer for content and tone before asking the next question. \
    Ask exactly one question per reply and never answer on the candidate's behalf.";

/// First user turn of every interview chat. Replace `{cv_text}` and `{job_description}`.
pub const CONTEXT_TURN_TEMPLATE: &str = "Start the interview.\n\nContext:\nCV: {cv_text}\nJob Description: {job_description}";

/// Session analysis prompt template.
/// Replace: {purpose}, {cv_text}, {job_description}, {transcript}, {second_person}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze this interview session based on the candidate's CV and Job Description.

Candidate Goal: {purpose}
CV: {cv_text}
Job Description: {job_description}

Interview Transcript:
{transcript}

{second_person}

CATEGORY EVALUATION:
Identify 3-5 key categories relevant to this specific role (e.g. for a manager: Leadership, Communication, Strategy; for a student: Academic Potential, Learning Agility, Fundamentals).
Rate the candidate on each of these categories.

Return a STRICT JSON object:
{
  "score": 0-100,
  "hiringProbability": "High" | "Medium" | "Low",
  "feedback": "Overall concise feedback in markdown bullet points, addressed to 'You'.",
  "categories": [
    { "category": "Communication Skills", "score": 0-100, "feedback": "One sentence of feedback for this category." }
  ],
  "strengths": ["Strength 1", "Strength 2"],
  "improvements": ["Improvement 1", "Improvement 2"],
  "questions": [
    {
      "question": "The question asked by the interviewer",
      "answer": "Summary of your answer, calling out specific mistakes",
      "score": 0-100,
      "feedback": "Specific feedback on this answer",
      "improvement": "How to answer better based on your CV"
    }
  ]
}"#;
