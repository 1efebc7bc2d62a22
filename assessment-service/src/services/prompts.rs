//! Prompt text sent to the vision models.

const RESPONSE_SHAPE: &str = r#"{
  "riskLevel": "low" | "moderate" | "high",
  "explanation": string,
  "confidence": number between 0 and 1,
  "findings": string[],
  "recommendations": string[],
  "technicalMetrics": {
    "imageQuality": number 0-100,
    "pupilClarity": number 0-100,
    "lensOpacity": number 0-100,
    "scleraRedness": number 0-10,
    "symmetryScore": number 0-100 (omit if it cannot be judged)
  }
}"#;

const PROGRESSION_SHAPE: &str = r#""progressionAnalysis": {
    "trend": "improving" | "stable" | "worsening" | "inconclusive",
    "summary": string,
    "consistencyScore": number between 0 and 1
  }"#;

const PREAMBLE: &str = "You are assisting with a preliminary, non-diagnostic screening of eye photographs \
taken with a phone or webcam. Look for visible signs such as lens clouding, pupil irregularity, \
redness, discharge or asymmetry. If the photo is too blurry, dark or off-centre to judge, say so, \
lower the confidence and the imageQuality metric accordingly. Always recommend an in-person \
examination by an eye care professional when the risk is moderate or high.";

fn context_lines(age: Option<u32>, notes: Option<&str>) -> String {
    let mut context = String::new();
    if let Some(age) = age {
        context.push_str(&format!("\nSubject age: {}.", age));
    }
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        context.push_str(&format!("\nNotes from the user: {}", notes));
    }
    context
}

/// Prompt for a single photo.
pub fn single_image_prompt(age: Option<u32>, notes: Option<&str>) -> String {
    format!(
        "{}{}\n\nRespond with a single JSON object and nothing else, using exactly this shape:\n{}",
        PREAMBLE,
        context_lines(age, notes),
        RESPONSE_SHAPE
    )
}

/// Prompt for a chronological series of photos of the same eye(s).
pub fn batch_prompt(image_count: usize, age: Option<u32>, notes: Option<&str>) -> String {
    let shape = format!(
        "{},\n  {}\n}}",
        RESPONSE_SHAPE.trim_end_matches('}').trim_end(),
        PROGRESSION_SHAPE
    );
    format!(
        "{}\n\nYou are given {} photos of the same person in chronological order, oldest first. \
Give one combined assessment reflecting the most recent photo, and describe how the visible \
signs change across the series.{}\n\nRespond with a single JSON object and nothing else, using \
exactly this shape:\n{}",
        PREAMBLE,
        image_count,
        context_lines(age, notes),
        shape
    )
}
