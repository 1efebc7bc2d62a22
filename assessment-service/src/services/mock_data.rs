//! Canned assessments substituted when the real provider call fails.

use crate::models::{
    Assessment, BatchAssessment, ProgressionAnalysis, RiskLevel, TechnicalMetrics, Trend,
};
use rand::seq::SliceRandom;
use rand::Rng;

pub const MOCK_PROVIDER: &str = "mock";
pub const MOCK_MODEL: &str = "mock-catalogue-v1";

struct MockEntry {
    risk_level: RiskLevel,
    explanation: &'static str,
    confidence: f64,
    findings: &'static [&'static str],
    recommendations: &'static [&'static str],
    metrics: [f64; 4],
    trend: Trend,
    progression: &'static str,
}

const CATALOGUE: &[MockEntry] = &[
    MockEntry {
        risk_level: RiskLevel::Low,
        explanation: "The visible structures of the eye appear clear and symmetric. \
No clouding, irregular pupil shape or notable redness was detected.",
        confidence: 0.82,
        findings: &[
            "Pupil appears round and centred",
            "Lens region appears clear",
            "Minimal scleral redness",
        ],
        recommendations: &[
            "Continue routine eye examinations every one to two years",
            "Retake the photo in good lighting if symptoms change",
        ],
        metrics: [86.0, 88.0, 6.0, 1.0],
        trend: Trend::Stable,
        progression: "No meaningful change is visible across the photos.",
    },
    MockEntry {
        risk_level: RiskLevel::Moderate,
        explanation: "A faint haze is visible over part of the pupil, which can be an early \
sign of lens changes. Image quality limits how confidently this can be judged.",
        confidence: 0.64,
        findings: &[
            "Slight haziness over the pupil",
            "Mild redness near the inner corner",
        ],
        recommendations: &[
            "Schedule a non-urgent examination with an optometrist",
            "Note any glare sensitivity or blurred vision",
        ],
        metrics: [71.0, 58.0, 34.0, 3.5],
        trend: Trend::Stable,
        progression: "The haze looks similar in each photo; no clear progression is visible.",
    },
    MockEntry {
        risk_level: RiskLevel::High,
        explanation: "Pronounced clouding is visible over most of the pupil together with \
reduced pupil clarity. These signs warrant prompt professional evaluation.",
        confidence: 0.77,
        findings: &[
            "Marked opacity over the pupil",
            "Reduced pupil clarity",
            "Visible asymmetry between photos",
        ],
        recommendations: &[
            "Book an eye examination as soon as possible",
            "Seek urgent care if vision loss or pain develops",
        ],
        metrics: [76.0, 31.0, 68.0, 4.0],
        trend: Trend::Worsening,
        progression: "Clouding appears more extensive in the later photos.",
    },
];

fn build(entry: &MockEntry) -> Assessment {
    let [image_quality, pupil_clarity, lens_opacity, sclera_redness] = entry.metrics;
    let mut assessment = Assessment {
        risk_level: entry.risk_level,
        explanation: entry.explanation.to_string(),
        confidence: entry.confidence,
        findings: entry.findings.iter().map(|s| s.to_string()).collect(),
        recommendations: entry.recommendations.iter().map(|s| s.to_string()).collect(),
        technical_metrics: TechnicalMetrics {
            image_quality,
            pupil_clarity,
            lens_opacity,
            sclera_redness,
            symmetry_score: None,
        },
        is_mock_result: true,
        provider: None,
        model: None,
        analyzed_at: None,
    };
    assessment.stamp(MOCK_PROVIDER, MOCK_MODEL, true);
    assessment
}

fn pick<R: Rng + ?Sized>(rng: &mut R) -> &'static MockEntry {
    CATALOGUE.choose(rng).unwrap_or(&CATALOGUE[0])
}

/// A random mock assessment.
pub fn mock_assessment() -> Assessment {
    mock_assessment_with(&mut rand::thread_rng())
}

pub fn mock_assessment_with<R: Rng + ?Sized>(rng: &mut R) -> Assessment {
    build(pick(rng))
}

/// A random mock batch result covering `image_count` images.
pub fn mock_batch_assessment(image_count: usize) -> BatchAssessment {
    mock_batch_assessment_with(&mut rand::thread_rng(), image_count)
}

pub fn mock_batch_assessment_with<R: Rng + ?Sized>(
    rng: &mut R,
    image_count: usize,
) -> BatchAssessment {
    let entry = pick(rng);
    let mut progression_analysis = ProgressionAnalysis {
        trend: entry.trend,
        summary: entry.progression.to_string(),
        consistency_score: 0.7,
        images_analyzed: 0,
    };
    progression_analysis.normalize(image_count);

    BatchAssessment {
        assessment: build(entry),
        progression_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use validator::Validate;

    #[test]
    fn catalogue_covers_every_risk_level() {
        for level in RiskLevel::ALL {
            assert!(CATALOGUE.iter().any(|e| e.risk_level == level));
        }
    }

    #[test]
    fn every_entry_passes_validation() {
        for entry in CATALOGUE {
            let assessment = build(entry);
            assert!(assessment.validate().is_ok());
            assert!(assessment.is_mock_result);
            assert_eq!(assessment.provider.as_deref(), Some(MOCK_PROVIDER));
        }
    }

    #[test]
    fn seeded_selection_is_repeatable() {
        let a = mock_assessment_with(&mut StdRng::seed_from_u64(7));
        let b = mock_assessment_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.risk_level, b.risk_level);
        assert_eq!(a.explanation, b.explanation);
    }

    #[test]
    fn single_image_batch_is_inconclusive() {
        for seed in 0..10 {
            let batch = mock_batch_assessment_with(&mut StdRng::seed_from_u64(seed), 1);
            assert_eq!(batch.progression_analysis.trend, Trend::Inconclusive);
            assert_eq!(batch.progression_analysis.images_analyzed, 1);
            assert!(batch.validate().is_ok());
        }
    }
}
