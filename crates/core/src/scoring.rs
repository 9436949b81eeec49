//! Recommendation scoring over generated candidates.
//!
//! Scores are additive and favour mid-sized, moderately branched diagrams.
//! Ties go to the candidate seen first.

use crate::candidate::GeneratedCandidate;
use crate::metrics::StructuralMetrics;
use crate::tier::ComplexityTier;

fn tier_points(tier: ComplexityTier) -> i32 {
    match tier {
        ComplexityTier::Intermediate => 30,
        ComplexityTier::Basic => 20,
        ComplexityTier::Advanced => 10,
    }
}

fn metric_points(m: &StructuralMetrics) -> i32 {
    let mut score = 0;

    score += match m.task_count {
        3..=12 => 25,
        13..=20 => 15,
        n if n > 20 => 5,
        _ => 0,
    };

    score += match m.decision_points {
        0 => 0,
        1..=3 => 15,
        _ => 5,
    };

    score += match m.parallel_branches {
        0 => 0,
        1..=2 => 10,
        _ => 4,
    };

    if m.error_handlers > 0 {
        score += 10;
    }

    score += match m.estimated_paths {
        2..=5 => 15,
        6..=10 => 8,
        n if n > 10 => 3,
        _ => 0,
    };

    if m.task_count < 2 {
        score -= 20;
    }
    if m.task_count > 25 {
        score -= 15;
    }

    score
}

/// Score a single candidate.
pub fn score_candidate(candidate: &GeneratedCandidate) -> i32 {
    tier_points(candidate.complexity_tier) + metric_points(&candidate.metrics)
}

/// The highest-scoring candidate, or `None` for an empty list.
pub fn recommend(candidates: &[GeneratedCandidate]) -> Option<&GeneratedCandidate> {
    let mut best: Option<(&GeneratedCandidate, i32)> = None;
    for c in candidates {
        let score = score_candidate(c);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((c, score)),
        }
    }
    best.map(|(c, _)| c)
}

/// All candidates with their scores, best first. Equal scores keep input order.
pub fn rank(candidates: &[GeneratedCandidate]) -> Vec<(&GeneratedCandidate, i32)> {
    let mut ranked: Vec<_> = candidates.iter().map(|c| (c, score_candidate(c))).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}
