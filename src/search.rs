//! One-parameter-at-a-time validation sweep over β₁, β₃ and λ.
//!
//! Every candidate replaces a single value of the base parameters while the
//! support set and its coefficients stay fixed. Candidates are scored on the
//! whole validation set with `(mean s_a + mean s_o) / 2` and each family
//! keeps its best value independently, so the sweep costs the sum of the
//! candidate counts instead of their product.
use crate::error::{CosegError, Result};
use crate::gram::Betas;
use crate::graphcut::{segment, MaxFlowSolver};
use crate::image::Mask;
use crate::metrics::Accuracy;
use crate::parallel::{run_tasks, task_error};
use crate::potentials::SupportModel;
use crate::training::Sample;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Parameters of the segmentation stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentParams {
    pub betas: Betas,
    pub lambda: f64,
}

impl SegmentParams {
    /// Copy with the `family` value replaced by `value`.
    pub fn with(&self, family: Family, value: f64) -> Self {
        match family {
            Family::Beta1 => Self {
                betas: self.betas.with_beta1(value),
                ..*self
            },
            Family::Beta3 => Self {
                betas: self.betas.with_beta3(value),
                ..*self
            },
            Family::Lambda => Self {
                lambda: value,
                ..*self
            },
        }
    }
}

/// Swept parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Beta1,
    Beta3,
    Lambda,
}

/// Candidate values per family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCandidates {
    pub beta1: Vec<f64>,
    pub beta3: Vec<f64>,
    pub lambda: Vec<f64>,
}

impl Default for SearchCandidates {
    fn default() -> Self {
        Self {
            beta1: vec![0.1, 0.2, 0.3],
            beta3: vec![0.01, 0.05, 0.1],
            lambda: vec![0.1, 0.2],
        }
    }
}

impl SearchCandidates {
    /// `(family, value)` tasks in family order, then candidate order.
    pub fn tasks(&self) -> Vec<(Family, f64)> {
        let fam = |f: Family, vals: &[f64]| vals.iter().map(move |&v| (f, v)).collect::<Vec<_>>();
        let mut out = fam(Family::Beta1, &self.beta1);
        out.extend(fam(Family::Beta3, &self.beta3));
        out.extend(fam(Family::Lambda, &self.lambda));
        out
    }

    pub fn len(&self) -> usize {
        self.beta1.len() + self.beta3.len() + self.lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validation result of one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub family: Family,
    pub value: f64,
    pub accuracy: Accuracy,
    pub score: f64,
}

/// All candidate scores and the per-family winners merged into one setting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub candidates: Vec<CandidateScore>,
    pub selected: SegmentParams,
}

impl SearchOutcome {
    /// Best-scoring candidate of `family`; the earliest wins ties.
    pub fn best(&self, family: Family) -> Option<&CandidateScore> {
        self.candidates
            .iter()
            .filter(|c| c.family == family)
            .fold(None, |best: Option<&CandidateScore>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }
}

/// Segment one sample's image with `params`.
pub fn segment_sample(
    model: &SupportModel<'_>,
    sample: &Sample,
    params: &SegmentParams,
    solver: &dyn MaxFlowSolver,
) -> Result<Mask> {
    let unary = model.unary_potentials(&sample.image, params.betas)?;
    segment(&sample.image, &unary, params.lambda, solver)
}

/// Per-image accuracies of `params` on `samples`.
pub fn evaluate(
    model: &SupportModel<'_>,
    samples: &[Sample],
    params: &SegmentParams,
    solver: &dyn MaxFlowSolver,
) -> Result<Vec<Accuracy>> {
    samples
        .iter()
        .map(|s| {
            let pred = segment_sample(model, s, params, solver)?;
            Accuracy::measure(&pred, &s.mask, &s.labeled)
        })
        .collect()
}

/// Score every candidate on `validation` and pick the best value per family.
///
/// Candidates run on a pool of `workers` threads; one failing candidate
/// fails the whole sweep.
pub fn cross_validate(
    model: &SupportModel<'_>,
    validation: &[Sample],
    base: SegmentParams,
    candidates: &SearchCandidates,
    solver: &dyn MaxFlowSolver,
    workers: usize,
) -> Result<SearchOutcome> {
    if validation.is_empty() {
        return Err(CosegError::Dataset("validation set is empty".to_string()));
    }
    let tasks = candidates.tasks();
    let scores = run_tasks(workers, &tasks, |&(family, value)| {
        let params = base.with(family, value);
        let per_image = evaluate(model, validation, &params, solver)
            .map_err(|e| task_error(format!("{family:?}={value}"), e))?;
        let accuracy = Accuracy::mean(&per_image);
        debug!(
            "candidate {family:?}={value}: s_a={:.4} s_o={:.4}",
            accuracy.pixel, accuracy.overlap
        );
        Ok(CandidateScore {
            family,
            value,
            accuracy,
            score: accuracy.score(),
        })
    })?;

    let mut outcome = SearchOutcome {
        candidates: scores,
        selected: base,
    };
    for family in [Family::Beta1, Family::Beta3, Family::Lambda] {
        if let Some(best) = outcome.best(family) {
            outcome.selected = outcome.selected.with(family, best.value);
        }
    }
    info!(
        "selected beta1={} beta3={} lambda={} over {} candidates",
        outcome.selected.betas.beta1,
        outcome.selected.betas.beta3,
        outcome.selected.lambda,
        tasks.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(family: Family, value: f64, score: f64) -> CandidateScore {
        CandidateScore {
            family,
            value,
            accuracy: Accuracy {
                pixel: score,
                overlap: score,
            },
            score,
        }
    }

    #[test]
    fn tasks_follow_family_order() {
        let c = SearchCandidates::default();
        let tasks = c.tasks();
        assert_eq!(tasks.len(), 8);
        assert_eq!(tasks[0], (Family::Beta1, 0.1));
        assert_eq!(tasks[3], (Family::Beta3, 0.01));
        assert_eq!(tasks[7], (Family::Lambda, 0.2));
    }

    #[test]
    fn best_keeps_earliest_on_ties() {
        let outcome = SearchOutcome {
            candidates: vec![
                score(Family::Beta1, 0.1, 0.5),
                score(Family::Beta1, 0.2, 0.7),
                score(Family::Beta1, 0.3, 0.7),
                score(Family::Lambda, 0.1, 0.2),
            ],
            selected: SegmentParams {
                betas: Betas::new(0.2, 1.0, 0.1),
                lambda: 0.24,
            },
        };
        assert_eq!(outcome.best(Family::Beta1).map(|c| c.value), Some(0.2));
        assert_eq!(outcome.best(Family::Lambda).map(|c| c.value), Some(0.1));
        assert!(outcome.best(Family::Beta3).is_none());
    }

    #[test]
    fn with_replaces_a_single_value() {
        let base = SegmentParams {
            betas: Betas::new(0.2, 1.0, 0.16),
            lambda: 0.24,
        };
        let p = base.with(Family::Lambda, 0.1);
        assert_eq!(p.lambda, 0.1);
        assert_eq!(p.betas, base.betas);
        let p = base.with(Family::Beta3, 0.05);
        assert_eq!(p.betas, Betas::new(0.2, 1.0, 0.05));
        assert_eq!(p.lambda, 0.24);
    }
}
