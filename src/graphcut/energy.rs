//! Contrast-sensitive grid energy and its minimization by min cut.
//!
//! Every pixel is linked to its right, bottom and bottom-right neighbors.
//! An edge between pixels of RGB distance `d` carries
//! `λ·exp(−d / (2σ_c²))`, the diagonal one additionally scaled by `1/√2`,
//! where `σ_c` is the image's mean neighbor distance. Terminal links take
//! the unary potentials: `source → p` gets `back[p]` and `p → sink` gets
//! `fore[p]`, so a pixel ends on the sink side (foreground) when its
//! foreground evidence outweighs the background one.
use super::maxflow::{FlowGraph, MaxFlowSolver};
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::image::{ImageView, Mask, PixelMap, RgbImage};
use crate::potentials::UnaryPotentials;
use log::debug;
use std::f64::consts::FRAC_1_SQRT_2;

#[inline]
fn rgb_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let d: f64 = (0..3)
        .map(|c| {
            let v = a[c] as f64 - b[c] as f64;
            v * v
        })
        .sum();
    d.sqrt()
}

/// Mean RGB distance over all right, bottom and bottom-right pixel pairs.
///
/// Zero for an image without neighbor pairs.
pub fn mean_neighbor_distance(image: &RgbImage) -> f64 {
    let (w, h) = image.shape();
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            let p = image.get(x, y);
            if x + 1 < w {
                sum += rgb_distance(p, image.get(x + 1, y));
                count += 1;
            }
            if y + 1 < h {
                sum += rgb_distance(p, image.get(x, y + 1));
                count += 1;
            }
            if x + 1 < w && y + 1 < h {
                sum += rgb_distance(p, image.get(x + 1, y + 1));
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Pairwise weights stored at the edge's top-left endpoint.
///
/// `right[p]` links `p` to `p + 1`, `down[p]` to `p + w` and `diag[p]` to
/// `p + w + 1`; entries without a neighbor stay zero.
#[derive(Clone, Debug)]
pub struct EdgeWeights {
    pub right: PixelMap,
    pub down: PixelMap,
    pub diag: PixelMap,
    /// Contrast normalizer `σ_c` the weights were computed with.
    pub sigma: f64,
}

impl EdgeWeights {
    pub fn compute(image: &RgbImage, lambda: f64) -> Result<Self> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(CosegError::InvalidEnergy(format!(
                "lambda={lambda} must be finite and non-negative"
            )));
        }
        let (w, h) = image.shape();
        let sigma = mean_neighbor_distance(image);
        let denom = 2.0 * sigma * sigma;
        let weight = |d: f64| {
            if denom > 0.0 {
                lambda * (-d / denom).exp()
            } else if d == 0.0 {
                lambda
            } else {
                0.0
            }
        };

        let mut right = PixelMap::new(w, h);
        let mut down = PixelMap::new(w, h);
        let mut diag = PixelMap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let p = image.get(x, y);
                if x + 1 < w {
                    right.set(x, y, weight(rgb_distance(p, image.get(x + 1, y))));
                }
                if y + 1 < h {
                    down.set(x, y, weight(rgb_distance(p, image.get(x, y + 1))));
                }
                if x + 1 < w && y + 1 < h {
                    let d = rgb_distance(p, image.get(x + 1, y + 1));
                    diag.set(x, y, FRAC_1_SQRT_2 * weight(d));
                }
            }
        }
        Ok(Self {
            right,
            down,
            diag,
            sigma,
        })
    }
}

/// Grid graph of `image` with `unary` terminal links and pairwise weights.
pub fn build_graph(image: &RgbImage, unary: &UnaryPotentials, lambda: f64) -> Result<FlowGraph> {
    let (w, h) = image.shape();
    if w == 0 || h == 0 {
        return Err(CosegError::InvalidEnergy(format!("empty {w}x{h} grid")));
    }
    ensure_same_shape("fore potentials", (w, h), unary.fore.shape())?;
    ensure_same_shape("back potentials", (w, h), unary.back.shape())?;
    let edges = EdgeWeights::compute(image, lambda)?;

    let mut graph = FlowGraph::new(w * h);
    for (p, (&fore, &back)) in unary.fore.data.iter().zip(&unary.back.data).enumerate() {
        graph.add_terminal(p, back, fore)?;
    }
    for y in 0..h {
        for x in 0..w {
            let p = y * w + x;
            if x + 1 < w {
                graph.add_edge(p, p + 1, edges.right.get(x, y))?;
            }
            if y + 1 < h {
                graph.add_edge(p, p + w, edges.down.get(x, y))?;
            }
            if x + 1 < w && y + 1 < h {
                graph.add_edge(p, p + w + 1, edges.diag.get(x, y))?;
            }
        }
    }
    debug!(
        "grid graph {w}x{h}: lambda={lambda} sigma_c={:.3} edges={}",
        edges.sigma,
        graph.edge_count()
    );
    Ok(graph)
}

/// Minimum-energy binary labeling of `image`; `true` is foreground.
pub fn segment(
    image: &RgbImage,
    unary: &UnaryPotentials,
    lambda: f64,
    solver: &dyn MaxFlowSolver,
) -> Result<Mask> {
    let graph = build_graph(image, unary, lambda)?;
    let cut = solver.min_cut(&graph)?;
    let (w, h) = image.shape();
    Mask::new(w, h, (0..w * h).map(|p| cut.is_sink_side(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphcut::Dinic;
    use approx::assert_relative_eq;

    fn potentials(w: usize, h: usize, f: impl Fn(usize, usize) -> (f64, f64)) -> UnaryPotentials {
        let mut fore = PixelMap::new(w, h);
        let mut back = PixelMap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let (fv, bv) = f(x, y);
                fore.set(x, y, fv);
                back.set(x, y, bv);
            }
        }
        UnaryPotentials { fore, back }
    }

    fn checker_potentials() -> UnaryPotentials {
        potentials(6, 5, |x, y| {
            if (x + 2 * y) % 3 == 0 {
                (2.0, 0.5)
            } else {
                (0.4, 1.0)
            }
        })
    }

    #[test]
    fn zero_lambda_thresholds_unaries() {
        let img = RgbImage::from_fn(6, 5, |x, y| [(x * 40) as u8, (y * 50) as u8, 90]);
        let unary = checker_potentials();
        let mask = segment(&img, &unary, 0.0, &Dinic).unwrap();
        for y in 0..5 {
            for x in 0..6 {
                let expected = unary.fore.get(x, y) > unary.back.get(x, y);
                assert_eq!(mask.get(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn huge_lambda_collapses_to_cheaper_uniform_label() {
        let img = RgbImage::filled(6, 5, [100, 100, 100]);
        let unary = checker_potentials();
        // All-foreground costs Σ back, all-background Σ fore.
        let all_fore: f64 = unary.back.data.iter().sum();
        let all_back: f64 = unary.fore.data.iter().sum();
        let mask = segment(&img, &unary, 1e6, &Dinic).unwrap();
        let expected = all_fore < all_back;
        assert!(mask.data.iter().all(|&v| v == expected));
    }

    #[test]
    fn sharp_boundary_left_half_then_collapse() {
        let img = RgbImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                [200, 30, 30]
            } else {
                [30, 30, 200]
            }
        });
        let unary = potentials(8, 8, |x, _| if x < 4 { (2.0, 0.5) } else { (0.6, 1.0) });

        let mask = segment(&img, &unary, 0.0, &Dinic).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(mask.get(x, y), x < 4, "pixel ({x}, {y})");
            }
        }

        // Σ back = 48 < Σ fore = 83.2, so the uniform labeling is foreground.
        let mask = segment(&img, &unary, 1e9, &Dinic).unwrap();
        assert_eq!(mask.count(), 64);
    }

    #[test]
    fn flat_image_uses_plain_lambda() {
        let img = RgbImage::filled(3, 3, [7, 7, 7]);
        assert_eq!(mean_neighbor_distance(&img), 0.0);
        let e = EdgeWeights::compute(&img, 0.5).unwrap();
        assert_relative_eq!(e.right.get(0, 0), 0.5);
        assert_relative_eq!(e.diag.get(1, 1), 0.5 * FRAC_1_SQRT_2);
        assert_eq!(e.right.get(2, 0), 0.0);
        assert_eq!(e.down.get(0, 2), 0.0);
    }

    #[test]
    fn rejects_invalid_energies() {
        let img = RgbImage::filled(2, 2, [0, 0, 0]);
        let mut unary = potentials(2, 2, |_, _| (1.0, 1.0));
        assert!(matches!(
            segment(&img, &unary, -1.0, &Dinic),
            Err(CosegError::InvalidEnergy(_))
        ));
        unary.fore.set(1, 1, f64::NAN);
        assert!(matches!(
            segment(&img, &unary, 1.0, &Dinic),
            Err(CosegError::InvalidEnergy(_))
        ));
        let empty = RgbImage::filled(0, 0, [0, 0, 0]);
        let none = potentials(0, 0, |_, _| (0.0, 0.0));
        assert!(segment(&empty, &none, 1.0, &Dinic).is_err());
    }
}
