#![allow(dead_code)]

use exact_tsne_rs::FeaturePoint;
use faer::Mat;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Create a synthetic dataset with five well-separated clusters
pub fn create_diagnostic_data(
    n_per_cluster: usize,
    n_dim: usize,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_total = n_per_cluster * 5;

    let mut data_vec = Vec::with_capacity(n_total * n_dim);
    let mut labels = Vec::with_capacity(n_total);

    let centres = [
        vec![0.0; n_dim],
        (0..n_dim)
            .map(|i| if i == 0 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        (0..n_dim)
            .map(|i| if i == 1 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        (0..n_dim)
            .map(|i| if i == 2 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        vec![10.0; n_dim],
    ];

    for (cluster_id, centre) in centres.iter().enumerate() {
        for _ in 0..n_per_cluster {
            for dim in 0..n_dim {
                let noise: f64 = rng.random::<f64>() * 0.5 - 0.25;
                data_vec.push(centre[dim] + noise);
            }
            labels.push(cluster_id);
        }
    }

    let data = Mat::from_fn(n_total, n_dim, |i, j| data_vec[i * n_dim + j]);
    (data, labels)
}

/// Same data as `create_diagnostic_data()`, as `FeaturePoint`s carrying the
/// cluster label as metadata
pub fn create_diagnostic_points(
    n_per_cluster: usize,
    n_dim: usize,
    seed: u64,
) -> Vec<FeaturePoint<f64, usize>> {
    let (data, labels) = create_diagnostic_data(n_per_cluster, n_dim, seed);

    labels
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            let value = (0..n_dim).map(|j| data[(i, j)]).collect();
            FeaturePoint::new(format!("point_{}", i), value, label)
        })
        .collect()
}

/// Two tight 3D clusters of three points around (5, 5, 5) and (-5, -5, -5)
pub fn two_cluster_points() -> Vec<FeaturePoint<f64, usize>> {
    vec![
        FeaturePoint::new("a1", vec![5.0, 5.0, 5.0], 0),
        FeaturePoint::new("a2", vec![5.1, 4.9, 5.0], 0),
        FeaturePoint::new("a3", vec![4.9, 5.0, 5.1], 0),
        FeaturePoint::new("b1", vec![-5.0, -5.0, -5.0], 1),
        FeaturePoint::new("b2", vec![-5.1, -4.9, -5.0], 1),
        FeaturePoint::new("b3", vec![-4.9, -5.0, -5.1], 1),
    ]
}

/// Euclidean distance between two embedding points
pub fn dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Average intra- and inter-cluster pairwise distances
pub fn intra_inter(embedding: &[Vec<f64>], labels: &[usize]) -> (f64, f64) {
    let (mut intra, mut n_intra) = (0.0, 0);
    let (mut inter, mut n_inter) = (0.0, 0);

    for i in 0..embedding.len() {
        for j in (i + 1)..embedding.len() {
            let d = dist(&embedding[i], &embedding[j]);
            if labels[i] == labels[j] {
                intra += d;
                n_intra += 1;
            } else {
                inter += d;
                n_inter += 1;
            }
        }
    }

    (intra / n_intra as f64, inter / n_inter as f64)
}
