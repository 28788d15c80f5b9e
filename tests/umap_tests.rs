#![allow(clippy::needless_range_loop)]

mod commons;
use commons::*;

use faer::Mat;
use rustc_hash::FxHashMap;
use umap_rs::data::graph::smooth_knn_dist;
use umap_rs::prelude::*;
use umap_rs::*;

/// Test 1: exact kNN search excludes the point itself and stays in-cluster
#[test]
fn umap_integration_01_knn_correctness() {
    let (data, labels) = diagnostic_blobs(40, 10, 42);
    let k = 14;

    let (index, knn_indices, knn_dist) = NeighbourIndex::build(
        data.as_ref(),
        k,
        AnnSearch::Exact,
        DistMetric::Euclidean,
        &NearestNeighbourParams::default(),
        42,
        false,
    );

    println!("\n=== DIAGNOSTIC 1: kNN Search Correctness ===");
    println!(
        "Data shape: {} samples, {} features",
        index.n_samples(),
        index.n_features()
    );

    assert_eq!(knn_indices.len(), 200);
    for (i, neighbours) in knn_indices.iter().enumerate() {
        assert_eq!(neighbours.len(), k);
        assert!(!neighbours.contains(&i), "point {i} is its own neighbour");
        assert!(
            knn_dist[i].windows(2).all(|w| w[0] <= w[1]),
            "distances of point {i} are not sorted"
        );
    }

    let intra_cluster_ratio = knn_indices
        .iter()
        .enumerate()
        .map(|(i, neighbours)| {
            neighbours.iter().filter(|&&j| labels[j] == labels[i]).count() as f64 / k as f64
        })
        .sum::<f64>()
        / knn_indices.len() as f64;

    println!(
        "Average intra-cluster neighbour ratio: {:.2}%",
        intra_cluster_ratio * 100.0
    );

    assert!(
        intra_cluster_ratio > 0.95,
        "kNN should find mostly same-cluster neighbours, got {:.2}",
        intra_cluster_ratio
    );
}

/// Test 2: smooth_knn_dist gives positive sigmas and rho equal to the first
/// neighbour distance
#[test]
fn umap_integration_02_smooth_knn_dist() {
    let (data, _) = diagnostic_blobs(40, 10, 42);

    let (_, _, knn_dist) = NeighbourIndex::build(
        data.as_ref(),
        14,
        AnnSearch::Exact,
        DistMetric::Euclidean,
        &NearestNeighbourParams::default(),
        42,
        false,
    );

    println!("\n=== DIAGNOSTIC 2: smooth_knn_dist Values ===");

    let graph_params = UmapGraphParams::<f64>::default();
    let (sigma, rho) = smooth_knn_dist(
        &knn_dist,
        15,
        1.0,
        graph_params.tolerance,
        graph_params.n_iter,
    );

    let min_sigma = sigma.iter().copied().fold(f64::INFINITY, f64::min);
    let mean_sigma = sigma.iter().sum::<f64>() / sigma.len() as f64;
    println!("Sigma: min = {:.6}, mean = {:.6}", min_sigma, mean_sigma);

    assert!(min_sigma > 0.0, "All sigma values should be > 0");

    for i in 0..knn_dist.len() {
        assert!(
            (knn_dist[i][0] - rho[i]).abs() < 1e-12,
            "Point {}: rho = {:.6} but first neighbour is at distance {:.6}",
            i,
            rho[i],
            knn_dist[i][0]
        );

        // total membership hits log2(k)
        let total: f64 = knn_dist[i]
            .iter()
            .map(|&d| {
                if d <= rho[i] {
                    1.0
                } else {
                    (-(d - rho[i]) / sigma[i]).exp()
                }
            })
            .sum();
        assert!(
            (total - 15f64.log2()).abs() < 1e-3,
            "Point {}: membership sum {:.5} misses the target",
            i,
            total
        );
    }
}

/// Test 3: the fuzzy graph is symmetric, loop-free and mostly intra-cluster
#[test]
fn umap_integration_03_graph_connectivity() {
    let (data, labels) = diagnostic_blobs(40, 10, 42);
    let params = seeded_params(42);

    let (graph, _) = construct_umap_graph(data.as_ref(), 15, &params, 200, 42).unwrap();

    println!("\n=== DIAGNOSTIC 3: Graph Connectivity ===");
    println!("Graph has {} edges", graph.get_size());

    assert_eq!(graph.n_vertices, 200);

    let mut edges: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    for (i, j, w) in graph.to_edge_list() {
        assert_ne!(i, j, "self loop at {i}");
        assert!(w > 0.0 && w <= 1.0, "weight {w} out of (0, 1]");
        edges.insert((i, j), w);
    }
    for (&(i, j), &w) in &edges {
        let back = edges.get(&(j, i)).copied();
        assert_eq!(back, Some(w), "edge ({i}, {j}) has no symmetric partner");
    }

    let (intra, total) = edges
        .iter()
        .fold((0.0, 0.0), |(intra, total), (&(i, j), &w)| {
            if labels[i] == labels[j] {
                (intra + w, total + w)
            } else {
                (intra, total + w)
            }
        });
    println!("Intra-cluster weight share: {:.2}%", 100.0 * intra / total);

    assert!(intra / total > 0.95);
}

/// Test 4: blobs survive the embedding and k-means recovers them
#[test]
fn umap_integration_04_blobs_kmeans_ari() {
    let (data, labels) = diagnostic_blobs(40, 10, 7);

    let mut model = Umap::new(seeded_params(7));
    let embd = model.fit_transform(data.as_ref()).unwrap();

    assert_eq!(embd.nrows(), 200);
    assert_eq!(embd.ncols(), 2);
    assert!(all_finite(embd.as_ref()));

    let clusters = KMeans::new(5).with_seed(7).fit(embd.as_ref()).unwrap();
    let ari = adjusted_rand_score(&labels, &clusters.labels).unwrap();

    let (intra, inter) = cluster_separation(embd.as_ref(), &labels);
    println!("\n=== DIAGNOSTIC 4: Blobs ===");
    println!("ARI = {:.4}, intra = {:.3}, inter = {:.3}", ari, intra, inter);

    assert!(ari > 0.9, "ARI too low: {ari}");
    assert!(inter > 2.0 * intra, "clusters are not separated");
}

/// Test 5: held-out Iris points are placed trustworthily
#[test]
fn umap_integration_05_iris_transform() {
    let (train, _, test, test_labels) = iris_split(42);

    let params = UmapParams {
        n_neighbors: 10,
        ..seeded_params(42)
    };
    let mut model = Umap::new(params);
    let train_embd = model.fit_transform(train.as_ref()).unwrap();
    let test_embd = model.transform(test.as_ref()).unwrap();

    assert_eq!(train_embd.nrows(), train.nrows());
    assert_eq!(test_embd.nrows(), test.nrows());
    assert_eq!(test_embd.ncols(), 2);
    assert!(all_finite(test_embd.as_ref()));

    let score = trustworthiness(test.as_ref(), test_embd.as_ref(), 5).unwrap();
    let (intra, inter) = cluster_separation(test_embd.as_ref(), &test_labels);

    println!("\n=== DIAGNOSTIC 5: Iris transform ===");
    println!(
        "{} train / {} test, trustworthiness = {:.4}, intra = {:.3}, inter = {:.3}",
        train.nrows(),
        test.nrows(),
        score,
        intra,
        inter
    );

    assert!(score > 0.9, "trustworthiness too low: {score}");
    assert!(inter > intra);
}

/// Test 6: same seed, same embedding; different seed, different embedding
#[test]
fn umap_integration_06_reproducibility() {
    let (data, _) = diagnostic_blobs(20, 6, 42);

    let a = umap(data.as_ref(), &seeded_params(42)).unwrap();
    let b = umap(data.as_ref(), &seeded_params(42)).unwrap();
    let c = umap(data.as_ref(), &seeded_params(43)).unwrap();

    let max_diff = |x: &Mat<f64>, y: &Mat<f64>| {
        let mut diff: f64 = 0.0;
        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                diff = diff.max((x[(i, j)] - y[(i, j)]).abs());
            }
        }
        diff
    };

    println!("\n=== DIAGNOSTIC 6: Reproducibility ===");
    println!("Same seed max diff: {:.10}", max_diff(&a, &b));
    println!("Other seed max diff: {:.6}", max_diff(&a, &c));

    assert_eq!(max_diff(&a, &b), 0.0);
    assert!(max_diff(&a, &c) > 1e-6);
}

/// Test 7: the approximate indices give the same quality on fit and transform
#[test]
fn umap_integration_07_approximate_backends() {
    println!("\n=== DIAGNOSTIC 7: Approximate kNN backends ===");
    for ann in ["hnsw", "nndescent"] {
        check_approximate_backend(ann);
    }
}

fn check_approximate_backend(ann: &str) {
    let (data, labels) = diagnostic_blobs(40, 10, 3);
    let (train, test) = random_split(data.nrows(), 0.8, 3).unwrap();
    let train_data = select_rows(data.as_ref(), &train);
    let test_data = select_rows(data.as_ref(), &test);

    let params = UmapParams {
        ann_type: ann.to_string(),
        ..seeded_params(3)
    };
    let mut model = Umap::new(params);
    let train_embd = model.fit_transform(train_data.as_ref()).unwrap();
    let test_embd = model.transform(test_data.as_ref()).unwrap();

    let clusters = KMeans::new(5).with_seed(3).fit(train_embd.as_ref()).unwrap();
    let ari = adjusted_rand_score(&select_labels(&labels, &train), &clusters.labels).unwrap();

    println!("{}: ARI = {:.4}", ann, ari);

    assert!(ari > 0.9, "{ann}: ARI too low: {ari}");
    assert!(all_finite(test_embd.as_ref()));

    // new points land next to training points of their own blob
    let test_labels = select_labels(&labels, &test);
    let train_labels = select_labels(&labels, &train);
    let mut hits = 0;
    for i in 0..test_embd.nrows() {
        let closest = (0..train_embd.nrows())
            .min_by(|&x, &y| {
                let dx = (0..2)
                    .map(|c| (test_embd[(i, c)] - train_embd[(x, c)]).powi(2))
                    .sum::<f64>();
                let dy = (0..2)
                    .map(|c| (test_embd[(i, c)] - train_embd[(y, c)]).powi(2))
                    .sum::<f64>();
                dx.total_cmp(&dy)
            })
            .unwrap();
        if train_labels[closest] == test_labels[i] {
            hits += 1;
        }
    }
    assert!(
        hits as f64 / test_embd.nrows() as f64 > 0.9,
        "{ann}: transformed points land in the wrong blob"
    );
}

/// Test 8: cosine distance and random initialisation run end to end
#[test]
fn umap_integration_08_cosine_random_init() {
    let (data, labels) = diagnostic_blobs(30, 8, 11);

    let mut params = seeded_params(11);
    params.init = "random".to_string();
    params.nn_params.dist_metric = "cosine".to_string();
    params.n_components = 3;

    let embd = umap(data.as_ref(), &params).unwrap();

    assert_eq!(embd.ncols(), 3);
    assert!(all_finite(embd.as_ref()));

    let (intra, inter) = cluster_separation(embd.as_ref(), &labels);
    println!("\n=== DIAGNOSTIC 8: Cosine + random init ===");
    println!("intra = {:.3}, inter = {:.3}", intra, inter);
    assert!(inter > intra);
}

/// Test 9: errors surface as typed values
#[test]
fn umap_integration_09_errors() {
    let (data, _) = diagnostic_blobs(10, 4, 5);

    let unfitted = Umap::new(seeded_params(5));
    assert_eq!(
        unfitted.transform(data.as_ref()).unwrap_err(),
        UmapError::NotFitted
    );

    let bad = UmapParams {
        n_neighbors: 1,
        ..seeded_params(5)
    };
    assert!(matches!(
        umap(data.as_ref(), &bad),
        Err(UmapError::InvalidParameter {
            name: "n_neighbors",
            ..
        })
    ));

    let bad_metric = {
        let mut p = seeded_params(5);
        p.nn_params.dist_metric = "manhattan".to_string();
        p
    };
    assert!(matches!(
        umap(data.as_ref(), &bad_metric),
        Err(UmapError::InvalidParameter {
            name: "dist_metric",
            ..
        })
    ));

    let mut model = Umap::new(seeded_params(5));
    model.fit(data.as_ref()).unwrap();
    let wrong_dims = Mat::<f64>::zeros(3, 7);
    assert_eq!(
        model.transform(wrong_dims.as_ref()).unwrap_err(),
        UmapError::DimensionMismatch {
            expected: 4,
            actual: 7
        }
    );
    assert_eq!(
        model.transform(Mat::<f64>::zeros(0, 4).as_ref()).unwrap_err(),
        UmapError::EmptyInput
    );

    let mut nan_data = data.clone();
    nan_data[(2, 0)] = f64::NAN;
    assert_eq!(
        model.transform(nan_data.as_ref()).unwrap_err(),
        UmapError::NonFiniteInput { row: 2, col: 0 }
    );
    // a failed transform leaves the fit intact
    assert!(model.is_fitted());
}
