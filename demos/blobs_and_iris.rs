//! Embeds Gaussian blobs and Iris and scores the results.
//!
//! `RUST_LOG=info cargo run --release --example blobs_and_iris`

use std::time::Instant;

use umap_rs::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    ///////////
    // Blobs //
    ///////////

    let start = Instant::now();
    let (blobs, blob_labels) = make_blobs(1_000, 10, 5, 1.0, (-10.0, 10.0), 42)?;

    let params = UmapParams {
        random_state: Some(42),
        verbose: true,
        ..UmapParams::default()
    };
    let embedding = Umap::new(params).fit_transform(blobs.as_ref())?;

    let clusters = KMeans::new(5).with_seed(42).fit(embedding.as_ref())?;
    let ari = adjusted_rand_score(&blob_labels, &clusters.labels)?;

    println!(
        "Blobs: {} samples embedded in {:.2?}, k-means ARI = {:.4}",
        blobs.nrows(),
        start.elapsed(),
        ari
    );

    //////////
    // Iris //
    //////////

    let start = Instant::now();
    let (iris, iris_labels) = load_iris();
    let (train, test) = random_split(iris.nrows(), 0.75, 42)?;
    let train_data = select_rows(iris.as_ref(), &train);
    let test_data = select_rows(iris.as_ref(), &test);

    let params = UmapParams {
        n_neighbors: 10,
        random_state: Some(42),
        verbose: true,
        ..UmapParams::default()
    };
    let mut model = Umap::new(params);
    let train_embd = model.fit_transform(train_data.as_ref())?;
    let test_embd = model.transform(test_data.as_ref())?;

    let train_score = trustworthiness(train_data.as_ref(), train_embd.as_ref(), 10)?;
    let test_score = trustworthiness(test_data.as_ref(), test_embd.as_ref(), 5)?;

    let clusters = KMeans::new(3).with_seed(42).fit(train_embd.as_ref())?;
    let ari = adjusted_rand_score(&select_labels(&iris_labels, &train), &clusters.labels)?;

    println!(
        "Iris: {} train / {} test in {:.2?}, trustworthiness train = {:.4}, test = {:.4}, k-means ARI = {:.4}",
        train.len(),
        test.len(),
        start.elapsed(),
        train_score,
        test_score,
        ari
    );

    Ok(())
}
