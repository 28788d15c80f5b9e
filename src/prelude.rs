pub use crate::data::init::{initialise_embedding, parse_initialisation, EmbdInit};
pub use crate::data::nearest_neighbours::{
    parse_ann_search, parse_dist_metric, AnnSearch, DistMetric, NearestNeighbourParams,
    NeighbourIndex,
};
pub use crate::data::structures::SparseGraph;
pub use crate::data::synthetic::{load_iris, make_blobs, random_split, select_labels, select_rows};
pub use crate::error::{Result, UmapError};
pub use crate::evaluation::kmeans::{KMeans, KMeansResult};
pub use crate::evaluation::metrics::{adjusted_rand_score, trustworthiness};
pub use crate::training::umap_optimisers::{find_ab_params, UmapOptimParams};
pub use crate::training::UmapGraphParams;
pub use crate::{umap, Umap, UmapParams};
