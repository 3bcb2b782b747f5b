//! # galaxy - API documentation
//!
//! Galaxy turns a table of music tracks with audio features into a 3-dimensional "galaxy": every
//! track becomes a point in space (principal component projection of its standardized features)
//! that carries a cluster label (k-means over the same standardized features).
//!
//! ## Design target
//! The pipeline is a single-pass batch transformation. All numeric stages operate on plain row-major
//! vectors instead of any high-level matrix type, and every random draw comes from one seeded generator,
//! so identical input and configuration always produce a byte-identical output document.
//!
//! ## Stages
//! 1. [`loader`]: parse the delimited input, dropping incomplete rows
//! 2. [`sampler`]: reduce the input to a bounded working set, stratified by release year
//! 3. [`Standardizer`]: zero mean / unit variance per feature
//! 4. [`Pca`]: projection onto the 3 dominant principal axes
//! 5. [`KMeans`]: Lloyd's algorithm with K-Mean++ initialization
//! 6. [`record::assemble`] and [`writer`]: join everything into the output document
//!
//! ## Supported primitive types
//! The numeric building blocks ([`Standardizer`], [`Pca`], [`KMeans`]) are generic over
//! - [`f32`]
//! - [`f64`]
//!
//! The pipeline itself works with [`f64`].
//!
//! ## Example
//! ```rust
//! use galaxy::*;
//!
//! fn main() {
//!     let config = PipelineConfig {
//!         input_path: "data.csv".into(),
//!         output_path: "galaxy_data.json".into(),
//!         ..Default::default()
//!     };
//!     let pipeline = Pipeline::new(config).unwrap();
//!
//!     // pipeline.process_file() would load, transform and write in one go
//!     let records = pipeline.run(Vec::new());
//!     println!("{} tracks", records.len());
//! }
//! ```
//!
//! ## Example (clustering only, using the status event callbacks)
//! ```rust
//! use galaxy::*;
//!
//! fn main() {
//!     let (sample_cnt, sample_dims, k, max_iter) = (2000, 9, 8, 300);
//!
//!     // Generate some random data
//!     let mut samples = vec![0.0f64;sample_cnt * sample_dims];
//!     samples.iter_mut().for_each(|v| *v = rand::random());
//!
//!     let conf = KMeansConfig::build()
//!         .init_done(&|_| println!("Initialization completed."))
//!         .iteration_done(&|s, nr, new_distsum|
//!             println!("Iteration {} - Error: {:.2} -> {:.2} | Improvement: {:.2}",
//!                 nr, s.distsum, new_distsum, s.distsum - new_distsum))
//!         .build();
//!
//!     let kmean = KMeans::new(samples, sample_cnt, sample_dims, EuclideanDistance);
//!     let result = kmean.kmeans_lloyd(k, max_iter, KMeans::init_kmeanplusplus, &conf);
//!
//!     println!("Centroids: {:?}", result.centroids);
//!     println!("Cluster-Assignments: {:?}", result.assignments);
//!     println!("Error: {}", result.distsum);
//! }
//! ```

#[macro_use] mod helpers;
mod memory;
mod api;
mod variants;
mod inits;
mod distances;
mod abort_strategy;

pub mod config;
pub mod error;
pub mod record;
pub mod sampler;
pub mod standardizer;
pub mod pca;
pub mod loader;
pub mod writer;
pub mod pipeline;

pub use abort_strategy::AbortStrategy;
pub use api::{DistanceFunction, KMeansState, KMeansConfig, KMeansConfigBuilder, KMeans};
pub use distances::EuclideanDistance;
pub use memory::Primitive;
pub use standardizer::Standardizer;
pub use pca::Pca;
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use record::{OutputRecord, RawRecord};
pub use pipeline::{Pipeline, PipelineEvent, PipelineRun};
