use crate::{
    config::PipelineConfig,
    error::Result,
    loader, pca::Pca, record::{self, OutputRecord, RawRecord, FEATURES, FEATURE_COUNT},
    sampler, standardizer::Standardizer, writer,
    AbortStrategy, EuclideanDistance, KMeans, KMeansConfig, KMeansState,
};
use rand::prelude::*;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

pub type ObserverFn<'a> = &'a dyn Fn(&PipelineEvent);

/// Progress notifications, emitted between the pipeline stages.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    Loaded { rows: usize, dropped: usize },
    Sampled { input: usize, working_set: usize },
    Standardized { degenerate_columns: Vec<&'static str> },
    Reduced { explained_variance_ratio: Vec<f64> },
    Clustered { k: usize, iterations: usize, inertia: f64 },
    Assembled { records: usize },
    Written { path: PathBuf, records: usize },
}
impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::Loaded { rows, dropped } =>
                write!(f, "Loaded {} rows ({} dropped for missing values)", rows, dropped),
            PipelineEvent::Sampled { input, working_set } if input == working_set =>
                write!(f, "Processing {} rows", working_set),
            PipelineEvent::Sampled { input, working_set } =>
                write!(f, "Sampled {} of {} rows", working_set, input),
            PipelineEvent::Standardized { degenerate_columns } if degenerate_columns.is_empty() =>
                write!(f, "Standardized features"),
            PipelineEvent::Standardized { degenerate_columns } =>
                write!(f, "Standardized features (constant: {})", degenerate_columns.join(", ")),
            PipelineEvent::Reduced { explained_variance_ratio } => {
                let ratios: Vec<String> = explained_variance_ratio.iter().map(|r| format!("{:.1}%", r * 100.0)).collect();
                write!(f, "PCA ({}D) explains {}", explained_variance_ratio.len(), ratios.join(" / "))
            }
            PipelineEvent::Clustered { k, iterations, inertia } =>
                write!(f, "K-Means: {} clusters after {} iterations (inertia {:.3})", k, iterations, inertia),
            PipelineEvent::Assembled { records } =>
                write!(f, "Assembled {} tracks", records),
            PipelineEvent::Written { path, records } =>
                write!(f, "Saved {} tracks to {}", records, path.display()),
        }
    }
}

/// Intermediate results of one pipeline run, all row-aligned with `working_set`.
///
/// ## Fields
/// - **standardized**: Standardized feature matrix [row-major], [`FEATURE_COUNT`] columns
/// - **projection**: Projection [row-major], `dims` columns
/// - **clustering**: Final k-means state; its `k` is the effective cluster count (`min(k, rows)`)
#[derive(Clone, Debug)]
pub struct PipelineRun {
    pub working_set: Vec<RawRecord>,
    pub standardized: Vec<f64>,
    pub projection: Vec<f64>,
    pub clustering: KMeansState<f64>,
    pub dims: usize,
}
impl PipelineRun {
    pub fn assignments(&self) -> &[usize] {
        &self.clustering.assignments
    }

    pub fn records(&self) -> Vec<OutputRecord> {
        record::assemble(&self.working_set, &self.projection, self.dims, &self.clustering.assignments)
    }
}

/// Single-pass batch transformation: sample -> standardize -> (PCA, k-means) -> assemble.
///
/// ## Example
/// ```rust
/// use galaxy::{Pipeline, PipelineConfig, PipelineEvent};
///
/// let print = |event: &PipelineEvent| println!("{}", event);
/// let pipeline = Pipeline::new(PipelineConfig::default()).unwrap().observer(&print);
/// let records = pipeline.run(Vec::new());
/// assert!(records.is_empty());
/// ```
pub struct Pipeline<'a> {
    config: PipelineConfig,
    observer: ObserverFn<'a>,
}
impl<'a> Pipeline<'a> {
    /// Validates **config** and creates a pipeline without observer.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, observer: &|_| {} })
    }

    /// Set the callback that receives a [`PipelineEvent`] after every stage.
    pub fn observer(mut self, observer: ObserverFn<'a>) -> Self {
        self.observer = observer; self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all numeric stages on **records** and keep the intermediate results.
    pub fn run_stages(&self, records: Vec<RawRecord>) -> PipelineRun {
        let config = &self.config;
        let mut rnd = StdRng::seed_from_u64(config.seed);

        let input = records.len();
        let working_set = sampler::sample(records, config.global_cap, config.per_group_cap, &mut rnd);
        (self.observer)(&PipelineEvent::Sampled { input, working_set: working_set.len() });

        let sample_cnt = working_set.len();
        let features = record::feature_matrix(&working_set);
        let (standardizer, standardized) = Standardizer::fit_transform(&features, sample_cnt, FEATURE_COUNT);
        (self.observer)(&PipelineEvent::Standardized {
            degenerate_columns: standardizer.degenerate_columns().into_iter().map(|d| FEATURES[d]).collect(),
        });

        let pca = Pca::fit(&standardized, sample_cnt, FEATURE_COUNT, config.dims);
        let projection = pca.transform(&standardized);
        (self.observer)(&PipelineEvent::Reduced { explained_variance_ratio: pca.explained_variance_ratio() });

        let clustering = self.cluster(&standardized, sample_cnt, rnd);
        (self.observer)(&PipelineEvent::Clustered {
            k: clustering.k,
            iterations: clustering.iterations,
            inertia: clustering.distsum,
        });

        PipelineRun { working_set, standardized, projection, clustering, dims: config.dims }
    }

    fn cluster(&self, standardized: &[f64], sample_cnt: usize, rnd: StdRng) -> KMeansState<f64> {
        let config = &self.config;
        let k = config.k.min(sample_cnt);
        if k < config.k {
            warn!(requested = config.k, k, "Fewer rows than clusters, reducing cluster count");
        }
        if k == 0 {
            return KMeansState::new(0, FEATURE_COUNT, 0);
        }

        let on_iteration = |state: &KMeansState<f64>, iteration: usize, distsum: f64| {
            debug!(iteration, distsum, previous = state.distsum, "K-Means iteration");
        };
        let conf = KMeansConfig::build()
            .random_generator(rnd)
            .abort_strategy(AbortStrategy::CentroidShift { tolerance: config.tolerance })
            .runs(config.n_init)
            .iteration_done(&on_iteration)
            .build();
        let kmean = KMeans::new(standardized.to_vec(), sample_cnt, FEATURE_COUNT, EuclideanDistance);
        kmean.kmeans_lloyd(k, config.max_iter, KMeans::init_kmeanplusplus, &conf)
    }

    /// Transform **records** into output records (Working Set order).
    pub fn run(&self, records: Vec<RawRecord>) -> Vec<OutputRecord> {
        let records = self.run_stages(records).records();
        (self.observer)(&PipelineEvent::Assembled { records: records.len() });
        records
    }

    /// Load the configured input file, run the pipeline and write the output document.
    ///
    /// ## Returns
    /// The amount of written records.
    pub fn process_file(&self) -> Result<usize> {
        let loaded = loader::load(&self.config.input_path, self.config.delimiter_byte()?)?;
        (self.observer)(&PipelineEvent::Loaded { rows: loaded.records.len(), dropped: loaded.dropped });

        let records = self.run(loaded.records);
        writer::write_records(&self.config.output_path, &records, self.config.pretty)?;
        (self.observer)(&PipelineEvent::Written { path: self.config.output_path.clone(), records: records.len() });
        Ok(records.len())
    }
}
