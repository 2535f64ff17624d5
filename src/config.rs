//! The configuration document.
//!
//! One YAML document drives a whole run. The sentinel strings the original
//! tooling used ("-" for the standard streams, "?" to suppress a file,
//! "ROWNUM" to synthesize ids from row numbers) parse into a tagged
//! `DataSource` value rather than being string-compared at each use site.

use std::fmt;
use std::path::PathBuf;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::clustering::classifier::HilbertClassifier;
use crate::clustering::density::DensitySplitter;
use crate::clustering::optimal_index::OptimalIndex;
use crate::errors::{SlashError, SlashResult};

/// Where a stream of records comes from or goes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// The standard stream for the field's direction: stdin for inputs,
    /// stdout for outputs. Spelled `-`.
    Standard,
    /// No stream at all. Spelled `?`.
    Suppress,
    /// Synthesize the field from the one-based row number. Spelled `ROWNUM`.
    RowNumber,
    /// A file on disk.
    File(PathBuf)
}

impl DataSource {
    pub fn parse(text : &str) -> Self {
        match text {
            "-" => DataSource::Standard,
            "?" => DataSource::Suppress,
            "ROWNUM" => DataSource::RowNumber,
            path => DataSource::File(PathBuf::from(path))
        }
    }

    pub fn is_suppressed(&self) -> bool { *self == DataSource::Suppress }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataSource::Standard => write!(f, "-"),
            DataSource::Suppress => write!(f, "?"),
            DataSource::RowNumber => write!(f, "ROWNUM"),
            DataSource::File(path) => write!(f, "{}", path.to_string_lossy())
        }
    }
}

impl Serialize for DataSource {
    fn serialize<S : Serializer>(&self, serializer : S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataSource {
    fn deserialize<D : Deserializer<'de>>(deserializer : D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(DataSource::parse(&text))
    }
}

/// Logging verbosity for the run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error
        }
    }
}

/// Options for reading the input point stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Does the input start with a header record naming its columns?
    pub read_header : bool,
    /// Column holding the point id (by name when there is a header, else a
    /// one-based column number).
    pub id_field : String,
    /// Column holding the initial category, if any.
    pub category_field : String,
    /// Where the input records come from.
    pub input_data_file : DataSource
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            read_header : true,
            id_field : "id".to_string(),
            category_field : "category".to_string(),
            input_data_file : DataSource::Standard
        }
    }
}

/// Options for writing the labeled output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub output_data_file : DataSource,
    pub write_header : bool,
    pub id_field : String,
    pub category_field : String,
    pub log_file : DataSource,
    pub log_level : LogLevel
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output_data_file : DataSource::Standard,
            write_header : true,
            id_field : "id".to_string(),
            category_field : "category".to_string(),
            log_file : DataSource::Suppress,
            log_level : LogLevel::Info
        }
    }
}

/// Budget for the curve search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexBudget {
    pub index_count : usize,
    pub max_trials : usize,
    pub max_iterations_without_improvement : usize,
    pub outlier_size : usize,
    pub use_sample : bool
}

impl Default for IndexBudget {
    fn default() -> Self {
        let search = OptimalIndex::default();
        IndexBudget {
            index_count : search.index_count,
            max_trials : search.max_trials,
            max_iterations_without_improvement : search.max_iterations_without_improvement,
            outlier_size : search.outlier_size,
            use_sample : search.use_sample
        }
    }
}

/// Options for the Hilbert index itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Bits per dimension; zero or negative means derive from the data.
    pub bits_per_dimension : i32,
    pub budget : IndexBudget
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig { bits_per_dimension : 0, budget : IndexBudget::default() }
    }
}

/// Knobs for the single-link merging phases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub max_neighbors_to_compare : usize,
    pub use_exact_cluster_distance : bool,
    pub outlier_distance_multiplier : u64
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let classifier = HilbertClassifier::default();
        ClassifierConfig {
            max_neighbors_to_compare : classifier.max_neighbors_to_compare,
            use_exact_cluster_distance : classifier.use_exact_cluster_distance,
            outlier_distance_multiplier : classifier.outlier_distance_multiplier
        }
    }
}

/// Knobs for the density splitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DensityConfig {
    pub skip : bool,
    pub unmergeable_size_fraction : f64,
    pub neighborhood_radius_multiplier : f64,
    pub outlier_size : usize,
    pub mergeable_shrinkage : f64
}

impl Default for DensityConfig {
    fn default() -> Self {
        let splitter = DensitySplitter::default();
        DensityConfig {
            skip : splitter.skip,
            unmergeable_size_fraction : splitter.unmergeable_size_fraction,
            neighborhood_radius_multiplier : splitter.neighborhood_radius_multiplier,
            outlier_size : splitter.outlier_size,
            mergeable_shrinkage : splitter.mergeable_shrinkage
        }
    }
}

/// The whole configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub data : DataConfig,
    pub output : OutputConfig,
    pub index : IndexConfig,
    pub hilbert_classifier : ClassifierConfig,
    pub density_classifier : DensityConfig,
    /// Quality gate for the recluster self-test. A BCubed similarity below
    /// this is reported as a shortfall but does not fail the run.
    pub acceptable_bcubed : f64
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            data : DataConfig::default(),
            output : OutputConfig::default(),
            index : IndexConfig::default(),
            hilbert_classifier : ClassifierConfig::default(),
            density_classifier : DensityConfig::default(),
            acceptable_bcubed : 0.9
        }
    }
}

/// Tolerance used when comparing configurations that have passed through
/// serialization.
pub const FLOAT_TOLERANCE : f64 = 1e-4;

impl ClusterConfig {
    /// The default configuration, the document emitted by a `define` command.
    pub fn define() -> Self {
        ClusterConfig::default()
    }

    /// Render as a YAML document.
    pub fn to_yaml(&self) -> SlashResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse a YAML document and validate it before anything else runs.
    pub fn from_yaml(text : &str) -> SlashResult<Self> {
        let config : ClusterConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as JSON, for callers embedding the document in a JSON pipeline.
    pub fn to_json(&self) -> SlashResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SlashError::Config(format!("cannot render configuration as JSON: {}", e)))
    }

    /// Parse a JSON document and validate it.
    pub fn from_json(text : &str) -> SlashResult<Self> {
        let config : ClusterConfig = serde_json::from_str(text)
            .map_err(|e| SlashError::Config(format!("cannot parse configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range settings before any computation begins.
    pub fn validate(&self) -> SlashResult<()> {
        fn fraction(name : &str, value : f64) -> SlashResult<()> {
            if value < 0.0 || value > 1.0 {
                return Err(SlashError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
            Ok(())
        }
        fraction("acceptable_bcubed", self.acceptable_bcubed)?;
        fraction("density_classifier.unmergeable_size_fraction", self.density_classifier.unmergeable_size_fraction)?;
        fraction("density_classifier.mergeable_shrinkage", self.density_classifier.mergeable_shrinkage)?;
        if self.density_classifier.neighborhood_radius_multiplier <= 0.0 {
            return Err(SlashError::Config("density_classifier.neighborhood_radius_multiplier must be positive".to_string()));
        }
        if self.hilbert_classifier.max_neighbors_to_compare == 0 {
            return Err(SlashError::Config("hilbert_classifier.max_neighbors_to_compare must be at least 1".to_string()));
        }
        if self.hilbert_classifier.outlier_distance_multiplier == 0 {
            return Err(SlashError::Config("hilbert_classifier.outlier_distance_multiplier must be at least 1".to_string()));
        }
        if self.index.budget.max_trials == 0 {
            return Err(SlashError::Config("index.budget.max_trials must be at least 1".to_string()));
        }
        if self.index.bits_per_dimension > 32 {
            return Err(SlashError::Config(format!("index.bits_per_dimension cannot exceed 32, got {}", self.index.bits_per_dimension)));
        }
        Ok(())
    }

    /// Equality with a tolerance on the floating-point settings, for comparing
    /// configurations across a serialization round trip.
    pub fn approx_eq(&self, other : &Self, tolerance : f64) -> bool {
        let floats_close = (self.acceptable_bcubed - other.acceptable_bcubed).abs() <= tolerance
            && (self.density_classifier.unmergeable_size_fraction - other.density_classifier.unmergeable_size_fraction).abs() <= tolerance
            && (self.density_classifier.neighborhood_radius_multiplier - other.density_classifier.neighborhood_radius_multiplier).abs() <= tolerance
            && (self.density_classifier.mergeable_shrinkage - other.density_classifier.mergeable_shrinkage).abs() <= tolerance;
        floats_close
            && self.data == other.data
            && self.output == other.output
            && self.index == other.index
            && self.hilbert_classifier == other.hilbert_classifier
            && self.density_classifier.skip == other.density_classifier.skip
            && self.density_classifier.outlier_size == other.density_classifier.outlier_size
    }

    /// Build the merging-phase configuration this document describes.
    pub fn classifier(&self) -> HilbertClassifier {
        HilbertClassifier {
            max_neighbors_to_compare : self.hilbert_classifier.max_neighbors_to_compare,
            use_exact_cluster_distance : self.hilbert_classifier.use_exact_cluster_distance,
            outlier_distance_multiplier : self.hilbert_classifier.outlier_distance_multiplier,
            outlier_size : self.index.budget.outlier_size
        }
    }

    /// Build the density splitter this document describes.
    pub fn splitter(&self) -> DensitySplitter {
        DensitySplitter {
            skip : self.density_classifier.skip,
            unmergeable_size_fraction : self.density_classifier.unmergeable_size_fraction,
            neighborhood_radius_multiplier : self.density_classifier.neighborhood_radius_multiplier,
            outlier_size : self.density_classifier.outlier_size,
            mergeable_shrinkage : self.density_classifier.mergeable_shrinkage
        }
    }

    /// Build the curve-search budget this document describes.
    pub fn curve_search(&self) -> OptimalIndex {
        OptimalIndex {
            index_count : self.index.budget.index_count,
            max_trials : self.index.budget.max_trials,
            max_iterations_without_improvement : self.index.budget.max_iterations_without_improvement,
            outlier_size : self.index.budget.outlier_size,
            use_sample : self.index.budget.use_sample
        }
    }
}

#[cfg(test)]
/// Tests of the configuration document.
mod tests {
    #[allow(unused_imports)]
    use spectral::prelude::*;
    use super::{ClusterConfig, DataSource, FLOAT_TOLERANCE};

    #[test]
    fn yaml_round_trip_is_approximately_equal() {
        let mut config = ClusterConfig::define();
        config.acceptable_bcubed = 0.975;
        config.density_classifier.mergeable_shrinkage = 0.31;
        config.data.input_data_file = DataSource::File("points.csv".into());
        config.output.output_data_file = DataSource::Suppress;
        config.index.bits_per_dimension = 20;

        let text = config.to_yaml().unwrap();
        let reread = ClusterConfig::from_yaml(&text).unwrap();
        asserting("round trip").that(&config.approx_eq(&reread, FLOAT_TOLERANCE)).is_equal_to(true);
    }

    #[test]
    fn json_round_trip_matches_yaml_round_trip() {
        let mut config = ClusterConfig::define();
        config.index.budget.max_trials = 9;
        config.data.input_data_file = DataSource::RowNumber;
        let via_json = ClusterConfig::from_json(&config.to_json().unwrap()).unwrap();
        asserting("json round trip").that(&config.approx_eq(&via_json, FLOAT_TOLERANCE)).is_equal_to(true);
    }

    #[test]
    fn sentinel_strings_become_tagged_variants() {
        assert_eq!(DataSource::parse("-"), DataSource::Standard);
        assert_eq!(DataSource::parse("?"), DataSource::Suppress);
        assert_eq!(DataSource::parse("ROWNUM"), DataSource::RowNumber);
        assert_eq!(DataSource::parse("data/in.csv"), DataSource::File("data/in.csv".into()));
        assert_eq!(DataSource::parse("?").to_string(), "?");
    }

    #[test]
    fn unknown_options_are_rejected() {
        let text = "data:\n  read_header: true\n  no_such_option: 5\n";
        asserting("unknown option").that(&ClusterConfig::from_yaml(text).is_err()).is_equal_to(true);
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let mut config = ClusterConfig::define();
        config.acceptable_bcubed = 1.5;
        asserting("bcubed range").that(&config.validate().is_err()).is_equal_to(true);

        let mut config = ClusterConfig::define();
        config.hilbert_classifier.max_neighbors_to_compare = 0;
        asserting("neighbor floor").that(&config.validate().is_err()).is_equal_to(true);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let text = "acceptable_bcubed: 0.5\n";
        let config = ClusterConfig::from_yaml(text).unwrap();
        assert_eq!(config.acceptable_bcubed, 0.5);
        assert_eq!(config.index.budget.max_trials, ClusterConfig::default().index.budget.max_trials);
    }
}
