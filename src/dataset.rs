//! Ingesting point streams, running the pipeline, and writing labeled output.
//!
//! The clustering engine itself never touches I/O; this module is the
//! collaborator that feeds it a point set and consumes its labeling. Records
//! arrive as delimited text (comma or tab), leave the same way, and a
//! `ClusterConfig` document drives everything in between.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Read;
use std::ops::Range;
use csv::ReaderBuilder;
use log::{info, warn};
use crate::clustering::Clustering;
use crate::clustering::bcubed::BCubed;
use crate::clustering::classifier::PointClustering;
use crate::clustering::counter::CurveProfile;
use crate::clustering::density::SplitRecord;
use crate::clustering::tendency::{ClusteringTendency, TendencyAssessor};
use crate::config::{ClusterConfig, DataConfig, DataSource, OutputConfig};
use crate::errors::{SlashError, SlashResult};
use crate::hilbert::CurveMap;
use crate::hilbert::transform::bits_required;
use crate::point::{Point, PointData};
use crate::stopwatch::Stopwatch;

/// Sentinel in `id_field` asking for ids synthesized from row numbers.
const ROW_NUMBER_FIELD : &str = "ROWNUM";

/// A positional column reference: one-based in the configuration, zero-based here.
fn parse_one_based(field : &str) -> Option<usize> {
    field.parse::<usize>().ok().filter(|&position| position > 0).map(|position| position - 1)
}

/// A point set plus the external identities and any initial categorization
/// that came with it. The points are owned here; the engine works with
/// indices into them.
#[derive(Debug)]
pub struct Dataset {
    pub points : Vec<Point>,
    /// External id per point, parallel to `points`.
    pub ids : Vec<String>,
    /// Initial category per point, when the input supplied one.
    pub initial_categories : Vec<Option<String>>
}

/// Everything a clustering run produces.
pub struct ClusterOutcome {
    /// The partition, over point indices.
    pub clustering : PointClustering,
    /// Rendered label per point, parallel to the dataset's points.
    pub labels : Vec<String>,
    /// The curve profile that supplied the merge distance.
    pub profile : CurveProfile,
    /// Clusters the density splitter broke up.
    pub splits : Vec<SplitRecord>,
    /// BCubed similarity against the initial categorization, when one existed.
    pub bcubed_similarity : Option<f64>,
    /// True when the similarity fell short of `acceptable_bcubed`.
    pub quality_shortfall : bool
}

impl Dataset {
    /// Parse a delimited text stream into points.
    ///
    /// The delimiter is sniffed from the first line: a tab wins over a comma.
    /// Blank and too-short records are skipped; negative or unparseable
    /// coordinates and duplicate ids fail the ingest, naming the record.
    pub fn read_text(text : &str, config : &DataConfig) -> SlashResult<Dataset> {
        let delimiter = match text.lines().next() {
            Some(line) if line.contains('\t') => b'\t',
            _ => b','
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(config.read_header)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        // Resolve the id and category columns: by header name when there is a
        // header, by one-based position otherwise. ROWNUM synthesizes ids.
        let mut id_column : Option<usize> = None;
        let mut category_column : Option<usize> = None;
        if config.read_header {
            let headers = reader.headers()?.clone();
            for (position, name) in headers.iter().enumerate() {
                if name == config.id_field { id_column = Some(position); }
                if name == config.category_field { category_column = Some(position); }
            }
        }
        else {
            id_column = parse_one_based(&config.id_field);
            category_column = parse_one_based(&config.category_field);
        }
        if config.id_field == ROW_NUMBER_FIELD { id_column = None; }

        let mut points = Vec::new();
        let mut ids = Vec::new();
        let mut initial_categories = Vec::new();
        let mut seen_ids : HashSet<String> = HashSet::new();
        let mut dimensions : Option<usize> = None;

        for (row_number, record) in reader.records().enumerate() {
            let record = record?;
            let row_name = format!("row {}", row_number + 1);
            if record.iter().all(|field| field.trim().is_empty()) { continue; }

            let id = match id_column {
                Some(column) => match record.get(column) {
                    Some(field) if !field.trim().is_empty() => field.trim().to_string(),
                    _ => return Err(SlashError::invalid_input(row_name, "missing id field"))
                },
                None => format!("{}", row_number + 1)
            };
            let category = category_column
                .and_then(|column| record.get(column))
                .map(|field| field.trim())
                .filter(|field| !field.is_empty())
                .map(|field| field.to_string());

            let mut coordinates = Vec::new();
            for (position, field) in record.iter().enumerate() {
                if Some(position) == id_column || Some(position) == category_column { continue; }
                let field = field.trim();
                if field.is_empty() { continue; }
                let value : i64 = field.parse().map_err(|_| {
                    SlashError::invalid_input(row_name.clone(), format!("unparseable coordinate '{}'", field))
                })?;
                if value < 0 {
                    return Err(SlashError::invalid_input(row_name, format!("negative coordinate {}", value)));
                }
                if value > u32::max_value() as i64 {
                    return Err(SlashError::invalid_input(row_name, format!("coordinate {} exceeds 32 bits", value)));
                }
                coordinates.push(value as u32);
            }
            if coordinates.is_empty() {
                // Too short to be a point.
                continue;
            }
            match dimensions {
                None => dimensions = Some(coordinates.len()),
                Some(expected) if expected != coordinates.len() => {
                    return Err(SlashError::invalid_input(row_name,
                        format!("expected {} coordinates, found {}", expected, coordinates.len())));
                },
                _ => {}
            }
            if !seen_ids.insert(id.clone()) {
                return Err(SlashError::invalid_input(row_name, format!("duplicate id '{}'", id)));
            }

            points.push(Point::with_id(points.len(), &coordinates));
            ids.push(id);
            initial_categories.push(category);
        }
        Ok(Dataset { points, ids, initial_categories })
    }

    /// Load from the configured source: a file path or the standard input.
    pub fn load(config : &DataConfig) -> SlashResult<Dataset> {
        let text = match &config.input_data_file {
            DataSource::File(path) => fs::read_to_string(path)?,
            DataSource::Standard => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            },
            other => return Err(SlashError::Config(format!("'{}' is not a readable input source", other)))
        };
        Dataset::read_text(&text, config)
    }

    /// Do the points carry enough variety to cluster at all?
    fn degeneracy(&self) -> Option<String> {
        if self.points.len() < 2 {
            return Some(format!("{} point(s)", self.points.len()));
        }
        if self.points[0].dimensions() == 0 {
            return Some("zero dimensions".to_string());
        }
        let first = self.points[0].coordinates();
        if self.points.iter().all(|p| p.coordinates() == first) {
            return Some("all points identical".to_string());
        }
        None
    }

    /// Bits per dimension: the configured depth, or derived from the data.
    fn bits_for(&self, config : &ClusterConfig) -> usize {
        if config.index.bits_per_dimension > 0 {
            config.index.bits_per_dimension as usize
        }
        else {
            let max_coordinate = self.points.iter().map(|p| p.max_coordinate()).max().unwrap_or(0);
            bits_required(max_coordinate)
        }
    }

    /// Render the output labeling: one record per point with its id, label and
    /// coordinates, using the configured delimiter conventions.
    pub fn write_labels(&self, labels : &[String], config : &OutputConfig) -> String {
        let mut out = String::new();
        if config.write_header {
            out.push_str(&config.id_field);
            out.push(',');
            out.push_str(&config.category_field);
            if let Some(first) = self.points.first() {
                for dimension in 0..first.dimensions() {
                    out.push_str(&format!(",c{}", dimension));
                }
            }
            out.push('\n');
        }
        for (index, point) in self.points.iter().enumerate() {
            out.push_str(&self.ids[index]);
            out.push(',');
            out.push_str(&labels[index]);
            for &coordinate in point.coordinates() {
                out.push_str(&format!(",{}", coordinate));
            }
            out.push('\n');
        }
        out
    }

    /// Write the labeling to the configured destination.
    pub fn save_labels(&self, labels : &[String], config : &OutputConfig) -> SlashResult<()> {
        let rendered = self.write_labels(labels, config);
        match &config.output_data_file {
            DataSource::File(path) => { fs::write(path, rendered)?; },
            DataSource::Standard => { print!("{}", rendered); },
            DataSource::Suppress => {},
            other => return Err(SlashError::Config(format!("'{}' is not a writable output", other)))
        }
        Ok(())
    }
}

/// Run only the fast triage pass.
pub fn assess(dataset : &Dataset, config : &ClusterConfig) -> SlashResult<ClusteringTendency> {
    if dataset.degeneracy().is_some() {
        return Ok(ClusteringTendency::Unclustered);
    }
    let bits = dataset.bits_for(config);
    let map = CurveMap::plain(dataset.points[0].dimensions(), bits);
    let mut assessor = TendencyAssessor::new();
    assessor.outlier_size = config.index.budget.outlier_size;
    Ok(assessor.assess(&dataset.points, &map))
}

/// Run the full pipeline: curve search, single-link merging, density splitting.
///
/// The seed makes a run reproducible; pass a fresh seed for an exploratory run.
pub fn cluster(dataset : &Dataset, config : &ClusterConfig, seed : u64) -> SlashResult<ClusterOutcome> {
    config.validate()?;
    let mut watch = Stopwatch::start("cluster");

    if let Some(reason) = dataset.degeneracy() {
        warn!("degenerate data ({}); returning a single cluster", reason);
        return Ok(single_cluster_outcome(dataset));
    }

    watch.phase("curve search");
    let bits = dataset.bits_for(config);
    let search = config.curve_search();
    let found = search.search(&dataset.points, bits, seed);

    watch.phase("single-link merge");
    let classifier = config.classifier();
    let mut clustering = classifier.classify_with_distance(
        &dataset.points, &found.order, found.profile.linkage_square_distance);

    watch.phase("density split");
    let splitter = config.splitter();
    let splits = splitter.split_clusters(&dataset.points, &mut clustering, found.profile.linkage_square_distance);
    watch.finish_phase();

    let labels = render_labels(dataset, &clustering, &splits);
    info!("clustered {} points into {} clusters", dataset.points.len(), clustering.cluster_count());
    Ok(ClusterOutcome {
        clustering,
        labels,
        profile : found.profile,
        splits,
        bcubed_similarity : None,
        quality_shortfall : false
    })
}

/// Run the full pipeline on already-labeled input. The initial labels do not
/// steer the clustering; they serve as a gold standard for a BCubed self-test
/// whose shortfall is reported, not fatal.
pub fn recluster(dataset : &Dataset, config : &ClusterConfig, seed : u64) -> SlashResult<ClusterOutcome> {
    let mut outcome = cluster(dataset, config, seed)?;
    if let Some(gold) = initial_clustering(dataset) {
        let score = BCubed::compare(&outcome.clustering, &gold, 0.5);
        let similarity = score.similarity();
        outcome.bcubed_similarity = Some(similarity);
        if similarity < config.acceptable_bcubed {
            warn!("BCubed similarity {:.4} fell short of the acceptable {:.4}",
                similarity, config.acceptable_bcubed);
            outcome.quality_shortfall = true;
        }
        else {
            info!("BCubed similarity {:.4} meets the acceptable {:.4}", similarity, config.acceptable_bcubed);
        }
    }
    Ok(outcome)
}

/// Everything in one cluster, for degenerate inputs.
fn single_cluster_outcome(dataset : &Dataset) -> ClusterOutcome {
    let mut clustering = crate::clustering::integer_clustering();
    if !dataset.points.is_empty() {
        let category = clustering.add_to_new_cluster(0).unwrap();
        for index in 1..dataset.points.len() {
            clustering.add_to_cluster(index, category).unwrap();
        }
    }
    let labels = vec!["0".to_string(); dataset.points.len()];
    ClusterOutcome {
        clustering,
        labels,
        profile : CurveProfile::new(),
        splits : Vec::new(),
        bcubed_similarity : None,
        quality_shortfall : false
    }
}

/// Render one label per point. Categories print as their number; the parts of
/// a split cluster concatenate the parent and a sub-part ordinal, so `17`
/// becomes `17.0`, `17.1`, and so on.
fn render_labels(dataset : &Dataset, clustering : &PointClustering, splits : &[SplitRecord]) -> Vec<String> {
    let mut names : HashMap<usize, String> = HashMap::new();
    for record in splits {
        names.insert(record.parent, format!("{}.0", record.parent));
        for (ordinal, child) in record.children.iter().enumerate() {
            names.insert(*child, format!("{}.{}", record.parent, ordinal + 1));
        }
    }
    (0..dataset.points.len())
        .map(|index| {
            let category = clustering.get_category(index)
                .expect("every ingested point is clustered");
            names.get(&category).cloned().unwrap_or_else(|| category.to_string())
        })
        .collect()
}

/// Build the gold-standard clustering from the dataset's initial categories.
/// Points without a category each stand alone. Returns None when no point
/// carried a category.
fn initial_clustering(dataset : &Dataset) -> Option<Clustering<usize, usize, Range<usize>>> {
    if dataset.initial_categories.iter().all(|c| c.is_none()) { return None; }
    let mut interned : HashMap<&str, usize> = HashMap::new();
    let mut clustering = crate::clustering::integer_clustering();
    for (index, category) in dataset.initial_categories.iter().enumerate() {
        match category {
            Some(name) => {
                match interned.get(name.as_str()) {
                    Some(&existing) => { clustering.add_to_cluster(index, existing).unwrap(); },
                    None => {
                        let fresh = clustering.add_to_new_cluster(index).unwrap();
                        interned.insert(name.as_str(), fresh);
                    }
                }
            },
            None => { clustering.add_to_new_cluster(index).unwrap(); }
        }
    }
    Some(clustering)
}

#[cfg(test)]
/// Tests of ingest, output, and the degenerate paths.
mod tests {
    #[allow(unused_imports)]
    use spectral::prelude::*;
    use crate::config::{ClusterConfig, DataConfig, OutputConfig};
    use super::{cluster, Dataset};

    #[test]
    fn reads_comma_records_with_header() {
        let text = "id,category,x,y\np1,red,10,20\np2,blue,30,40\n";
        let dataset = Dataset::read_text(text, &DataConfig::default()).unwrap();
        assert_eq!(dataset.points.len(), 2);
        assert_eq!(dataset.ids, vec!["p1", "p2"]);
        assert_eq!(dataset.points[0].coordinates(), &[10, 20]);
        assert_eq!(dataset.initial_categories[1].as_deref(), Some("blue"));
    }

    #[test]
    fn reads_tab_records_positionally() {
        let text = "a\t5\t6\nb\t7\t8\n";
        let mut config = DataConfig::default();
        config.read_header = false;
        config.id_field = "1".to_string();
        config.category_field = String::new();
        let dataset = Dataset::read_text(text, &config).unwrap();
        assert_eq!(dataset.ids, vec!["a", "b"]);
        assert_eq!(dataset.points[1].coordinates(), &[7, 8]);
        assert!(dataset.initial_categories.iter().all(|c| c.is_none()));
    }

    #[test]
    fn synthesizes_row_number_ids() {
        let text = "3,4\n5,6\n";
        let mut config = DataConfig::default();
        config.read_header = false;
        config.id_field = "ROWNUM".to_string();
        config.category_field = String::new();
        let dataset = Dataset::read_text(text, &config).unwrap();
        assert_eq!(dataset.ids, vec!["1", "2"]);
        assert_eq!(dataset.points[0].coordinates(), &[3, 4]);
    }

    #[test]
    fn skips_blank_records() {
        let text = "id,category,x,y\np1,red,10,20\n,,,\np2,blue,30,40\n";
        let dataset = Dataset::read_text(text, &DataConfig::default()).unwrap();
        assert_eq!(dataset.points.len(), 2);
    }

    #[test]
    fn rejects_negative_coordinates_naming_the_record() {
        let text = "id,category,x,y\np1,red,10,-3\n";
        let error = Dataset::read_text(text, &DataConfig::default()).unwrap_err();
        let message = format!("{}", error);
        asserting(&message).that(&message.contains("row 1")).is_equal_to(true);
        asserting(&message).that(&message.contains("negative")).is_equal_to(true);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = "id,category,x,y\np1,red,10,20\np1,blue,30,40\n";
        let error = Dataset::read_text(text, &DataConfig::default()).unwrap_err();
        assert!(format!("{}", error).contains("duplicate id"));
    }

    #[test]
    fn rejects_ragged_dimension_counts() {
        let text = "id,category,x,y\np1,red,10,20\np2,blue,30,40,50\n";
        assert!(Dataset::read_text(text, &DataConfig::default()).is_err());
    }

    #[test]
    fn degenerate_data_returns_one_cluster() {
        let text = "id,category,x,y\np1,,10,20\np2,,10,20\np3,,10,20\n";
        let dataset = Dataset::read_text(text, &DataConfig::default()).unwrap();
        let outcome = cluster(&dataset, &ClusterConfig::default(), 1).unwrap();
        assert_eq!(outcome.clustering.cluster_count(), 1);
        assert_eq!(outcome.labels, vec!["0", "0", "0"]);
    }

    #[test]
    fn output_mirrors_input_shape() {
        let text = "id,category,x,y\np1,red,10,20\np2,blue,30,40\n";
        let dataset = Dataset::read_text(text, &DataConfig::default()).unwrap();
        let labels = vec!["7".to_string(), "7".to_string()];
        let rendered = dataset.write_labels(&labels, &OutputConfig::default());
        let lines : Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,category,c0,c1");
        assert_eq!(lines[1], "p1,7,10,20");
        assert_eq!(lines[2], "p2,7,30,40");
    }
}
