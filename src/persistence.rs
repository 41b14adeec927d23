//! Result serialization and persistence
//!
//! This module saves search results as JSON (tables plus metadata) for the
//! CLI `info` command, and writes the result tables as plain CSV.

use crate::api::FastMks;
use crate::core::{Result, SearchMode, SearchStats, Table};
use crate::kernel::Kernel;
use crate::search::SearchResults;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Serializable search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableResults {
    /// Reference indices, one column per query
    pub indices: Table<usize>,
    /// Kernel values matching `indices`
    pub kernels: Table<f64>,
    /// Work counters of the search
    pub stats: SearchStats,
    /// Run metadata
    pub metadata: ResultsMetadata,
}

/// Metadata describing how results were produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsMetadata {
    /// Library version used to produce the results
    pub library_version: String,
    /// Traversal strategy
    pub mode: SearchMode,
    /// Kernel description including hyperparameters
    pub kernel: String,
    /// Results per query
    pub k: usize,
    /// Number of queries
    pub n_queries: usize,
    /// Number of reference points
    pub n_references: usize,
    /// Tree leaf size (unused by naive search)
    pub leaf_size: usize,
    /// Creation timestamp
    pub created_at: String,
}

impl SerializableResults {
    /// Wrap results produced by `engine`
    pub fn from_search<K: Kernel>(engine: &FastMks<'_, K>, results: SearchResults) -> Self {
        let metadata = ResultsMetadata {
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            mode: engine.mode(),
            kernel: engine.kernel().description(),
            k: results.k(),
            n_queries: results.n_queries(),
            n_references: engine.references().len(),
            leaf_size: engine.config().leaf_size,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        Self {
            indices: results.indices,
            kernels: results.kernels,
            stats: results.stats,
            metadata,
        }
    }

    /// Save results to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load results from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Drop the metadata
    pub fn into_results(self) -> SearchResults {
        SearchResults {
            indices: self.indices,
            kernels: self.kernels,
            stats: self.stats,
        }
    }

    /// Print results summary
    pub fn print_summary(&self) {
        println!("=== Max-Kernel Search Results ===");
        println!("Mode: {}", self.metadata.mode);
        println!("Kernel: {}", self.metadata.kernel);
        println!("k: {}", self.metadata.k);
        println!("Queries: {}", self.metadata.n_queries);
        println!("References: {}", self.metadata.n_references);
        println!("Leaf Size: {}", self.metadata.leaf_size);
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Work:");
        println!("  Kernel Evaluations: {}", self.stats.base_cases);
        println!("  Bound Evaluations: {}", self.stats.scores);
        println!("  Prunes: {}", self.stats.prunes);
    }
}

/// Write a table as CSV, one line per query holding its k entries
pub fn write_table_csv<T, P>(table: &Table<T>, path: P) -> Result<()>
where
    T: Copy + Display,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for column in table.columns() {
        let line: Vec<String> = column.iter().map(|value| value.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    writer.flush()?;
    Ok(())
}
