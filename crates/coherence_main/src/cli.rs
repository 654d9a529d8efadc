use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coherence_domain::{EncodingStrategy, TaxonomyPreset};

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run scripted conversations against the configured model and print the
    /// batch report as JSON.
    Run {
        /// JSON file holding a list of scenarios, or an object with a
        /// `scenarios` list.
        #[arg(long, short)]
        scenarios: PathBuf,

        /// Only evaluate this strategy. Both strategies are evaluated and
        /// compared when omitted.
        #[arg(long)]
        strategy: Option<EncodingStrategy>,

        /// Violation patterns used for scoring.
        #[arg(long)]
        taxonomy: Option<TaxonomyPreset>,
    },

    /// Aggregate previously written results without calling the model.
    Analyze {
        /// A batch report or a list of conversation results.
        #[arg(long, short)]
        results: PathBuf,

        /// Score the recorded responses again with these patterns.
        #[arg(long)]
        taxonomy: Option<TaxonomyPreset>,
    },
}
