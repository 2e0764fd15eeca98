use std::path::PathBuf;

use clap::Parser;

use crate::detector::DecodePolicy;
use crate::preprocess::ResampleFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Diagnose plant leaf diseases from photographs", long_about = None)]
pub struct Args {
    /// image path(s)
    #[arg(long, required = true, num_args = 1..)]
    pub source: Vec<PathBuf>,

    /// Print results as JSON instead of a text report
    #[arg(long)]
    pub json: bool,

    /// What to do with files that are not decodable images
    #[arg(long, value_enum, default_value_t = DecodePolicy::Fallback, env = "LEAF_DOCTOR_DECODE_POLICY")]
    pub decode_policy: DecodePolicy,

    /// JSON file replacing the built-in disease catalog
    #[arg(long, env = "LEAF_DOCTOR_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Resampling filter used to scale images to 224x224
    #[arg(long, value_enum, default_value_t = ResampleFilter::Bilinear)]
    pub filter: ResampleFilter,

    /// Log per-stage timings
    #[arg(short, long)]
    pub verbose: bool,
}
