use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageFormat;
use tracing::debug;

use leaf_doctor::helpers::render_report;
use leaf_doctor::logging::{init_logging, LogConfig};
use leaf_doctor::service::validate_upload;
use leaf_doctor::{
    load_catalog, Args, DetectError, Detector, DetectorConfig, DiseaseCatalog, ErrorBody, PreprocessConfig,
    ServiceError, Upload, MAX_UPLOAD_BYTES,
};

/// Reads a file and applies the same checks an HTTP upload would get. The
/// content type is guessed from the extension.
fn read_upload(path: &Path) -> Result<std::result::Result<Vec<u8>, ServiceError>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let content_type = ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    Ok(validate_upload(Some(Upload::new(bytes, content_type)), MAX_UPLOAD_BYTES)
        .map(|upload| upload.bytes)
        .map_err(ServiceError::from))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_config = if args.verbose { LogConfig::verbose() } else { LogConfig::default() };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    let catalog = match &args.catalog {
        Some(path) => load_catalog(path).with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => DiseaseCatalog::builtin(),
    };
    let config = DetectorConfig {
        preprocess: PreprocessConfig {
            filter: args.filter,
            ..PreprocessConfig::default()
        },
        decode_policy: args.decode_policy,
    };
    let detector = Detector::new(config, Arc::new(catalog));

    let uploads = args
        .source
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;
    let accepted: Vec<&[u8]> = uploads
        .iter()
        .filter_map(|upload| upload.as_ref().ok().map(Vec::as_slice))
        .collect();

    let t = Instant::now();
    let mut diagnosed = detector.diagnose_batch(&accepted).into_iter();
    debug!(images = accepted.len(), elapsed = ?t.elapsed(), "batch diagnosed");

    let mut failures = 0;
    for (path, upload) in args.source.iter().zip(uploads) {
        let outcome = match upload {
            Ok(_) => match diagnosed.next() {
                Some(result) => result.map_err(ServiceError::from),
                None => Err(ServiceError::Detect(DetectError::Processing("missing batch result".to_string()))),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) if args.json => println!("{}", serde_json::to_string_pretty(&result)?),
            Ok(result) => println!("{}", render_report(Some(&path.display().to_string()), &result)),
            Err(e) => {
                failures += 1;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&ErrorBody::from(&e))?);
                } else {
                    eprintln!("{}: {}", path.display(), e);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images could not be diagnosed", failures, args.source.len());
    }
    Ok(())
}
