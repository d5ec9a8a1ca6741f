use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use analytics_client::{AnalysisClient, ClientConfig, ProgressFn, Workspace};
use anyhow::Result;
use serde_json::json;
use tracing::info;
use zone_common::geometry::Size;
use zone_common::zone::ZoneRegistry;

/// Headless analysis: loads the media and a zone layout, uploads, prints the stats as JSON.
pub async fn analyze(
    config: &ClientConfig,
    input: &Path,
    zones: &Path,
    output: Option<&Path>,
    frame_size: Option<Size>,
) -> Result<()> {
    let mut workspace = Workspace::from_config(config);
    workspace.load_media(input, frame_size)?;

    let registry = ZoneRegistry::load_from(zones)?;
    info!("loaded {} zone(s) from {}", registry.len(), zones.display());
    workspace.load_zones(registry);

    let job = workspace.prepare_analysis()?;
    let client = AnalysisClient::new(config.upload_url());
    let progress: ProgressFn = Arc::new(|pct: u8| {
        eprint!("\rUploading... {pct:>3}%");
        let _ = std::io::stderr().flush();
    });
    let outcome = client.analyze(&job, Some(progress)).await;
    eprintln!();
    workspace.complete_analysis(job.run_id, outcome);

    if let Some(notice) = workspace.notice(Instant::now()) {
        eprintln!("{}", notice.message);
    }
    let (Some(stats), Some(metadata)) = (workspace.stats(), workspace.metadata()) else {
        anyhow::bail!("Analysis failed");
    };

    let report = json!({
        "stats": stats,
        "density_level": stats.density_label(),
        "detections": metadata.detections,
        "zone_summary": metadata.zone_summary,
        "zone_density": metadata.zone_density,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = output {
        workspace.save_result(path)?;
    }
    Ok(())
}
