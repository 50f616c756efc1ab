use std::env;
use std::path::PathBuf;

use clap::Parser;
use layers::OverlayCategory;
use runtime::config::ViewerConfig;
use runtime::session::{MapSession, SessionReport};
use serde::Serialize;
use streaming::{DatasetLoader, LoadReport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod fetch;

use fetch::SourceFetcher;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Loads the point, line and polygon overlays and prints the resulting map state as JSON"
)]
struct Args {
    /// Viewer config file (JSON); missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL or directory that relative dataset paths resolve against
    /// (default: $ATLAS_DATA_BASE)
    #[arg(long)]
    base_url: Option<String>,

    /// Points dataset URL or path
    #[arg(long)]
    points: Option<String>,

    /// Lines dataset URL or path
    #[arg(long)]
    lines: Option<String>,

    /// Polygons dataset URL or path
    #[arg(long)]
    polygons: Option<String>,

    /// Viewport width in pixels used for fit-to-bounds
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height in pixels used for fit-to-bounds
    #[arg(long)]
    height: Option<f64>,

    /// Background layer to select once loading is done
    #[arg(long)]
    base_layer: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    load: &'a LoadReport,
    #[serde(flatten)]
    session: SessionReport,
}

/// Layers command-line overrides onto a config and resolves relative
/// dataset paths.
fn apply_overrides(
    config: &mut ViewerConfig,
    args: &Args,
    env_base: Option<&str>,
) -> Result<(), runtime::config::ConfigError> {
    let overrides = [
        (OverlayCategory::Points, &args.points),
        (OverlayCategory::Lines, &args.lines),
        (OverlayCategory::Polygons, &args.polygons),
    ];
    for (category, url) in overrides {
        if let Some(url) = url {
            config.datasets.set_url(category, url.as_str());
        }
    }
    if let Some(width) = args.width {
        config.viewport_px[0] = width;
    }
    if let Some(height) = args.height {
        config.viewport_px[1] = height;
    }
    config.validate()?;

    if let Some(base) = args.base_url.as_deref().or(env_base) {
        config.resolve_against(base);
    }
    Ok(())
}

async fn load_config(args: &Args) -> Result<ViewerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            ViewerConfig::from_json_str(&text)?
        }
        None => ViewerConfig::default(),
    };
    let env_base = env::var("ATLAS_DATA_BASE").ok();
    apply_overrides(&mut config, args, env_base.as_deref())?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args).await?;

    let mut session = MapSession::new(&config);
    let fetcher = SourceFetcher::new();
    let loader = DatasetLoader::for_config(&fetcher, &config);
    for request in loader.requests() {
        info!(category = %request.category, url = %request.url, "requesting dataset");
    }
    let load = loader.load_into(&mut session).await;

    if let Some(name) = &args.base_layer {
        session.select_base_layer(name)?;
    }

    if load.failed.is_empty() {
        info!("all {} datasets loaded", load.loaded.len());
    } else {
        warn!(
            "{} of {} datasets failed",
            load.failed.len(),
            load.loaded.len() + load.failed.len()
        );
    }

    let report = Report {
        load: &load,
        session: session.report(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("viewer_native").chain(extra.iter().copied()))
    }

    #[test]
    fn flag_overrides_env_base() {
        let mut config = ViewerConfig::default();
        apply_overrides(
            &mut config,
            &args(&["--base-url", "https://maps.example.org/site"]),
            Some("/srv/ignored"),
        )
        .expect("overrides");
        assert_eq!(
            config.datasets.points,
            "https://maps.example.org/site/data/points.geojson"
        );
    }

    #[test]
    fn env_base_is_the_fallback() {
        let mut config = ViewerConfig::default();
        apply_overrides(&mut config, &args(&[]), Some("/srv/site")).expect("overrides");
        assert_eq!(config.datasets.polygons, "/srv/site/data/data/data/polygons.geojson");
    }

    #[test]
    fn per_category_urls_and_viewport() {
        let mut config = ViewerConfig::default();
        apply_overrides(
            &mut config,
            &args(&[
                "--lines",
                "https://other.example.org/roads.geojson",
                "--width",
                "800",
                "--height",
                "600",
            ]),
            Some("/srv/site"),
        )
        .expect("overrides");
        assert_eq!(config.datasets.lines, "https://other.example.org/roads.geojson");
        assert_eq!(config.datasets.points, "/srv/site/data/points.geojson");
        assert_eq!(config.viewport_px, [800.0, 600.0]);
    }

    #[test]
    fn rejects_empty_viewport() {
        let mut config = ViewerConfig::default();
        let err = apply_overrides(&mut config, &args(&["--width", "0"]), None).unwrap_err();
        assert!(err.to_string().contains("viewport_px"));
    }
}
