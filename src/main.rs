use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use annotate_canvas::app::AnnotateApp;
use annotate_canvas::config::EditorConfig;
use annotate_canvas::ingest::ImageSource;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Image to open on startup.
    image: Option<PathBuf>,
    /// JSON file with editor defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let config = EditorConfig::load_or_default(args.config.as_deref())?;

    let title = match args.image.as_deref().and_then(|p| p.file_name()) {
        Some(name) => format!("annotate-canvas — {}", name.to_string_lossy()),
        None => "annotate-canvas".to_owned(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let initial = args.image.map(ImageSource::Path);
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotateApp::new(config, initial)))),
    )
    .map_err(|err| anyhow!("failed to run eframe: {err}"))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
