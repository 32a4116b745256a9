use std::path::Path;

use faceset_media::detector::find_model_path;
use faceset_media::probe_video;
use faceset_worker::executor::scan_videos;
use faceset_worker::WorkerConfig;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with input_dir={}",
        config.input_dir.display()
    );
    ensure_input_dir(&config.input_dir)?;
    ensure_model(&config)?;
    ensure_metadata(&config)?;
    ensure_decoder(&config)?;

    println!("worker-selfcheck: ok");
    Ok(())
}

fn ensure_input_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "input dir does not exist: {}",
            path.display()
        ));
    }
    // A run must be able to create label and work directories here.
    let probe = path.join(".faceset-writable");
    std::fs::write(&probe, b"")
        .map_err(|e| anyhow::anyhow!("input dir not writable: {}", e))?;
    std::fs::remove_file(&probe)?;
    Ok(())
}

fn ensure_model(config: &WorkerConfig) -> anyhow::Result<()> {
    match find_model_path(config.extraction.model_path.as_deref()) {
        Some(path) => {
            println!("worker-selfcheck: YuNet model at {}", path.display());
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "no YuNet model found; set FACESET_YUNET_MODEL or place the ONNX file under ./models/"
        )),
    }
}

/// Probe the first video to prove the videoio backend can open this
/// dataset before a long batch starts.
fn ensure_decoder(config: &WorkerConfig) -> anyhow::Result<()> {
    let videos = scan_videos(&config.input_dir)?;
    match videos.first() {
        Some(first) => {
            let info = probe_video(first)?;
            println!(
                "worker-selfcheck: decoder ok ({} is {}x{} at {:.2} fps)",
                first.display(),
                info.width,
                info.height,
                info.fps
            );
        }
        None => println!("worker-selfcheck: no .mp4 files yet, decoder not exercised"),
    }
    Ok(())
}

fn ensure_metadata(config: &WorkerConfig) -> anyhow::Result<()> {
    if matches!(
        config.label_source,
        faceset_models::LabelSource::Metadata
    ) {
        let path = config.metadata_path();
        if !path.is_file() {
            return Err(anyhow::anyhow!(
                "dataset mode but metadata file missing: {}",
                path.display()
            ));
        }
    }
    Ok(())
}
