use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vignette::domain::{ConsumerHandle, DisplayContent, DisplayTarget};
use vignette::infrastructure::image::install;
use vignette::infrastructure::{
    AppConfig, CliArgs, ConfigStore, DispatchOutcome, ImageLoader, LoadStatus,
};

/// Display target that writes every image it is shown into a directory.
struct PngDirectory {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl PngDirectory {
    const fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            written: Mutex::new(Vec::new()),
        }
    }

    fn written(&self) -> Vec<PathBuf> {
        self.written.lock().clone()
    }
}

impl DisplayTarget for PngDirectory {
    fn show(&self, content: DisplayContent) {
        let images = match content {
            DisplayContent::Single(image) => vec![image],
            DisplayContent::Multiple(images) => images,
        };

        let mut written = self.written.lock();
        for image in images {
            let path = self.dir.join(format!("vignette-{}.png", written.len() + 1));
            match image.save(&path) {
                Ok(()) => written.push(path),
                Err(e) => error!(path = %path.display(), error = %e, "Failed to write image"),
            }
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let store =
        ConfigStore::new(args.config.as_deref()).wrap_err("Failed to locate config directory")?;
    let mut config = store.load().wrap_err("Failed to load configuration")?;
    config.merge_with_args(args);
    Ok(config)
}

fn consumer_for(args: &CliArgs, target: Arc<PngDirectory>) -> Result<ConsumerHandle> {
    let consumer = ConsumerHandle::new(target);
    let Some(path) = &args.error_placeholder else {
        return Ok(consumer);
    };
    let placeholder = image::open(path)
        .wrap_err_with(|| format!("Failed to open error placeholder {}", path.display()))?;
    Ok(consumer.with_error_placeholder(Arc::new(placeholder)))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = vignette::VERSION, urls = args.urls.len(), "Starting {}", vignette::NAME);

    std::fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create {}", args.output.display()))?;

    let (loader, mut dispatcher) = ImageLoader::from_config(&config.loader)
        .await
        .wrap_err("Failed to start image loader")?;
    let loader = install(loader)?;

    let target = Arc::new(PngDirectory::new(args.output.clone()));
    let consumer = consumer_for(&args, Arc::clone(&target))?;

    let outcome = match loader.load_batch(args.urls.as_slice(), &consumer, args.width, args.height)? {
        LoadStatus::Applied => DispatchOutcome::Applied,
        LoadStatus::Scheduled => dispatcher
            .next()
            .await
            .ok_or_else(|| eyre!("Loader stopped before delivering a result"))?,
    };

    let written = target.written();
    info!(outcome = ?outcome, files = written.len(), "Load finished");

    match outcome {
        DispatchOutcome::Applied | DispatchOutcome::PlaceholderApplied => {
            for path in &written {
                println!("{}", path.display());
            }
            if outcome == DispatchOutcome::PlaceholderApplied {
                bail!("Image could not be loaded, wrote error placeholder");
            }
            Ok(())
        }
        DispatchOutcome::Stale | DispatchOutcome::Dropped => bail!("Image could not be loaded"),
    }
}
