use anyhow::Context;
use clap::{Parser, Subcommand};
use csv_uploader::{
    config::Config,
    models::{SelectedFile, WorkflowState},
    tui,
    upload::{self, HttpBackend, UploadController},
    utils,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "csv-uploader", version, about = "Upload a CSV for normalization")]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend endpoint, overriding configuration
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload one file and print the output link
    Upload {
        /// File to upload
        path: PathBuf,

        /// Declared MIME type instead of the one guessed from the extension
        #[arg(long)]
        content_type: Option<String>,

        /// Also save the output file into this directory
        #[arg(long)]
        download_to: Option<PathBuf>,
    },
    /// Interactive terminal widget (default)
    Tui,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_env(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }

    match cli.command.unwrap_or(Command::Tui) {
        Command::Upload {
            path,
            content_type,
            download_to,
        } => {
            utils::init_logger();
            upload_once(config, path, content_type, download_to).await
        }
        Command::Tui => {
            let _guard = utils::init_file_logger(&config.log_dir)?;
            tui::run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn upload_once(
    config: Config,
    path: PathBuf,
    content_type: Option<String>,
    download_to: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let mut file = SelectedFile::from_path(&path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    if let Some(content_type) = content_type {
        file = file.with_content_type(content_type);
    }

    let backend = HttpBackend::from_config(&config)?;
    let client = backend.client().clone();
    let mut controller = UploadController::new(Arc::new(backend), config.notice_timeout());

    let link = match controller.handle_selection(Some(file)).await {
        WorkflowState::Succeeded(link) => link.clone(),
        WorkflowState::Failed(message) => {
            eprintln!("{}", message);
            return Ok(ExitCode::FAILURE);
        }
        state => anyhow::bail!("Upload ended in unexpected state {:?}", state),
    };

    println!("{}", link);

    if let Some(dir) = download_to.or(config.download_dir) {
        let saved = upload::download_output(&client, &link, &dir)
            .await
            .context("Failed to download output file")?;
        info!(path = %saved.display(), "Downloaded output");
        println!("{}", saved.display());
    }

    controller.dismiss_result();
    Ok(ExitCode::SUCCESS)
}
