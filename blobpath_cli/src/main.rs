use anyhow::Context;
use blobpath_core::{BlobPath, ByteSize, Executor, Settings};
use blobpath_store_url::{UrlBlobStore, UrlStoreConfig};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use config::{BlobpathConfig, ConfiguredStore, create_store};
use std::path::PathBuf;
use tokio_util::io::StreamReader;

mod config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file declaring the available stores
    #[arg(short, long, value_name = "FILE", env = "BLOBPATH_CONFIG")]
    config: Option<PathBuf>,

    /// which configured store this command should run on
    #[arg(short, long, value_name = "NAME", default_value = "default")]
    store: String,

    /// Read from an ad-hoc URL store, ignoring any config file
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Chunk size for reads from an ad-hoc URL store, e.g. "64kb"
    #[arg(long, value_name = "SIZE", requires = "url")]
    buffer_size: Option<ByteSize>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct Location {
    /// Path segment of the container, repeat for nested paths
    #[arg(short, long = "path", value_name = "SEG")]
    path: Vec<String>,
}

impl Location {
    fn blob_path(&self) -> BlobPath {
        self.path.iter().cloned().collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a blob to stdout
    Cat {
        #[command(flatten)]
        location: Location,
        name: String,
    },
    /// Print whether a blob exists
    Exists {
        #[command(flatten)]
        location: Location,
        name: String,
    },
    /// Print where a blob, or its container, lives in the store
    Locate {
        #[command(flatten)]
        location: Location,
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let store = open_store(&cli)?;
    let result = run_command(&store, cli.cmd).await;
    store.as_store().close();
    result
}

fn open_store(cli: &Cli) -> anyhow::Result<ConfiguredStore> {
    let executor = Executor::current();
    if let Some(url) = &cli.url {
        let mut settings = Settings::builder();
        if let Some(size) = cli.buffer_size {
            settings = settings.put(blobpath_core::settings::BUFFER_SIZE_SETTING, size);
        }
        let config = UrlStoreConfig {
            url: url.clone(),
            settings: settings.build(),
        };
        return Ok(ConfiguredStore::Url(UrlBlobStore::create(config, executor)?));
    }

    let file = cli
        .config
        .as_ref()
        .context("no store configured, pass --config FILE or --url URL")?;
    let config = BlobpathConfig::load(file)?;
    let store_config = config.store(&cli.store)?.clone();
    tracing::debug!(store = %cli.store, file = %file.display(), "opening configured store");
    Ok(create_store(store_config, executor)?)
}

async fn run_command(store: &ConfiguredStore, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Cat { location, name } => {
            let path = location.blob_path();
            let container = store.as_store().blob_container(&path)?;
            let stream = container.read_blob(&name).await?;
            let mut reader = StreamReader::new(stream);
            let mut stdout = tokio::io::stdout();
            let copied = tokio::io::copy(&mut reader, &mut stdout)
                .await
                .with_context(|| format!("failed to read blob {name} at {path}"))?;
            tokio::io::AsyncWriteExt::flush(&mut stdout).await?;
            tracing::info!(%path, name = %name, bytes = copied, "blob written to stdout");
        }
        Commands::Exists { location, name } => {
            let container = store.as_store().blob_container(&location.blob_path())?;
            println!("{}", container.blob_exists(&name).await?);
        }
        Commands::Locate { location, name } => {
            println!("{}", store.locate(&location.blob_path(), name.as_deref())?);
        }
    }
    Ok(())
}
