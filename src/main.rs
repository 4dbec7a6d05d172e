use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use swarmgallery::bundle::{encode_base64, GenerationOutput};
use swarmgallery::index::{shard, GalleryIndex, Shard};
use swarmgallery::rendering::{self, Document};
use swarmgallery::{upload, GalleryConfig, GalleryItem, MemoryStore};

#[derive(Parser)]
#[command(
    name = "swarmgallery",
    version,
    about = "Gallery cards and Swarm uploads for generated NFTs"
)]
struct Cli {
    /// Bee API URL (defaults to $SWARM_BEE_API_URL or http://localhost:1633)
    #[arg(long, global = true)]
    bee_url: Option<String>,

    /// Bee debug API URL (defaults to $SWARM_BEE_DEBUG_API_URL or http://localhost:1635)
    #[arg(long, global = true)]
    bee_debug_url: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one generation result and print its retrieval URL
    Upload(UploadArgs),
    /// Render gallery items (JSON array) as HTML cards
    Render {
        items: PathBuf,
    },
    /// Build a keyword index from gallery items (JSON array)
    Index {
        items: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Query a local index or a sharded index stored on Swarm
    Search {
        #[arg(long, conflicts_with = "shards")]
        index: Option<PathBuf>,
        /// Swarm references of the three shards (defaults to
        /// $SHARD_SWARM_HASH_0..$SHARD_SWARM_HASH_2)
        #[arg(long, num_args = 3)]
        shards: Option<Vec<String>>,
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Split an index into shards, optionally uploading them
    Shard {
        index: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        upload: bool,
    },
}

#[derive(Args)]
struct UploadArgs {
    /// Generation output as JSON (imageBase64, description, poem, colors, metadata, gen)
    #[arg(long, conflicts_with = "image")]
    input: Option<PathBuf>,
    /// PNG image file
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    desc: Option<PathBuf>,
    #[arg(long)]
    poem: Option<PathBuf>,
    #[arg(long)]
    colors: Option<PathBuf>,
    #[arg(long)]
    metadata: Option<PathBuf>,
    #[arg(long)]
    generated: Option<PathBuf>,
    /// Poem and colors are plain text; convert them to HTML
    #[arg(long)]
    plain: bool,
    /// Store in memory instead of contacting the Bee node
    #[arg(long)]
    dry_run: bool,
}

fn read_text(path: &Option<PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        None => Ok(String::new()),
    }
}

fn read_items(path: &Path) -> anyhow::Result<Vec<GalleryItem>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn config(cli: &Cli) -> anyhow::Result<GalleryConfig> {
    let mut cfg = GalleryConfig::from_env()?;
    if let Some(u) = &cli.bee_url {
        cfg.service_url = u.parse().with_context(|| format!("invalid --bee-url {}", u))?;
    }
    if let Some(u) = &cli.bee_debug_url {
        cfg.admin_url = u.parse().with_context(|| format!("invalid --bee-debug-url {}", u))?;
    }
    Ok(cfg)
}

fn generation_output(args: &UploadArgs) -> anyhow::Result<GenerationOutput> {
    let mut output = match &args.input {
        Some(p) => {
            let bytes = std::fs::read(p).with_context(|| format!("reading {}", p.display()))?;
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", p.display()))?
        }
        None => {
            let Some(image) = &args.image else {
                bail!("either --input or --image is required");
            };
            let png = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
            GenerationOutput {
                image_base64: encode_base64(&png),
                description: read_text(&args.desc)?,
                poem: read_text(&args.poem)?,
                colors: read_text(&args.colors)?,
                metadata: read_text(&args.metadata)?,
                generated: read_text(&args.generated)?,
            }
        }
    };
    if args.plain {
        output.poem = rendering::text_to_html(&output.poem);
        output.colors = rendering::text_to_html(&output.colors);
    }
    Ok(output)
}

async fn run_upload(cfg: &GalleryConfig, args: &UploadArgs) -> anyhow::Result<()> {
    let output = generation_output(args)?;
    let url = if args.dry_run {
        let store = MemoryStore::new();
        upload(cfg, &output, &store, &store).await?
    } else {
        upload_to_bee(cfg, &output).await?
    };
    println!("{}", url);
    Ok(())
}

#[cfg(feature = "bee")]
async fn upload_to_bee(cfg: &GalleryConfig, output: &GenerationOutput) -> anyhow::Result<String> {
    let bundler = swarmgallery::ArtifactBundler::bee(cfg.clone())?;
    Ok(bundler.upload(output).await?)
}

#[cfg(not(feature = "bee"))]
async fn upload_to_bee(_cfg: &GalleryConfig, _output: &GenerationOutput) -> anyhow::Result<String> {
    bail!("built without the `bee` feature; use --dry-run")
}

#[cfg(feature = "bee")]
async fn search_shards(
    cfg: &GalleryConfig,
    refs: Option<&[String]>,
    words: &[String],
) -> anyhow::Result<Vec<GalleryItem>> {
    use swarmgallery::ShardedIndex;

    let client = swarmgallery::BeeClient::new(cfg.clone())?;
    let index = match refs {
        Some(refs) => ShardedIndex::new(refs.iter().cloned().map(Some).collect(), client)?,
        None => ShardedIndex::from_env(client)?,
    };
    Ok(index.query(words).await?)
}

#[cfg(not(feature = "bee"))]
async fn search_shards(
    _cfg: &GalleryConfig,
    _refs: Option<&[String]>,
    _words: &[String],
) -> anyhow::Result<Vec<GalleryItem>> {
    bail!("built without the `bee` feature; use --index")
}

#[cfg(feature = "bee")]
async fn upload_shards(cfg: &GalleryConfig, shards: &[Shard]) -> anyhow::Result<()> {
    let client = swarmgallery::BeeClient::new(cfg.clone())?;
    let batch = swarmgallery::select_batch(&client).await?;
    for (i, s) in shards.iter().enumerate() {
        let res = client.upload_shard(&batch.batch_id, s).await?;
        println!("{}{}={}", swarmgallery::index::shard::ENV_SHARD_PREFIX, i, res.reference);
    }
    Ok(())
}

#[cfg(not(feature = "bee"))]
async fn upload_shards(_cfg: &GalleryConfig, _shards: &[Shard]) -> anyhow::Result<()> {
    bail!("built without the `bee` feature")
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Upload(args) => run_upload(&config(&cli)?, args).await?,
        Command::Render { items } => {
            let mut doc = Document::new();
            for item in read_items(items)? {
                let card = rendering::render_result(&mut doc, &item);
                println!("{}", doc.to_html(card));
            }
        }
        Command::Index { items, out } => {
            let index = GalleryIndex::from_items(read_items(items)?);
            index.save(out)?;
            log::info!("indexed {} keywords into {}", index.trie().word_count(), out.display());
        }
        Command::Search { index, shards, words } => {
            let results = match index {
                Some(path) => GalleryIndex::load(path)?.query(words),
                None => search_shards(&config(&cli)?, shards.as_deref(), words).await?,
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Shard { index, out, upload } => {
            let shards = shard(&GalleryIndex::load(index)?);
            std::fs::create_dir_all(out)?;
            for (i, s) in shards.iter().enumerate() {
                let path = out.join(format!("shard_{}.json", i));
                std::fs::write(&path, s.to_json()?)?;
                log::info!("saved {}", path.display());
            }
            if *upload {
                upload_shards(&config(&cli)?, &shards).await?;
            }
        }
    }
    Ok(())
}
