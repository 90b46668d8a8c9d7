use clap::{Parser, Subcommand};
use cli::{Cutout, load_bitmap, load_config, read_mask, write_upload};
use color_eyre::eyre::Result;
use segment::ScaleParameters;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the scale parameters for a bitmap size
    Scale {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Write the upload-resized PNG sent for embedding extraction
    Upload {
        /// Source image
        #[arg(short, long)]
        image: PathBuf,
        /// Destination PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Session configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Trace a raw mask and write the two-tone cutout
    Render {
        /// Source image
        #[arg(short, long)]
        image: PathBuf,
        /// Packed little-endian f32 mask at upload resolution
        #[arg(short, long)]
        mask: PathBuf,
        #[arg(long)]
        mask_width: u32,
        #[arg(long)]
        mask_height: u32,
        /// Destination PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the traced outline as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
        /// Session configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Scale { width, height } => {
            if *width == 0 || *height == 0 {
                color_eyre::eyre::bail!("bitmap dimensions must be non-zero, got {width}x{height}");
            }
            let scale = ScaleParameters::resolve(*width, *height);
            println!("{}", serde_json::to_string_pretty(&scale)?);
        }
        Commands::Upload { image, output, config } => {
            upload(image, output, config.as_deref()).await?;
        }
        Commands::Render {
            image,
            mask,
            mask_width,
            mask_height,
            output,
            geojson,
            config,
        } => {
            render(
                image,
                mask,
                (*mask_width, *mask_height),
                output,
                geojson.as_deref(),
                config.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

async fn upload(image: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let bitmap = load_bitmap(image)?;
    info!("Loaded {:?} ({}x{})", image, bitmap.width(), bitmap.height());

    let request = write_upload(&bitmap, &config, output)?;
    info!(
        "Wrote {} upload raster {}x{} to {:?}",
        request.mime_type, request.width, request.height, output
    );
    Ok(())
}

async fn render(
    image: &Path,
    mask: &Path,
    (mask_width, mask_height): (u32, u32),
    output: &Path,
    geojson: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let bitmap = load_bitmap(image)?;
    let mask = read_mask(mask, mask_width, mask_height)?;
    info!(
        "Tracing {}x{} mask over {}x{} image",
        mask_width,
        mask_height,
        bitmap.width(),
        bitmap.height()
    );

    let cutout = Cutout::render(&bitmap, &mask, &config)?;

    if let Some(path) = geojson {
        cutout.outline.save_geojson(path)?;
        info!("Outline saved to {:?}", path);
    }

    match &cutout.rendered {
        Some(rendered) => {
            tokio::fs::write(output, rendered.encode_png()?).await?;
            info!("Cutout written to {:?} (bounds {:?})", output, rendered.bounds);
        }
        None => warn!("Mask selects nothing; no cutout written"),
    }

    println!("{}", serde_json::to_string_pretty(&cutout.summary())?);
    Ok(())
}
