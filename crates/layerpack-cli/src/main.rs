//! Load the layers listed in a manifest and print what each one contains.

mod manifest;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use layerpack::{Image, LayerResult, LayersLoader, SessionState, WordEncoding};

use crate::manifest::{Manifest, ManifestError};

/// How encoded buffer files store their 16-bit words.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Encoding {
    /// UTF-8 text whose UTF-16 code units are the words.
    Utf8,
    /// Raw little-endian words.
    Utf16Le,
}

impl From<Encoding> for WordEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Utf8 => WordEncoding::Utf8,
            Encoding::Utf16Le => WordEncoding::Utf16Le,
        }
    }
}

#[derive(Parser)]
#[command(about = "Load delta-encoded mesh layers and summarise them")]
struct CliArgs {
    /// Path to the session manifest.
    manifest: PathBuf,

    /// Override the scratch buffer length (in 16-bit words).
    #[arg(long)]
    scratch_len: Option<usize>,

    /// Override the word encoding of buffer files.
    #[arg(long, value_enum)]
    encoding: Option<Encoding>,

    /// Cancel the session after this many layers have been received.
    #[arg(long)]
    cancel_after: Option<usize>,
}

#[derive(Debug)]
enum CliError {
    Manifest(ManifestError),
    Load(layerpack::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Manifest(e) => write!(f, "{e}"),
            CliError::Load(e) => write!(f, "{e}"),
        }
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<layerpack::Error> for CliError {
    fn from(e: layerpack::Error) -> Self {
        CliError::Load(e)
    }
}

fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), CliError> {
    let mut manifest = Manifest::load(&args.manifest)?;
    if let Some(scratch_len) = args.scratch_len {
        manifest.options.scratch_len = scratch_len;
    }
    if let Some(encoding) = args.encoding {
        manifest.options.word_encoding = encoding.into();
    }

    let store = manifest.store();
    let textures = manifest.texture_provider(store.clone());
    let loader = LayersLoader::new(store, textures, manifest.locators.clone())
        .with_options(manifest.options.clone());

    tracing::info!(
        layers = manifest.layers.len(),
        resources = manifest.resources.len(),
        "starting session"
    );

    let (dispatcher, results) = layerpack::channel::<Image>();
    let session = loader.spawn(manifest.layers.clone(), dispatcher)?;

    let mut received = 0;
    while let Ok(layer) = results.recv_blocking() {
        print_layer(&layer);
        received += 1;
        if args.cancel_after.is_some_and(|limit| received >= limit) {
            tracing::info!(received, "cancelling session");
            session.cancel();
        }
    }

    let outcome = session.join();
    let state = SessionState::of(&outcome);
    let report = outcome.inspect_err(|_| println!("session {state}"))?;
    println!(
        "session {state}: {} delivered, {} skipped, {} groups dropped, {} fetches, {} decode requests, {} scratch chunks",
        report.layers_delivered,
        report.layers_skipped,
        report.groups_dropped,
        report.fetches,
        report.decode_requests,
        report.chunks_decoded,
    );
    Ok(())
}

fn print_layer(layer: &LayerResult<Image>) {
    let groups = layer.draw_groups();
    let vertices: usize = groups.iter().map(layerpack::DrawGroup::vertex_count).sum();
    let indices: usize = groups.iter().map(|g| g.indices.len()).sum();
    let textured = groups.iter().filter(|g| g.image.is_some()).count();

    println!(
        "layer {}: {} groups ({} with images), {} vertices, {} indices, colors 1..={}{}",
        layer.layer_id(),
        groups.len(),
        textured,
        vertices,
        indices,
        layer.max_color_index(),
        if layer.is_final_layer() { " [final]" } else { "" },
    );

    for (position, group) in groups.iter().enumerate() {
        for primitive in &group.primitives {
            println!(
                "  group {position}: {} indices {}..{}",
                primitive.geometry,
                primitive.index_offset,
                primitive.index_offset + primitive.index_count
            );
        }
    }
}
