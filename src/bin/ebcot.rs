//! ebcot CLI - EBCOT Tier-1 codec command-line utility.
//!
//! Encodes quantized wavelet coefficient tiles into framed token streams
//! and back. Tiles travel in little-endian binary containers produced by a
//! wavelet front-end; this tool covers the entropy-coding stage only.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use ebcot_rs::framing::{Delimiter, Token};
use ebcot_rs::{container, CodecConfig, EbcotCodec};

/// EBCOT Tier-1 codec for quantized wavelet coefficient tiles
#[derive(Parser)]
#[command(name = "ebcot")]
#[command(version)]
#[command(about = "Encode and decode JPEG 2000 Tier-1 codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    ebcot encode -i tiles.ebct -o streams.ebcs
    ebcot encode -i tiles.ebct -o streams.ebcs --accelerated --pool-size 8
    ebcot decode -i streams.ebcs -o tiles.ebct
    ebcot info -i streams.ebcs

CONTAINERS:
    .ebct  coefficient tile batch (little-endian, produced by a DWT front-end)
    .ebcs  framed token stream batch")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a tile container into a codestream container
    #[command(visible_alias = "e")]
    Encode {
        /// Input tile container
        #[arg(short, long)]
        input: PathBuf,

        /// Output codestream container
        #[arg(short, long)]
        output: PathBuf,

        /// Dispatch tiles across a worker pool
        #[arg(long)]
        accelerated: bool,

        /// Upper bound on worker threads
        #[arg(long, default_value = "8")]
        pool_size: usize,
    },

    /// Decode a codestream container back into tiles
    #[command(visible_alias = "d")]
    Decode {
        /// Input codestream container
        #[arg(short, long)]
        input: PathBuf,

        /// Output tile container
        #[arg(short, long)]
        output: PathBuf,

        /// Dispatch tiles across a worker pool
        #[arg(long)]
        accelerated: bool,

        /// Upper bound on worker threads
        #[arg(long, default_value = "8")]
        pool_size: usize,
    },

    /// Display framing statistics of a codestream container
    #[command(visible_alias = "i")]
    Info {
        /// Input codestream container
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            accelerated,
            pool_size,
        } => encode(&input, &output, accelerated, pool_size),
        Commands::Decode {
            input,
            output,
            accelerated,
            pool_size,
        } => decode(&input, &output, accelerated, pool_size),
        Commands::Info { input } => info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn codec_for(depth: usize, accelerated: bool, pool_size: usize) -> EbcotCodec {
    EbcotCodec::new(CodecConfig {
        depth,
        accelerated,
        max_pool_size: pool_size,
        ..Default::default()
    })
}

fn encode(
    input: &PathBuf,
    output: &PathBuf,
    accelerated: bool,
    pool_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(input)?);
    let (depth, tiles) = container::read_tiles(&mut reader)?;

    let codec = codec_for(depth, accelerated, pool_size);
    let codestreams = codec.encode(&tiles)?;

    let mut writer = BufWriter::new(File::create(output)?);
    container::write_codestreams(&mut writer, depth, &codestreams)?;

    let total: usize = codestreams.iter().map(Vec::len).sum();
    println!(
        "Encoded {} tile(s) at depth {} into {} token(s)",
        tiles.len(),
        depth,
        total
    );
    Ok(())
}

fn decode(
    input: &PathBuf,
    output: &PathBuf,
    accelerated: bool,
    pool_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(input)?);
    let (depth, codestreams) = container::read_codestreams(&mut reader)?;

    let codec = codec_for(depth, accelerated, pool_size);
    let tiles = codec.decode(&codestreams)?;

    let mut writer = BufWriter::new(File::create(output)?);
    container::write_tiles(&mut writer, depth, &tiles)?;

    println!("Decoded {} tile(s) at depth {}", tiles.len(), depth);
    Ok(())
}

fn info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(input)?);
    let (depth, codestreams) = container::read_codestreams(&mut reader)?;

    println!("Codestream container: depth {}, {} tile(s)", depth, codestreams.len());
    for (index, tokens) in codestreams.iter().enumerate() {
        let count = |d: Delimiter| tokens.iter().filter(|&&t| t == Token::from(d)).count();
        let bands = count(Delimiter::Band);
        let channels = if depth > 0 && bands % (3 * depth + 1) == 0 {
            bands / (3 * depth + 1)
        } else {
            0
        };
        println!(
            "  tile {}: {} tokens, {} block / {} row / {} band delimiters, {} channel(s)",
            index,
            tokens.len(),
            count(Delimiter::Block),
            count(Delimiter::Row),
            bands,
            channels,
        );
    }
    Ok(())
}
