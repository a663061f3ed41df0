use clap::Parser;
use docchat_context::text::{ChunkConfig, Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk text files into JSON output using docchat-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Window size for each chunk, in characters.
    #[arg(short = 's', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive chunks, in characters.
    #[arg(short = 'o', long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = ChunkConfig::new(args.chunk_size, args.overlap)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let chunker = Chunker::new(config);

    let chunks = chunker.chunk_indexed(&file_content);

    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{}", json_output);

    Ok(())
}
