//! Streaming CLI around the library's `compress`/`decompress`: reads input in
//! `BLK_SIZE` chunks, writing each compressed chunk as a
//! `[4-byte little-endian length][frame bytes]` record. Decoding reverses
//! this one record at a time. This is a runnable plumbing example, not part
//! of the library's public contract.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;

use rans_codec::{compress, decompress, Order, BLK_SIZE};

#[derive(Parser, Debug)]
#[command(about = "Compress or decompress a stream with the order-0/order-1 rANS codec", long_about = None)]
struct Args {
    /// Model order to use when encoding (ignored when decoding).
    #[arg(short, long, default_value_t = 0)]
    order: u8,

    /// Decode instead of encode.
    #[arg(short, long)]
    decode: bool,

    /// Input path; reads stdin if omitted.
    input: Option<PathBuf>,

    /// Output path; writes stdout if omitted.
    output: Option<PathBuf>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn open_input(path: &Option<PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(p) => Ok(Box::new(BufReader::new(
            File::open(p).with_context(|| format!("opening input file {}", p.display()))?,
        ))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(path: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating output file {}", p.display()))?,
        ))),
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn run_encode(order: Order, mut input: Box<dyn Read>, mut output: Box<dyn Write>) -> Result<()> {
    let mut buf = vec![0u8; BLK_SIZE];
    loop {
        let mut filled = 0;
        while filled < BLK_SIZE {
            let n = input.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }

        let frame = compress(&buf[..filled], order)?;
        log::debug!("encoded {filled} bytes into a {}-byte frame", frame.len());
        output.write_all(&(frame.len() as u32).to_le_bytes())?;
        output.write_all(&frame)?;

        if filled < BLK_SIZE {
            break;
        }
    }
    output.flush()?;
    Ok(())
}

fn run_decode(mut input: Box<dyn Read>, mut output: Box<dyn Write>) -> Result<()> {
    loop {
        let mut len_bytes = [0u8; 4];
        match input.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let frame_len = u32::from_le_bytes(len_bytes) as usize;

        let mut frame = vec![0u8; frame_len];
        input
            .read_exact(&mut frame)
            .context("truncated record: frame shorter than its declared length")?;

        let decoded = decompress(&frame)?;
        log::debug!("decoded a {frame_len}-byte frame into {} bytes", decoded.len());
        output.write_all(&decoded)?;
    }
    output.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let input = open_input(&args.input)?;
    let output = open_output(&args.output)?;

    if args.decode {
        run_decode(input, output)
    } else {
        ensure!(args.order == 0 || args.order == 1, "order must be 0 or 1, got {}", args.order);
        let order = if args.order == 0 { Order::Zero } else { Order::One };
        run_encode(order, input, output)
    }
}
