// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

mod json;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use opcdr::config::XCDR2_MAX_ALIGN;
use opcdr::ops::disassemble;
use opcdr::{ByteOrder, Codec, TopicDescriptor, TopicFlags, WireConfig};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use json::JsonView;

#[derive(Parser)]
#[command(name = "opcdr-inspect")]
#[command(about = "Validate, describe and exercise op-stream topic descriptors")]
#[command(version)]
struct Cli {
    /// Wire configuration file (YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Big-endian byte order
    #[arg(long, global = true)]
    big_endian: bool,

    /// XCDR2 alignment (primitives aligned to at most 4 bytes)
    #[arg(long, global = true)]
    xcdr2: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate descriptor files (YAML or JSON)
    Validate {
        /// Descriptor files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Show a summary of each valid descriptor
        #[arg(short, long)]
        verbose: bool,
    },

    /// Disassemble a descriptor and print its metadata
    Describe {
        /// Descriptor file
        #[arg(value_name = "FILE")]
        descriptor: PathBuf,
    },

    /// Encode a JSON sample
    Encode {
        /// Descriptor file
        #[arg(value_name = "FILE")]
        descriptor: PathBuf,

        /// JSON sample (`-` for stdin)
        #[arg(value_name = "JSON")]
        sample: PathBuf,

        /// Write raw bytes here instead of printing hex
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Prefix the encapsulation header
        #[arg(long)]
        payload: bool,
    },

    /// Decode bytes to a JSON sample
    Decode {
        /// Descriptor file
        #[arg(value_name = "FILE")]
        descriptor: PathBuf,

        /// Encoded bytes (`-` for stdin)
        #[arg(value_name = "BIN")]
        input: PathBuf,

        /// Input is hex text rather than raw bytes
        #[arg(long)]
        hex: bool,

        /// Input starts with an encapsulation header
        #[arg(long)]
        payload: bool,
    },

    /// Print the serialized key and key hash of a JSON sample
    Key {
        /// Descriptor file
        #[arg(value_name = "FILE")]
        descriptor: PathBuf,

        /// JSON sample (`-` for stdin)
        #[arg(value_name = "JSON")]
        sample: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let codec = Codec::new(wire_config(&cli)?);
    debug!("wire configuration: {:?}", codec.wire());

    match cli.command {
        Commands::Validate { inputs, verbose } => cmd_validate(&inputs, verbose),
        Commands::Describe { descriptor } => cmd_describe(&descriptor, &codec),
        Commands::Encode {
            descriptor,
            sample,
            output,
            payload,
        } => cmd_encode(&descriptor, &sample, output.as_deref(), payload, &codec),
        Commands::Decode {
            descriptor,
            input,
            hex,
            payload,
        } => cmd_decode(&descriptor, &input, hex, payload, &codec),
        Commands::Key { descriptor, sample } => cmd_key(&descriptor, &sample),
    }
}

fn wire_config(cli: &Cli) -> anyhow::Result<WireConfig> {
    let mut wire = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => WireConfig::default(),
    };
    if cli.big_endian {
        wire.byte_order = ByteOrder::Big;
    }
    if cli.xcdr2 {
        wire.max_align = XCDR2_MAX_ALIGN;
    }
    Ok(wire)
}

/// Parse a descriptor file without validating it.
fn parse_descriptor(path: &Path) -> anyhow::Result<TopicDescriptor> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let desc = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(desc)
}

fn load_descriptor(path: &Path) -> anyhow::Result<TopicDescriptor> {
    let desc = parse_descriptor(path)?;
    desc.validate()
        .with_context(|| format!("{} ({})", desc.type_name, path.display()))?;
    info!(
        "loaded type='{}' streams={} keys={}",
        desc.canonical_name(),
        desc.ops.len(),
        desc.key_count
    );
    Ok(desc)
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn read_sample(path: &Path) -> anyhow::Result<serde_json::Value> {
    let bytes = read_input(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_validate(inputs: &[PathBuf], verbose: bool) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for input in inputs {
        let result = parse_descriptor(input).and_then(|desc| {
            desc.validate()?;
            Ok(desc)
        });
        match result {
            Ok(desc) => {
                println!("[OK] {}: {}", input.display(), desc.canonical_name());
                if verbose {
                    println!("  streams: {}", desc.ops.len());
                    let keys: Vec<&str> = desc.keys.iter().map(|k| k.name.as_str()).collect();
                    println!("  keys: [{}]", keys.join(", "));
                    println!("  metadata: {}", if desc.meta.is_empty() { "no" } else { "yes" });
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("[ERROR] {}: {:#}", input.display(), err);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} descriptors failed validation", failed, inputs.len());
    }
    Ok(())
}

fn cmd_describe(path: &Path, codec: &Codec) -> anyhow::Result<()> {
    let desc = load_descriptor(path)?;

    println!("type: {}", desc.canonical_name());
    println!("host layout: size {} align {}", desc.size, desc.align);
    let mut flags = Vec::new();
    if desc.flags.contains(TopicFlags::NO_OPTIMIZE) {
        flags.push("NO_OPTIMIZE");
    }
    if desc.flags.contains(TopicFlags::FIXED_KEY) {
        flags.push("FIXED_KEY");
    }
    println!("flags: [{}]", flags.join(", "));
    match desc.fixed_wire_size(codec.wire()) {
        Some(size) => println!("wire size: {} bytes (fixed)", size),
        None => println!("wire size: variable"),
    }
    match desc.max_key_size() {
        Some(size) => println!("key size: at most {} bytes", size),
        None => println!("key size: unbounded"),
    }

    println!("\nkeys:");
    for (key, insn) in desc.keys.iter().zip(desc.key_instructions()?) {
        println!("  {:<16} @{:04}  {}", key.name, key.index, insn);
    }

    println!("\n{}", disassemble(&desc.ops));
    if desc.meta.is_empty() {
        println!("metadata: none");
    } else {
        println!("metadata:\n{}", desc.meta);
    }
    Ok(())
}

fn cmd_encode(
    path: &Path,
    sample: &Path,
    output: Option<&Path>,
    payload: bool,
    codec: &Codec,
) -> anyhow::Result<()> {
    let desc = load_descriptor(path)?;
    let value = read_sample(sample)?;
    let sample = JsonView::new(&desc)?.from_json(&value)?;

    let bytes = if payload {
        codec.serialize_payload(&desc, &sample)?
    } else {
        codec.serialize(&desc, &sample)?
    };
    debug!("encoded {} bytes", bytes.len());

    match output {
        Some(out) => {
            std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("[OK] {} bytes written to: {}", bytes.len(), out.display());
        }
        None => println!("{}", to_hex(&bytes)),
    }
    Ok(())
}

fn cmd_decode(
    path: &Path,
    input: &Path,
    hex: bool,
    payload: bool,
    codec: &Codec,
) -> anyhow::Result<()> {
    let desc = load_descriptor(path)?;
    let raw = read_input(input)?;
    let bytes = if hex {
        from_hex(std::str::from_utf8(&raw).context("hex input is not text")?)?
    } else {
        raw
    };

    let sample = if payload {
        codec.deserialize_payload_dynamic(&desc, &bytes)?
    } else {
        codec.deserialize_dynamic(&desc, &bytes)?
    };
    let value = JsonView::new(&desc)?.to_json(&sample)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &value)?;
    writeln!(stdout)?;
    Ok(())
}

fn cmd_key(path: &Path, sample: &Path) -> anyhow::Result<()> {
    let desc = load_descriptor(path)?;
    let value = read_sample(sample)?;
    let sample = JsonView::new(&desc)?.from_json(&value)?;

    let key = opcdr::extract_key(&desc, &sample)?;
    let hash = opcdr::key_hash(&desc, &sample)?;
    println!("key:      {}", to_hex(&key));
    println!("key hash: {}", to_hex(&hash));
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text; whitespace between digits is ignored.
fn from_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => bail!("invalid hex digits `{}{}`", pair[0], pair[1]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let bytes = [0x00, 0x01, 0xab, 0xff];
        assert_eq!(to_hex(&bytes), "00 01 ab ff");
        assert_eq!(from_hex("00 01\nabFF").expect("hex"), bytes);
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
    }

    #[test]
    fn test_cli_flags_shape_wire_config() {
        let cli = Cli::parse_from(["opcdr-inspect", "--big-endian", "--xcdr2", "describe", "t.yaml"]);
        let wire = wire_config(&cli).expect("wire");
        assert_eq!(wire.byte_order, ByteOrder::Big);
        assert_eq!(wire.max_align, XCDR2_MAX_ALIGN);
        assert_eq!(wire.encapsulation(), Some(opcdr::config::CDR2_BE));
    }
}
