#![forbid(unsafe_code)]
//! blockpat command line: destructively fill a block device with a
//! seed-keyed deterministic pattern, then read it back and verify it.

mod units;

use anyhow::{Context, Result, bail};
use blockpat::{
    ByteDevice, FileByteDevice, Geometry, PatternKind, Progress, ProgressSink, verify_pattern,
    write_pattern,
};
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use units::pretty_bytes;

const DEFAULT_LOGFILE: &str = "report.txt";
const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

// ── Configuration ───────────────────────────────────────────────────────────

struct Config {
    logfile: PathBuf,
    seed: Option<String>,
    no_write: bool,
    parsable: bool,
    binary_units: bool,
    block_size: usize,
    pattern: PatternKind,
    force: bool,
    json: bool,
    device: PathBuf,
}

fn print_usage() {
    println!("blockpat — write a deterministic pattern to a block device and verify it\n");
    println!("USAGE:");
    println!("  blockpat [OPTIONS] <device>\n");
    println!("ARGS:");
    println!("  <device>  Device or image file to test. All data on it will be");
    println!("            destroyed unless --no-write is given.\n");
    println!("OPTIONS:");
    println!("  -l, --logfile <path>     Log filename (default: {DEFAULT_LOGFILE})");
    println!("  -s, --seed <string>      Pattern seed (default: current unix time)");
    println!("  -n, --no-write           Do not write, only verify");
    println!("  -p, --parsable           Also write machine-parsable lines to the log file");
    println!("      --binary-units       Use base-2 units (1 kiB = 1024 bytes)");
    println!("      --blocksize <bytes>  Block size in bytes (default: {DEFAULT_BLOCK_SIZE})");
    println!("      --pattern <name>     Pattern generator: aes-cbc or chacha20 (default: aes-cbc)");
    println!("      --force              Skip the destructive-action confirmation");
    println!("      --json               Print the final verification report as JSON");
    println!("  -h, --help               Show this help");
}

fn need_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().with_context(|| format!("{flag} requires a value"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Config>> {
    let mut logfile = PathBuf::from(DEFAULT_LOGFILE);
    let mut seed = None;
    let mut no_write = false;
    let mut parsable = false;
    let mut binary_units = false;
    let mut block_size = DEFAULT_BLOCK_SIZE;
    let mut pattern = PatternKind::AesCbc;
    let mut force = false;
    let mut json = false;
    let mut device: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-l" | "--logfile" => logfile = PathBuf::from(need_value(&mut args, "--logfile")?),
            "-s" | "--seed" => seed = Some(need_value(&mut args, "--seed")?),
            "-n" | "--no-write" => no_write = true,
            "-p" | "--parsable" => parsable = true,
            "--binary-units" => binary_units = true,
            "--blocksize" => {
                let value = need_value(&mut args, "--blocksize")?;
                block_size = value
                    .parse()
                    .with_context(|| format!("invalid --blocksize value: {value}"))?;
            }
            "--pattern" => {
                let value = need_value(&mut args, "--pattern")?;
                pattern = PatternKind::from_name(&value)
                    .with_context(|| format!("unknown pattern: {value}"))?;
            }
            "--force" => force = true,
            "--json" => json = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            other if other.starts_with('-') => {
                print_usage();
                bail!("unknown option: {other}");
            }
            _ => {
                if device.is_some() {
                    bail!("more than one device argument given");
                }
                device = Some(PathBuf::from(arg));
            }
        }
    }

    let Some(device) = device else {
        print_usage();
        bail!("missing device argument");
    };

    Ok(Some(Config {
        logfile,
        seed,
        no_write,
        parsable,
        binary_units,
        block_size,
        pattern,
        force,
        json,
        device,
    }))
}

// ── Log sink ────────────────────────────────────────────────────────────────

/// Tees timestamped status lines to stdout and an append-mode log file,
/// plus optional machine-parsable lines (log file only).
struct LogSink {
    logfile: File,
    parsable: bool,
    base1000: bool,
}

impl LogSink {
    fn open(config: &Config) -> Result<Self> {
        let logfile = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logfile)
            .with_context(|| format!("failed to open log file {}", config.logfile.display()))?;
        Ok(Self {
            logfile,
            parsable: config.parsable,
            base1000: !config.binary_units,
        })
    }

    fn pretty(&self, bytes: u64) -> String {
        pretty_bytes(bytes, self.base1000)
    }

    /// Write one timestamped line to stdout and the log file.
    fn logmsg(&mut self, msg: &str) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let line = format!("[{timestamp}] {msg}");
        println!("{line}");
        // Logging stays best-effort: a full log disk must not abort the scan.
        let _ = writeln!(self.logfile, "{line}");
    }

    fn parsable_line(&mut self, progress: &Progress) {
        if !self.parsable {
            return;
        }
        let tag = progress.phase.parsable_tag();
        let elapsed = progress.elapsed.as_secs_f64();
        let speed = progress.speed_bps.round() as u64;
        let line = match progress.phase {
            blockpat::Phase::Write => {
                format!("Parsable {tag} {elapsed:.3} {} {speed}", progress.position)
            }
            blockpat::Phase::Verify => format!(
                "Parsable {tag} {elapsed:.3} {} {speed} {}",
                progress.position, progress.correct_bytes
            ),
        };
        let _ = writeln!(self.logfile, "{line}");
    }
}

impl ProgressSink for LogSink {
    fn progress(&mut self, progress: &Progress) {
        let speed = progress.speed_bps.round() as u64;
        match progress.phase {
            blockpat::Phase::Write => {
                self.logmsg(&format!(
                    "Current writing position is {} ({:.1}%), writing speed is {}/sec",
                    self.pretty(progress.position),
                    progress.percent_done,
                    self.pretty(speed),
                ));
            }
            blockpat::Phase::Verify => {
                self.logmsg(&format!(
                    "Current reading position is {} ({:.1}%), reading speed is {}/sec. \
                     {} correct ({:.1}%), {} ({} bytes) incorrect.",
                    self.pretty(progress.position),
                    progress.percent_done,
                    self.pretty(speed),
                    self.pretty(progress.correct_bytes),
                    progress.percent_correct(),
                    self.pretty(progress.incorrect_bytes),
                    progress.incorrect_bytes,
                ));
            }
        }
        self.parsable_line(progress);
    }

    fn mismatch(&mut self, offset: u64, block_index: u64) {
        self.logmsg(&format!(
            "Verification error at {} (block index {block_index}).",
            self.pretty(offset)
        ));
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn confirm_destruction(config: &Config, disk_size: u64) -> Result<bool> {
    println!("You are about to erase device {}", config.device.display());
    println!("ALL DATA WILL BE LOST");
    println!(
        "{}: {} bytes = {}",
        config.device.display(),
        disk_size,
        pretty_bytes(disk_size, !config.binary_units)
    );
    print!("Continue (type 'YES'): ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']) == "YES")
}

fn run() -> Result<()> {
    let Some(config) = parse_args(env::args().skip(1))? else {
        return Ok(());
    };

    let device = FileByteDevice::open(&config.device, config.no_write)
        .with_context(|| format!("failed to open device {}", config.device.display()))?;
    let disk_size = device.len_bytes();

    if !config.force && !config.no_write && !confirm_destruction(&config, disk_size)? {
        println!("Aborted.");
        std::process::exit(1);
    }

    let seed = match &config.seed {
        Some(seed) => seed.clone(),
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?
            .as_secs()
            .to_string(),
    };

    let geometry = Geometry::new(disk_size, config.block_size)?;
    let mut generator = config.pattern.build(config.block_size, &seed)?;
    let mut sink = LogSink::open(&config)?;

    if !config.no_write {
        sink.logmsg(&format!(
            "Starting writing action onto {} ({} bytes = {}), {} full blocks of {} bytes + {} bytes. \
             Pattern {}, seed \"{}\".",
            config.device.display(),
            disk_size,
            pretty_bytes(disk_size, !config.binary_units),
            geometry.full_blocks(),
            geometry.block_size(),
            geometry.tail_len(),
            config.pattern.name(),
            seed,
        ));
        write_pattern(&device, &geometry, generator.as_mut(), &mut sink)?;
        sink.logmsg("Writing finished.");
    }

    sink.logmsg(&format!("Starting verification with seed \"{seed}\"."));
    let report = verify_pattern(&device, &geometry, generator.as_mut(), &mut sink)?;

    sink.logmsg(&format!(
        "Verification finished: {} correct, {} blocks, i.e., {} ({} bytes) incorrect",
        pretty_bytes(report.correct_bytes, !config.binary_units),
        report.approx_bad_blocks,
        pretty_bytes(report.incorrect_bytes, !config.binary_units),
        report.incorrect_bytes,
    ));

    if config.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Config>> {
        parse_args(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn defaults_with_device_only() {
        let config = parse(&["/dev/sdz"]).expect("parse").expect("config");
        assert_eq!(config.device, PathBuf::from("/dev/sdz"));
        assert_eq!(config.logfile, PathBuf::from(DEFAULT_LOGFILE));
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.pattern, PatternKind::AesCbc);
        assert!(config.seed.is_none());
        assert!(!config.no_write);
        assert!(!config.parsable);
        assert!(!config.binary_units);
        assert!(!config.force);
        assert!(!config.json);
    }

    #[test]
    fn all_flags_parse() {
        let config = parse(&[
            "-l",
            "run.log",
            "-s",
            "myseed",
            "-n",
            "-p",
            "--binary-units",
            "--blocksize",
            "4096",
            "--pattern",
            "chacha20",
            "--force",
            "--json",
            "image.bin",
        ])
        .expect("parse")
        .expect("config");
        assert_eq!(config.logfile, PathBuf::from("run.log"));
        assert_eq!(config.seed.as_deref(), Some("myseed"));
        assert!(config.no_write && config.parsable && config.binary_units);
        assert!(config.force && config.json);
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.pattern, PatternKind::ChaCha20);
        assert_eq!(config.device, PathBuf::from("image.bin"));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).expect("parse").is_none());
    }

    #[test]
    fn missing_device_is_an_error() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-n"]).is_err());
    }

    #[test]
    fn rejects_unknown_inputs() {
        assert!(parse(&["--frobnicate", "/dev/sdz"]).is_err());
        assert!(parse(&["--pattern", "xor", "/dev/sdz"]).is_err());
        assert!(parse(&["--blocksize", "lots", "/dev/sdz"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
    }
}
