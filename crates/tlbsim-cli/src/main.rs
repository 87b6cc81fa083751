#![forbid(unsafe_code)]

// Native-only driver. A wasm32 stub `main` keeps `--workspace` builds for wasm targets compiling.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod render;
#[cfg(not(target_arch = "wasm32"))]
mod script;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs::File;
    use std::io::{self, BufRead, BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use clap::Parser;
    use serde::Serialize;
    use tlbsim_engine::{Engine, EngineConfig, SeedState};
    use tracing::{debug, warn};
    use tracing_subscriber::EnvFilter;

    use crate::render;
    use crate::script::{self, Command, InspectTarget};

    #[derive(Debug, Parser)]
    #[command(
        name = "tlbsim",
        about = "Replay a script of address translations against a TLB / page table model"
    )]
    pub struct Args {
        /// JSON engine configuration. Missing fields take their defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start with no pages and nothing resident instead of the demo layout.
        #[arg(long)]
        empty: bool,

        /// Number of physical frames.
        #[arg(long)]
        frames: Option<usize>,

        /// Number of TLB entries.
        #[arg(long)]
        tlb_entries: Option<usize>,

        /// Initial page table extent.
        #[arg(long)]
        pages: Option<u64>,

        /// Largest page table extent `add` may grow to.
        #[arg(long)]
        max_pages: Option<u64>,

        /// Keep only the newest N events.
        #[arg(long)]
        event_retention: Option<usize>,

        /// Script to run, one command per line. Reads stdin when omitted.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Emit one JSON document per command instead of text.
        #[arg(long)]
        json: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Format {
        Text,
        Json,
    }

    #[derive(Serialize)]
    struct Ack {
        ok: bool,
    }

    pub fn main() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(io::stderr)
            .init();

        let args = Args::parse();
        let config = build_config(&args)?;
        debug!(?config, "engine configuration");
        let mut engine = Engine::new(config).context("invalid engine configuration")?;

        let format = if args.json { Format::Json } else { Format::Text };
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());

        match &args.script {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open script: {}", path.display()))?;
                run_script(&mut engine, BufReader::new(file), &mut out, format)?;
            }
            None => run_script(&mut engine, io::stdin().lock(), &mut out, format)?,
        }

        out.flush().context("failed to flush stdout")?;
        Ok(())
    }

    fn build_config(args: &Args) -> Result<EngineConfig> {
        let mut config = match &args.config {
            Some(path) => load_config(path)?,
            None => EngineConfig::default(),
        };
        if args.empty {
            config.initial_pages = 0;
            config.seed = SeedState::empty();
        }
        if let Some(frames) = args.frames {
            config.frames = frames;
        }
        if let Some(tlb_entries) = args.tlb_entries {
            config.tlb_entries = tlb_entries;
        }
        if let Some(pages) = args.pages {
            config.initial_pages = pages;
        }
        if let Some(max_pages) = args.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(retain) = args.event_retention {
            config.event_retention = Some(retain);
        }
        Ok(config)
    }

    fn load_config(path: &Path) -> Result<EngineConfig> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Runs every command in `input`. Script mistakes are reported inline and skipped; only I/O
    /// failures abort.
    pub fn run_script<R: BufRead, W: Write>(
        engine: &mut Engine,
        input: R,
        out: &mut W,
        format: Format,
    ) -> Result<()> {
        for (idx, line) in input.lines().enumerate() {
            let line = line.context("failed to read script")?;
            let lineno = idx + 1;
            match script::parse_line(&line) {
                Ok(None) => {}
                Ok(Some(command)) => execute(engine, command, out, format)?,
                Err(err) => {
                    warn!(line = lineno, %err, "skipping script line");
                    match format {
                        Format::Text => writeln!(out, "error: line {lineno}: {err}")?,
                        Format::Json => write_json(
                            out,
                            &serde_json::json!({ "line": lineno, "error": err.to_string() }),
                        )?,
                    }
                }
            }
        }
        Ok(())
    }

    fn execute<W: Write>(
        engine: &mut Engine,
        command: Command,
        out: &mut W,
        format: Format,
    ) -> Result<()> {
        match command {
            Command::Translate(input) => {
                let outcome = engine.translate(&input);
                match format {
                    Format::Text => writeln!(out, "[{}] {outcome}", outcome.kind())?,
                    Format::Json => write_json(out, &outcome)?,
                }
            }
            Command::Add(page) => {
                let result = engine.add_page(page);
                report(out, format, result, || format!("added page {page}"))?;
            }
            Command::Delete(page) => {
                let result = engine.delete_page(page);
                report(out, format, result, || format!("deleted page {page}"))?;
            }
            Command::Snapshot => {
                let snap = engine.snapshot();
                match format {
                    Format::Text => write!(out, "{}", render::snapshot_tables(&snap))?,
                    Format::Json => write_json(out, &snap)?,
                }
            }
            Command::Events => match format {
                Format::Text => {
                    for record in engine.events().iter_newest_first() {
                        writeln!(out, "{}", render::event_line(record))?;
                    }
                }
                Format::Json => {
                    let records: Vec<_> = engine.events().iter_newest_first().collect();
                    write_json(out, &records)?;
                }
            },
            Command::Inspect(target) => {
                let description = match target {
                    InspectTarget::Page(page) => engine.inspect_page(page),
                    InspectTarget::TlbSlot(slot) => engine.inspect_tlb_slot(slot),
                    InspectTarget::Frame(frame) => engine.inspect_frame(frame),
                };
                let description =
                    description.unwrap_or_else(|| format!("{target} does not exist"));
                match format {
                    Format::Text => writeln!(out, "{description}")?,
                    Format::Json => {
                        write_json(out, &serde_json::json!({ "inspect": description }))?
                    }
                }
            }
            Command::Reset => {
                engine.reset();
                match format {
                    Format::Text => writeln!(out, "ok: reset")?,
                    Format::Json => write_json(out, &Ack { ok: true })?,
                }
            }
        }
        Ok(())
    }

    fn report<W: Write, E: std::fmt::Display + Serialize>(
        out: &mut W,
        format: Format,
        result: Result<(), E>,
        ok_message: impl FnOnce() -> String,
    ) -> Result<()> {
        match (format, result) {
            (Format::Text, Ok(())) => writeln!(out, "ok: {}", ok_message())?,
            (Format::Text, Err(err)) => writeln!(out, "error: {err}")?,
            (Format::Json, Ok(())) => write_json(out, &Ack { ok: true })?,
            (Format::Json, Err(err)) => write_json(out, &err)?,
        }
        Ok(())
    }

    fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
        serde_json::to_writer(&mut *out, value).context("failed to encode JSON output")?;
        writeln!(out)?;
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}
