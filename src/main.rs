use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use taskdump::cli::Cli;
use taskdump::config::TaskdumpConfig;
use taskdump::dump::Renderer;
use taskdump::loader::DumpLoader;
use taskdump::session::{Flow, Session, SessionOptions};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` turns on TRACE, otherwise RUST_LOG decides
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = match &args.config {
        Some(path) => TaskdumpConfig::from_file(path)?,
        None => TaskdumpConfig::default(),
    };

    let options = SessionOptions {
        loader: DumpLoader::new(config.loader.header_prefix.clone()),
        renderer: Renderer::new(config.display.color && !args.no_color),
        format: args.format,
        search_limit: config.display.search_limit,
    };
    let mut session = Session::new(options.clone());

    if let Some(path) = &args.dump {
        let dump = options
            .loader
            .load_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        session.insert("original", dump);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.exec.is_empty() {
        // Non-interactive: the first failing statement is fatal
        for statement in &args.exec {
            if session.execute(statement, &mut out)? == Flow::Exit {
                break;
            }
        }
        return Ok(());
    }

    if let Some(script) = &args.script {
        let file = File::open(script)
            .with_context(|| format!("Failed to open script {}", script.display()))?;
        return session.run(BufReader::new(file), &mut out, &mut io::stderr(), false);
    }

    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    session.run(stdin.lock(), &mut out, &mut io::stderr(), prompt)
}
