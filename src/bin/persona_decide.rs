//! persona-decide command-line binary.
//!
//! Loads a persona spec (legacy documents are migrated first), evaluates a
//! query against it and prints the decision as JSON.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: tracing filter (default: "warn,persona_engine=info")
//!
//! # Usage
//!
//! ```bash
//! persona-decide decide --spec coach.yaml --intent career_advice --text "Should I take the offer?"
//! persona-decide migrate --spec legacy.json
//! ```

use persona_engine::cli;

fn main() -> anyhow::Result<()> {
    // Initialize tracing; `log` records from the library are bridged in.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,persona_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args(std::env::args().skip(1))?;
    tracing::debug!(command = %args.command, "parsed arguments");

    let output = cli::run(&args)?;
    println!("{}", output);
    Ok(())
}
