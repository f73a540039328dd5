//! Cocktail CBR - case-based reasoning cocktail generator
//!
//! Retrieves the stored cocktail that is cheapest to repair for a query,
//! adapts it and keeps the approved result.

use cocktail_cbr::cli;

fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info to follow the reasoning)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run()
}
