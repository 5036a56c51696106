//! Config command - show the effective configuration.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only show which config files were checked and loaded
    #[arg(long)]
    pub path: bool,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    if args.path {
        cmd_path(ctx)
    } else {
        cmd_show(ctx)
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = ctx.loaded.config.resolved();
    super::container_config(&config).validate()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("# Conduit Configuration\n");

    let sources = ctx.loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        for source in &sources {
            println!("# loaded: {}", source.display());
        }
    }
    for warning in &ctx.loaded.warnings {
        println!("# warning: {}", warning);
    }
    println!();
    print!("{}", config.to_toml()?);

    if ctx.verbose {
        let sessions = config.sessions();
        println!(
            "\n# at most {} sessions, {} per address, isolation {}",
            sessions.max_sessions,
            sessions.max_sessions_per_address,
            if sessions.disable_isolation { "off" } else { "on" }
        );
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<_> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| json!({ "path": s.path.display().to_string(), "loaded": s.loaded }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!("\nCONDUIT_* environment variables override every file.");
    Ok(())
}
