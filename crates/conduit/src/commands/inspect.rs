//! Inspect command - summarize a snapshot file.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::Args;
use conduit_session::{SessionSnapshot, read_snapshot_file};
use conduit_store::StoreLimits;
use serde::Serialize;

use super::Context;

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Snapshot file to read (it is not deleted); defaults to
    /// `persistence.data_file`
    pub file: Option<PathBuf>,
}

/// Record and link counts for one persisted session.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub users: usize,
    pub articles: usize,
    pub comments: usize,
    pub follows: usize,
    pub favorites: usize,
    /// Whether restoring under the current limits would drop data.
    pub over_capacity: bool,
}

impl SessionSummary {
    fn new(session_id: &str, session: &SessionSnapshot, limits: &StoreLimits) -> Self {
        let users = session.users.objects.len();
        let articles = session.articles.objects.len();
        let comments = session.comments.objects.len();
        let follows = session.follows.len();
        let favorites = session.favorites.len();
        Self {
            session_id: session_id.to_string(),
            users,
            articles,
            comments,
            follows,
            favorites,
            over_capacity: users > limits.max_users
                || articles > limits.max_articles
                || comments > limits.max_comments
                || follows > limits.max_follows
                || favorites > limits.max_favorites,
        }
    }
}

/// Run the inspect command.
pub fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let file = args
        .file
        .or_else(|| ctx.loaded.config.persistence().data_file)
        .ok_or_else(|| anyhow!("no snapshot file given and persistence.data_file is not set"))?;
    let snapshot = read_snapshot_file(&file)
        .with_context(|| format!("failed to read snapshot {}", file.display()))?;
    let limits = super::container_config(&ctx.loaded.config).store_limits;
    let summaries: Vec<SessionSummary> = snapshot
        .sessions
        .iter()
        .map(|(id, session)| SessionSummary::new(id, session, &limits))
        .collect();
    tracing::debug!(sessions = summaries.len(), "Snapshot read");

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{} ({} sessions, oldest first)\n", file.display(), summaries.len());
    if summaries.is_empty() {
        return Ok(());
    }
    println!(
        "{:<38} {:>6} {:>9} {:>9} {:>8} {:>10}",
        "SESSION", "USERS", "ARTICLES", "COMMENTS", "FOLLOWS", "FAVORITES"
    );
    for s in &summaries {
        println!(
            "{:<38} {:>6} {:>9} {:>9} {:>8} {:>10}{}",
            s.session_id,
            s.users,
            s.articles,
            s.comments,
            s.follows,
            s.favorites,
            if s.over_capacity { "  *" } else { "" }
        );
    }
    if summaries.iter().any(|s| s.over_capacity) {
        println!("\n* exceeds current store limits; oldest records are dropped on restore");
    }
    Ok(())
}
