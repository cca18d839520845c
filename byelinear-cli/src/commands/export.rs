//! to-github command - export staged issues

use byelinear_core::{Config, Migration, Secrets};
use byelinear_github::GitHubClient;
use byelinear_store::StagingStore;
use clap::Args;

use super::run_cancellable;

/// Export staged issues to a GitHub repository
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination organization (overrides config and env)
    #[arg(long)]
    pub org: Option<String>,

    /// Destination repository, either a name or owner/repo
    #[arg(long)]
    pub repo: Option<String>,
}

impl ExportArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let destination = config.destination()?;
        let secrets = Secrets::load()?;
        let client = GitHubClient::from_secrets(destination, &secrets)?;
        client.verify_repository().await?;

        let report = run_cancellable(move |cancel| async move {
            let mut store = StagingStore::open(&config.corpus)?;
            let report = Migration::new(&config, &mut store, cancel)
                .export(&client, client.repo_ref())
                .await?;
            Ok(report)
        })
        .await?;

        println!();
        println!("Exported {} issues", report.exported);
        if report.skipped_exported > 0 {
            println!("  {} already exported", report.skipped_exported);
        }
        if report.skipped_synthetic > 0 {
            println!("  {} placeholder issues skipped", report.skipped_synthetic);
        }
        if report.retries > 0 {
            println!("  {} failed attempts retried", report.retries);
        }
        Ok(())
    }
}
