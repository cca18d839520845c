//! from-linear command - stage Linear issues on disk

use byelinear_core::{Config, Migration, Secrets};
use byelinear_linear::LinearClient;
use byelinear_store::StagingStore;
use clap::Args;

use super::run_cancellable;

/// Fetch every Linear issue into the corpus, resuming from the checkpoint
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Issues per page (overrides config and env)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Resume before this issue id instead of the checkpoint
    #[arg(long)]
    pub cursor: Option<String>,
}

impl FetchArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let secrets = Secrets::load()?;
        let source = LinearClient::from_secrets(&secrets)?.with_issue_number(config.issue_number);

        let report = run_cancellable(move |cancel| async move {
            let mut store = StagingStore::open(&config.corpus)?;
            let report = Migration::new(&config, &mut store, cancel).fetch(&source).await?;
            Ok(report)
        })
        .await?;

        println!();
        println!("Fetched {} issues in {} pages", report.records, report.pages);
        if report.duplicates > 0 {
            println!("  {} already staged", report.duplicates);
        }
        if report.retries > 0 {
            println!("  {} failed attempts retried", report.retries);
        }
        Ok(())
    }
}
