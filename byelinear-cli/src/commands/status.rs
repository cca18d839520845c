//! Status command - show staging progress

use byelinear_core::Config;
use byelinear_store::{StagingStore, STATE_FILE};
use clap::Args;

/// Show how many staged issues are exported
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// List pending issue keys
    #[arg(short, long)]
    pending: bool,
}

impl StatusArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if !config.corpus.join(STATE_FILE).exists() {
            println!("No corpus at {}", config.corpus.display());
            println!("Run `byelinear from-linear` first");
            return Ok(());
        }

        let store = StagingStore::open(&config.corpus)?;
        let summary = store.summary();

        println!();
        println!("Corpus: {}", store.root().display());
        println!("  Staged:   {}", summary.total);
        println!("  Exported: {}", summary.exported);
        println!("  Pending:  {}", summary.pending);

        if let Some(last) = store.checkpoint().last_record() {
            println!("  Oldest fetched: {}", last.human_key);
        }

        let cache = store.cache();
        println!();
        println!("Destination cache:");
        println!("  Labels:   {}", cache.labels.len());
        println!("  Projects: {}", cache.projects.len());

        if self.pending {
            println!();
            println!("Pending:");
            for record in store.checkpoint().records.iter().filter(|r| !r.exported) {
                println!("  {}", record.human_key);
            }
        }

        Ok(())
    }
}
