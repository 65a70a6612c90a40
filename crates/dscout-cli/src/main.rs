use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dscout_enrich::{EnrichConfig, EnrichOptions, Enricher, PassSummary};
use dscout_sources::award::AwardQuery;
use dscout_sources::{
    seed, BallotpediaSource, FloridaDoeDirectory, ManualContacts, StaffDirectorySource,
    SubdomainList, Throttle, UsaSpendingClient,
};
use dscout_store::SnapshotStore;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dscout")]
#[command(about = "School district dataset enrichment")]
struct Cli {
    /// Canonical snapshot path (default: $DSCOUT_DATA or data/districts.json).
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Mirror path kept byte-identical with the snapshot (default:
    /// $DSCOUT_MIRROR or docs/data.json).
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    /// Delay between outbound requests, in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Checkpoint the snapshot after this many processed districts.
    #[arg(long, global = true)]
    save_every: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the initial district snapshot.
    Bootstrap {
        /// Overwrite an existing snapshot.
        #[arg(long)]
        force: bool,
    },
    /// Refresh federal award data from USASpending.
    Awards {
        /// Skip districts below this enrollment.
        #[arg(long)]
        min_enrollment: Option<u32>,
        /// Restrict the query to education CFDA program numbers.
        #[arg(long)]
        education_only: bool,
    },
    /// Fill in missing contacts from one source.
    Contacts {
        #[arg(long, value_enum)]
        source: ContactSourceArg,
        /// JSON file of hand-verified contacts (with --source manual).
        #[arg(long)]
        manual_file: Option<PathBuf>,
    },
    /// Flag districts that appear in a competitor subdomain list.
    Competitors {
        /// Path to the subdomain list, one entry per line.
        #[arg(long)]
        list: PathBuf,
        /// Flag name recomputed across every district.
        #[arg(long, default_value = "uses_edclub")]
        flag: String,
        /// Vendor suffix stripped from each entry.
        #[arg(long, default_value = ".typingclub.com")]
        suffix: String,
    },
    /// Print a summary of the current snapshot.
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ContactSourceArg {
    Ballotpedia,
    Directory,
    Manual,
    Website,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = EnrichConfig::from_env();
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(mirror) = cli.mirror {
        config.mirror_path = mirror;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.delay_ms = delay_ms;
    }
    if let Some(save_every) = cli.save_every {
        config.save_every = save_every;
    }

    let store = SnapshotStore::new(&config.data_path, &config.mirror_path);
    let throttle = Throttle::from_millis(config.delay_ms);

    match cli.command {
        Commands::Bootstrap { force } => {
            if store.exists().await && !force {
                bail!(
                    "snapshot already exists at {}; pass --force to overwrite",
                    store.data_path().display()
                );
            }
            let snapshot = seed::seed_snapshot();
            store.save(&snapshot).await.context("writing seed snapshot")?;
            info!(districts = snapshot.districts.len(), "bootstrap complete");
        }
        Commands::Awards {
            min_enrollment,
            education_only,
        } => {
            let options = EnrichOptions {
                save_every: config.save_every,
                min_enrollment,
                ..EnrichOptions::default()
            };
            let mut query = AwardQuery::default();
            if education_only {
                query = query.education_programs();
            }
            let source = UsaSpendingClient::new(http_client()?, query);
            let summary = Enricher::new(store, options)
                .run_award_pass(&source, &throttle)
                .await?;
            print_summary(&summary);
        }
        Commands::Contacts { source, manual_file } => {
            let options = EnrichOptions {
                save_every: config.save_every,
                ..EnrichOptions::default()
            };
            let enricher = Enricher::new(store, options);
            let summary = match source {
                ContactSourceArg::Ballotpedia => {
                    let source = BallotpediaSource::new(http_client()?);
                    enricher.run_contact_pass(&source, &throttle).await?
                }
                ContactSourceArg::Directory => {
                    let feed = FloridaDoeDirectory::new(http_client()?);
                    enricher.run_contact_feed_pass(&feed).await?
                }
                ContactSourceArg::Manual => {
                    let feed = match manual_file {
                        Some(path) => ManualContacts::from_json_file(&path)
                            .with_context(|| format!("reading {}", path.display()))?,
                        None => ManualContacts::builtin(),
                    };
                    enricher.run_contact_feed_pass(&feed).await?
                }
                ContactSourceArg::Website => {
                    let source = StaffDirectorySource::new(http_client()?)?;
                    enricher.run_contact_pass(&source, &throttle).await?
                }
            };
            print_summary(&summary);
        }
        Commands::Competitors { list, flag, suffix } => {
            let options = EnrichOptions {
                save_every: config.save_every,
                ..EnrichOptions::default()
            };
            let feed = SubdomainList::new(list, suffix);
            let summary = Enricher::new(store, options)
                .run_flag_pass(&feed, &flag)
                .await?;
            print_summary(&summary);
        }
        Commands::Show => {
            let snapshot = store.load().await.context("loading snapshot")?;
            show(&snapshot);
        }
    }

    Ok(())
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("dscout/0.1 (district research)")
        .build()
        .context("building http client")
}

fn print_summary(summary: &PassSummary) {
    println!(
        "{}: processed={} merged={} skipped={} errors={}",
        summary.source_id, summary.processed, summary.merged, summary.skipped, summary.errors
    );
    if !summary.unmatched.is_empty() {
        println!("unmatched ({}):", summary.unmatched.len());
        for name in &summary.unmatched {
            println!("  {name}");
        }
    }
}

fn show(snapshot: &dscout_core::Snapshot) {
    if let Some(updated) = snapshot.meta.updated {
        println!("updated: {updated}");
    }
    println!("districts: {}", snapshot.districts.len());
    for district in &snapshot.districts {
        let contacts = district.contacts.len();
        let lead = district
            .contacts
            .first()
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!(
            "  {} ({}) contacts={} lead={} awards=${:.0}",
            district.name, district.state, contacts, lead, district.federal_awards
        );
    }
}
