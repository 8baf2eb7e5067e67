use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use books_api_client::BooksClient;
use bookshelf_common::Config;
use bookshelf_ingest::reviews::{ReviewSynthesizer, StaticUsers};
use bookshelf_ingest::seeds::default_seed_queries;
use bookshelf_ingest::{ExpansionBudget, Pipeline};
use bookshelf_store::{CatalogStore, PgCatalog};

#[derive(Parser)]
#[command(name = "bookshelf-ingest", about = "Fill the book catalog from Google Books")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Run one ingestion cycle followed by expansion
    Ingest {
        /// Search queries to run
        queries: Vec<String>,
        /// Add one query per letter of the English and Russian alphabets and per digit
        #[arg(long)]
        seed_alphabet: bool,
        /// Expansion hops after the initial cycle (overrides EXPANSION_HOPS)
        #[arg(long)]
        expand_hops: Option<usize>,
        /// Cap on queries per expansion hop (overrides EXPANSION_MAX_QUERIES)
        #[arg(long)]
        max_expansion_queries: Option<usize>,
    },
    /// Write random reviews for the given users
    SeedReviews {
        #[arg(long = "user", required = true)]
        users: Vec<String>,
        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bookshelf=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let catalog = PgCatalog::connect(&config.database_url, config.database_max_connections).await?;

    match cli.command {
        Command::Migrate => {
            catalog.migrate().await?;
            info!("Migrations applied");
        }
        Command::Ingest {
            mut queries,
            seed_alphabet,
            expand_hops,
            max_expansion_queries,
        } => {
            if seed_alphabet {
                queries.extend(default_seed_queries());
            }
            if queries.is_empty() {
                bail!("No queries given; pass QUERY arguments or --seed-alphabet");
            }

            let client = BooksClient::with_timeout(
                &config.books_api_url,
                config.books_api_key.clone(),
                config.fetch_timeout,
            )?;
            let budget = ExpansionBudget {
                max_hops: expand_hops.unwrap_or(config.expansion_hops),
                max_queries: max_expansion_queries.or(config.expansion_max_queries),
            };
            let pipeline = Pipeline::builder()
                .source(Arc::new(client))
                .catalog(Arc::new(catalog.clone()))
                .fetch_timeout(Some(config.fetch_timeout))
                .expansion(budget)
                .build();

            let (initial, expansion) = pipeline.ingest_and_expand(&queries).await?;

            println!("=== Initial cycle ({} queries) ===", initial.dispatch.queries);
            println!("Fetch failures:   {}", initial.dispatch.failed);
            print!("{}", initial.loader);
            for hop in &expansion.hops {
                println!("=== Expansion hop {} ({} queries) ===", hop.hop, hop.queries.len());
                println!("Fetch failures:   {}", hop.cycle.dispatch.failed);
                print!("{}", hop.cycle.loader);
            }
            println!("Books in catalog: {}", catalog.count_books().await?);
        }
        Command::SeedReviews { users, seed } => {
            let store: Arc<dyn CatalogStore> = Arc::new(catalog);
            let mut synthesizer = match seed {
                Some(seed) => ReviewSynthesizer::seeded(store, seed),
                None => ReviewSynthesizer::new(store),
            };
            let report = synthesizer.synthesize(&StaticUsers(users)).await?;
            println!(
                "Reviews written: {} (users selected: {}, conflicts skipped: {}, failed: {})",
                report.written, report.users_selected, report.conflicts, report.failed
            );
        }
    }

    Ok(())
}
