use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jobhub_core::{FilterSet, JobId, NewJob, Source};
use jobhub_view::{CreateOutcome, DeleteOutcome, FetchOutcome, ScrapeSettle, ViewConfig, ViewController};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobhub")]
#[command(about = "Browse and manage manual and scraped job listings")]
struct Cli {
    /// Backend base URL; overrides JOBHUB_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Manual,
    Scraped,
}

impl From<SourceArg> for Source {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Manual => Source::Manual,
            SourceArg::Scraped => Source::Scraped,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List jobs for one tab, optionally filtered.
    List {
        #[arg(long, value_enum, default_value = "manual")]
        source: SourceArg,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_type: Option<String>,
    },
    Stats,
    /// Scraper status and schedule.
    Status,
    Add {
        #[arg(long, value_enum, default_value = "manual")]
        source: SourceArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_type: Option<String>,
        /// YYYY-MM-DD; defaults to today.
        #[arg(long)]
        posting_date: Option<String>,
        #[arg(long)]
        salary: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a job. The command itself counts as the confirming click.
    Delete {
        id: String,
        #[arg(long, value_enum, default_value = "manual")]
        source: SourceArg,
    },
    /// Run the scraper and wait for its status to settle.
    Scrape,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ViewConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    let gateway = config
        .build_gateway()
        .with_context(|| format!("building gateway for {}", config.api_url))?;
    let mut view = ViewController::from_config(Arc::new(gateway), &config);
    tracing::debug!(api_url = %config.api_url, session = %view.session_id(), "jobhub session started");

    match cli.command.unwrap_or(Commands::List {
        source: SourceArg::Manual,
        company: None,
        location: None,
        job_type: None,
    }) {
        Commands::List {
            source,
            company,
            location,
            job_type,
        } => {
            view.activate(source.into());
            let filters = FilterSet {
                company,
                location,
                job_type,
            };
            if let FetchOutcome::Failed { message } = view.fetch(filters).await {
                bail!("listing jobs failed: {message}");
            }
            print_rows(&view);
        }
        Commands::Stats => {
            if !view.refresh_stats().await {
                bail!("job statistics unavailable");
            }
            let stats = view.stats();
            println!("total: {}", stats.total_label());
            for source in Source::ALL {
                println!("{source}: {}", stats.source_total_label(source));
            }
            println!("companies: {}", stats.companies().join(", "));
        }
        Commands::Status => {
            if !view.refresh_scraper_status().await {
                bail!("scraper status unavailable");
            }
            let panel = view.scraper_panel();
            println!("last update: {}", panel.last_update_label());
            println!("schedule: {}", panel.schedule_label());
        }
        Commands::Add {
            source,
            title,
            company,
            location,
            job_type,
            posting_date,
            salary,
            url,
            description,
        } => {
            view.activate(source.into());
            let mut job = NewJob::new(title, company);
            job.location = location;
            job.salary = salary;
            job.url = url;
            job.description = description;
            if job_type.is_some() {
                job.job_type = job_type;
            }
            if posting_date.is_some() {
                job.posting_date = posting_date;
            }
            match view.submit_create(job).await.context("adding job")? {
                CreateOutcome::Inserted(record) | CreateOutcome::OtherTab(record) => {
                    println!("added {} ({}) to {}", record.id, record.title, record.source);
                }
                CreateOutcome::Refreshed(_) => println!("added job"),
            }
        }
        Commands::Delete { id, source } => {
            let source = Source::from(source);
            if let FetchOutcome::Failed { message } = view.switch_tab(source).await {
                bail!("loading {source} jobs failed: {message}");
            }
            let id = JobId::parse(&id);
            let mut outcome = view.click_delete(&id).await;
            if outcome == DeleteOutcome::Armed {
                outcome = view.click_delete(&id).await;
            }
            match outcome {
                DeleteOutcome::Deleted => println!("deleted {id} from {source}"),
                DeleteOutcome::AlreadyGone => println!("{id} is not in {source}; nothing to delete"),
                DeleteOutcome::Failed { message } => bail!("deleting {id} failed: {message}"),
                other => bail!("delete of {id} did not complete: {other:?}"),
            }
        }
        Commands::Scrape => {
            view.activate(Source::Scraped);
            let report = view.trigger_scraper().await.context("running scraper")?;
            let settle = match report.settle {
                ScrapeSettle::Observed => "status updated",
                ScrapeSettle::NothingNew => "nothing new",
                ScrapeSettle::TimedOut => "status did not update before timeout",
            };
            println!("processed {} jobs; {settle}", report.jobs_processed);
            println!("last update: {}", view.scraper_panel().last_update_label());
        }
    }

    Ok(())
}

fn print_rows(view: &ViewController) {
    for row in view.rows() {
        println!(
            "[{}] {}  {} @ {}  {}  {}",
            row.id_kind.badge(),
            row.record.id,
            row.record.title,
            row.record.company,
            row.record.location.as_deref().unwrap_or("-"),
            row.posting_date,
        );
    }
    println!("{}", view.view().summary());
}
