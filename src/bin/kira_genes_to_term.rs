use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_genes_to_term::app::App;
use kira_genes_to_term::config::{ConfigLoader, ConfigOverrides};
use kira_genes_to_term::enrichr::EnrichrHttpClient;
use kira_genes_to_term::output::JsonOutput;

#[derive(Parser)]
#[command(name = "kira-genes-to-term")]
#[command(
    about = "Runs Enrichr on a comma-delimited gene list and prints the best matching term as JSON",
    long_about = "Runs Enrichr on a comma-delimited gene list and prints the best matching term \
                  (lowest adjusted p-value, ties broken by raw p-value) as JSON:\n\n\
                  {\"name\": ..., \"source\": ..., \"sourceTermId\": \"\", \"p_value\": ..., \
                  \"description\": \"\", \"term_size\": ..., \"intersections\": [...], \"jaccard\": ...}\n\n\
                  \"jaccard\" is matched genes divided by the number of query genes.\n\
                  When no term passes the cutoff nothing is printed and the exit code is still 0."
)]
#[command(version, author)]
struct Cli {
    #[arg(help = "File containing a comma delimited list of genes")]
    input: PathBuf,

    #[arg(long, help = "Adjusted p-value cutoff [default: 0.05]")]
    cutoff: Option<f64>,

    #[arg(long, help = "Comma delimited Enrichr gene set libraries to enrich against")]
    genesets: Option<String>,

    #[arg(long, help = "Directory to hold Enrichr output [default: fresh temp dir]")]
    tmpdir: Option<Utf8PathBuf>,

    #[arg(long, help = "Number of attempts at the Enrichr call [default: 2]")]
    retries: Option<u32>,

    #[arg(long, help = "Per-request timeout in seconds [default: 60]")]
    timeout_secs: Option<u64>,

    #[arg(long, help = "Stop retrying the Enrichr call after this many seconds [default: no limit]")]
    deadline_secs: Option<u64>,

    #[arg(long, help = "JSON config file [default: ./kira-g2t.json if present]")]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?.apply(ConfigOverrides {
        cutoff: cli.cutoff,
        genesets: cli.genesets,
        tmpdir: cli.tmpdir,
        retries: cli.retries,
        timeout_secs: cli.timeout_secs,
        deadline_secs: cli.deadline_secs,
    })?;

    let client = EnrichrHttpClient::new(&config.enrichr_url, config.timeout)?;
    let app = App::new(client, config);

    let mut stderr = io::stderr();
    let outcome = app.run(&cli.input, &mut stderr)?;
    JsonOutput::print_outcome(&outcome, &mut io::stdout(), &mut stderr).into_diagnostic()?;
    Ok(())
}
