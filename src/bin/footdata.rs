use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use footdata::api::fotmob::FotmobClient;
use footdata::api::scoresway::ScoreswayClient;
use footdata::api::sofascore::BrowserClient;
use footdata::cache::JsonCache;
use footdata::config::Config;
use footdata::images::ImageTool;
use footdata::providers::fotmob::Fotmob;
use footdata::providers::scoresway::Scoresway;
use footdata::providers::sofascore::Sofascore;
use footdata::providers::Provider;
use footdata::report::RunReport;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Fotmob,
    Scoresway,
    Sofascore,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Stage {
    /// Fill the raw cache only.
    Scrape,
    /// Flatten the cached documents only.
    Process,
    /// Scrape, then flatten.
    All,
}

/// Football data pipeline: scrape provider feeds into a raw JSON cache and
/// flatten them into delimited season tables.
#[derive(Debug, Parser)]
#[command(name = "footdata", version)]
struct Cli {
    /// Internal league id (a row of comps.csv).
    #[arg(long)]
    league: u32,

    /// Data provider to run.
    #[arg(long, value_enum)]
    provider: ProviderArg,

    #[arg(long, value_enum, default_value = "all")]
    stage: Stage,

    /// Root for the raw cache and the clean output trees.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory holding comps.csv, des_seasons.json and sw_urls.csv.
    #[arg(long, default_value = "utils")]
    utils_dir: PathBuf,

    /// WebDriver endpoint (sofascore only).
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Rscript interpreter for the image downloader (sofascore only);
    /// images are skipped when unset.
    #[arg(long, env = "RSCRIPT_PATH")]
    rscript_path: Option<PathBuf>,

    /// Image-download script passed to Rscript.
    #[arg(long, default_value = "sofascore_images.R")]
    image_script: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.utils_dir)?;
    let league = config
        .league(cli.league)
        .with_context(|| format!("League {} is not in comps.csv", cli.league))?
        .clone();

    println!("footdata: {} ({:?})\n", league.tournament, cli.provider);

    let scrape = matches!(cli.stage, Stage::Scrape | Stage::All);
    let process = matches!(cli.stage, Stage::Process | Stage::All);
    let mut report = RunReport::new();

    match cli.provider {
        ProviderArg::Fotmob => {
            let provider = Fotmob::new(
                FotmobClient::new(),
                JsonCache::new(cli.data_dir.join("raw").join("fm")),
                cli.data_dir.join("clean").join("fm"),
                config.desired_seasons.clone(),
            );
            run(&provider, &league, scrape, process, &mut report).await?;
        }
        ProviderArg::Scoresway => {
            let provider = Scoresway::new(
                ScoreswayClient::new(),
                JsonCache::new(cli.data_dir.join("raw").join("sw")),
                cli.data_dir.join("clean").join("sw"),
                config.scoresway.clone(),
                config.desired_seasons.clone(),
            );
            run(&provider, &league, scrape, process, &mut report).await?;
        }
        ProviderArg::Sofascore => {
            let browser = BrowserClient::connect(&cli.webdriver_url)
                .await
                .context("Failed to start the WebDriver session")?;
            let images = cli
                .rscript_path
                .as_ref()
                .map(|rscript| ImageTool::new(rscript, &cli.image_script));
            let provider = Sofascore::new(
                browser,
                images,
                JsonCache::new(cli.data_dir.join("raw").join("ss")),
                cli.data_dir.join("clean").join("ss"),
                config.desired_seasons.clone(),
            );
            let outcome = run(&provider, &league, scrape, process, &mut report).await;
            provider.close().await?;
            outcome?;
        }
    }

    report.print_summary();
    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run(
    provider: &impl Provider,
    league: &footdata::config::LeagueEntry,
    scrape: bool,
    process: bool,
    report: &mut RunReport,
) -> Result<()> {
    if scrape {
        provider.collect(league, report).await?;
    }
    if process {
        provider.flatten(league, report)?;
    }
    Ok(())
}
