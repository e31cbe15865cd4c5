use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetmatch_core::domain::profile::RawProfile;
use assetmatch_core::{Engine, EngineOptions};

mod batch;

#[derive(Debug, Parser)]
#[command(name = "assetmatch_worker")]
struct Args {
    /// Processed asset catalog (CSV). Defaults to CATALOG_PATH.
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Identifier decoder (JSON). Defaults to DECODER_PATH.
    #[arg(long, global = true)]
    decoder: Option<String>,

    /// Number of assets to return. Defaults to RECOMMEND_TOP_K, then 2.
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Keep only the best-ranked row per ticker.
    #[arg(long, global = true)]
    dedupe_tickers: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recommend assets for a single profile given on the command line.
    Recommend {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Print similarity scores alongside tickers.
        #[arg(long)]
        scores: bool,
    },

    /// Recommend for every profile in a JSON-lines file ("-" for stdin).
    Batch {
        #[arg(long)]
        input: String,

        #[arg(long)]
        scores: bool,
    },

    /// Load the reference data and verify catalog and decoder agree.
    Check,
}

#[derive(Debug, ClapArgs)]
struct ProfileArgs {
    #[arg(long)]
    knowledge_level: String,

    #[arg(long)]
    risk_preference: String,

    /// Investment goal; repeat for several.
    #[arg(long = "goal")]
    goals: Vec<String>,

    #[arg(long)]
    monthly_income: i64,

    #[arg(long)]
    monthly_expenses: i64,

    #[arg(long, value_parser = parse_finite)]
    savings_percentage: f64,
}

fn parse_finite(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{s} is not a finite number"))
    }
}

impl From<ProfileArgs> for RawProfile {
    fn from(a: ProfileArgs) -> Self {
        Self {
            knowledge_level: a.knowledge_level,
            goals: a.goals,
            risk_preference: a.risk_preference,
            monthly_income: a.monthly_income,
            monthly_expenses: a.monthly_expenses,
            savings_percentage: a.savings_percentage,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = assetmatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if args.catalog.is_some() {
        settings.catalog_path = args.catalog.clone();
    }
    if args.decoder.is_some() {
        settings.decoder_path = args.decoder.clone();
    }

    let mut options = EngineOptions::from_env()?;
    if let Some(k) = args.top_k {
        options.top_k = k;
    }
    if args.dedupe_tickers {
        options.dedupe_tickers = true;
    }

    let result = run(args.command, &settings, options);
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

fn run(
    command: Command,
    settings: &assetmatch_core::config::Settings,
    options: EngineOptions,
) -> anyhow::Result<()> {
    let engine = Engine::from_settings(settings, options)?;

    match command {
        Command::Recommend { profile, scores } => {
            let profile = RawProfile::from(profile);
            let scored = engine.recommend_scored(&profile)?;
            let out = serde_json::json!({
                "recommended_assets": batch::Assets::new(scored, scores),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Batch { input, scores } => {
            let stdout = std::io::stdout();
            let stats = if input == "-" {
                batch::run(&engine, std::io::stdin().lock(), stdout.lock(), scores)?
            } else {
                let file = std::fs::File::open(&input)
                    .with_context(|| format!("failed to open batch input {input}"))?;
                batch::run(&engine, std::io::BufReader::new(file), stdout.lock(), scores)?
            };
            tracing::info!(
                processed = stats.processed,
                rejected = stats.rejected,
                "batch complete"
            );
        }
        Command::Check => {
            let missing = engine.undecodable_codes();
            anyhow::ensure!(
                missing.is_empty(),
                "catalog codes without decoder entries: {missing:?}"
            );
            let summary = engine.catalog().summary();
            tracing::info!(
                rows = summary.rows,
                distinct_codes = summary.distinct_codes,
                "reference data ok"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn init_sentry(settings: &assetmatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recommend_with_repeated_goals() {
        let args = Args::parse_from([
            "assetmatch_worker",
            "--top-k",
            "3",
            "recommend",
            "--knowledge-level",
            "principiante",
            "--risk-preference",
            "bajo",
            "--goal",
            "retiro",
            "--goal",
            "vacaciones",
            "--monthly-income",
            "850000",
            "--monthly-expenses",
            "300000",
            "--savings-percentage",
            "15",
        ]);

        assert_eq!(args.top_k, Some(3));
        let Command::Recommend { profile, scores } = args.command else {
            panic!("expected recommend subcommand");
        };
        assert!(!scores);
        let profile = RawProfile::from(profile);
        assert_eq!(profile.goals, vec!["retiro", "vacaciones"]);
        assert_eq!(profile.monthly_income, 850_000);
    }

    #[test]
    fn rejects_non_finite_savings_percentage() {
        for bad in ["NaN", "inf", "-inf"] {
            let res = Args::try_parse_from([
                "assetmatch_worker",
                "recommend",
                "--knowledge-level",
                "avanzado",
                "--risk-preference",
                "alto",
                "--monthly-income",
                "1",
                "--monthly-expenses",
                "1",
                "--savings-percentage",
                bad,
            ]);
            assert!(res.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn check_runs_against_files() {
        use std::io::Write;

        let mut catalog = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            catalog,
            "ticker_encoded,income_normalized,expenses_normalized,savings_percentage,\
knowledge_level_encoded,risk_level_encoded,goal_retiro,goal_bienes,goal_proyectos,goal_vacaciones"
        )
        .unwrap();
        writeln!(catalog, "0,0.5,0.25,0.2,1,1,1,0,0,0").unwrap();
        writeln!(catalog, "1,0.2,0.1,0.3,3,3,0,1,0,0").unwrap();

        let mut decoder = tempfile::NamedTempFile::new().unwrap();
        write!(decoder, r#"["AL30"]"#).unwrap();

        let settings = assetmatch_core::config::Settings {
            catalog_path: Some(catalog.path().display().to_string()),
            decoder_path: Some(decoder.path().display().to_string()),
            sentry_dsn: None,
        };

        let err = run(Command::Check, &settings, EngineOptions::default()).unwrap_err();
        assert!(err.to_string().contains("[1]"));
    }
}
