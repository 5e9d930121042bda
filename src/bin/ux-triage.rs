#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use ux_triage_harness::export::parse_export;
use ux_triage_harness::history::{HistoryLedger, SqliteHistoryStore};
use ux_triage_harness::report::{build_report, render_report_markdown};
use ux_triage_harness::scorer::{LlmScorer, RandomScorer, ReviewScorer};
use ux_triage_harness::settings::{ModelChoice, ScoringSettings};
use ux_triage_harness::Session;

#[derive(Parser)]
#[command(name = "ux-triage", version, about = "Prompt/human alignment harness for UX review scoring")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import reviews, run a scoring call, and write the export document
    Score {
        /// Review JSON (array or single object)
        #[arg(long)]
        reviews: PathBuf,
        #[command(flatten)]
        prompt: PromptArgs,
        #[arg(long)]
        out: PathBuf,
        /// Carry human scores over from an earlier export, matched by review id
        #[arg(long)]
        human_from: Option<PathBuf>,
        /// Use the simulated scorer instead of calling a model
        #[arg(long)]
        simulate: bool,
        /// Seed for the simulated scorer
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Recompute alignment for an export and report on it
    ///
    /// When a prompt is given, the run is recorded in the history database.
    Analyze {
        /// Export document produced by `score`
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        prompt: PromptArgs,
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Md)]
        format: ReportFormat,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Inspect or clear the prompt history
    History {
        #[arg(long, global = true)]
        db: Option<PathBuf>,
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Show or create the scoring settings file
    Settings {
        #[arg(long, global = true)]
        path: Option<PathBuf>,
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List entries, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one entry, including its full prompt
    Show { id: Uuid },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print effective settings (file + environment), key redacted
    Show,
    /// Write a settings file
    Init {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        custom_model_name: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args)]
struct PromptArgs {
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,
    #[arg(long)]
    prompt_file: Option<PathBuf>,
}

impl PromptArgs {
    fn resolve(&self) -> Result<Option<String>, io::Error> {
        match (&self.prompt, &self.prompt_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => std::fs::read_to_string(path).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Md,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    match cli.command {
        Commands::Score {
            reviews,
            prompt,
            out,
            human_from,
            simulate,
            seed,
            settings,
        } => {
            let prompt = prompt
                .resolve()?
                .ok_or("score requires --prompt or --prompt-file")?;

            let mut session = Session::new();
            session.set_prompt(prompt)?;
            let outcome = session.import_reviews(&std::fs::read_to_string(&reviews)?)?;
            if outcome.rejected_count() > 0 {
                eprintln!(
                    "imported {} reviews; rejected {}",
                    outcome.accepted_count(),
                    outcome.rejected_count()
                );
                for rejected in &outcome.rejected {
                    eprintln!("  record {}: {}", rejected.position, rejected.reason);
                }
            }

            if let Some(path) = human_from {
                let carried = carry_human_scores(&mut session, &path)?;
                eprintln!("carried human scores for {carried} reviews");
            }

            let scorer: Box<dyn ReviewScorer> = if simulate {
                Box::new(match seed {
                    Some(seed) => RandomScorer::seeded(seed),
                    None => RandomScorer::from_entropy(),
                })
            } else {
                let path = settings.unwrap_or_else(ScoringSettings::default_path);
                let settings = ScoringSettings::load(path)?.apply_env()?;
                Box::new(LlmScorer::from_settings(&settings)?)
            };

            let scored = session.run_scoring(scorer.as_ref()).await?;
            std::fs::write(&out, session.export_json()?)?;
            println!("scored {scored} reviews -> {}", out.display());
        }
        Commands::Analyze {
            input,
            prompt,
            history,
            format,
            out,
        } => {
            let records = parse_export(&std::fs::read_to_string(&input)?)?;
            let mut session = Session::new();
            session.restore_from_export(records)?;

            let analysis = match prompt.resolve()? {
                Some(prompt) => {
                    session.set_prompt(prompt)?;
                    let store = SqliteHistoryStore::open(
                        history.unwrap_or_else(SqliteHistoryStore::default_path),
                    )?;
                    session.analyze_persisted(&store).await?
                }
                None => session.analyze(),
            };

            let report = build_report(&analysis, &session);
            let rendered = match format {
                ReportFormat::Md => render_report_markdown(&report),
                ReportFormat::Json => serde_json::to_string_pretty(&report)?,
            };
            match out {
                Some(path) => std::fs::write(path, rendered)?,
                None => print!("{rendered}"),
            }
        }
        Commands::History { db, command } => {
            let store = SqliteHistoryStore::open(db.unwrap_or_else(SqliteHistoryStore::default_path))?;
            match command {
                HistoryCommands::List { json } => {
                    let ledger = HistoryLedger::from_entries(store.load().await?);
                    if json {
                        let listed = ledger.list();
                        println!("{}", serde_json::to_string_pretty(&listed)?);
                    } else if ledger.is_empty() {
                        println!("no history entries");
                    } else {
                        for entry in ledger.list() {
                            println!(
                                "{}  {}  {:.1}%  {}",
                                entry.id(),
                                entry.timestamp().format("%Y-%m-%d %H:%M:%S"),
                                entry.overall() * 100.0,
                                first_line(entry.prompt())
                            );
                        }
                    }
                }
                HistoryCommands::Show { id } => {
                    let ledger = HistoryLedger::from_entries(store.load().await?);
                    let entry = ledger
                        .get(id)
                        .ok_or_else(|| format!("no history entry {id}"))?;
                    println!("{}", serde_json::to_string_pretty(entry)?);
                }
                HistoryCommands::Clear => {
                    let removed = store.clear().await?;
                    println!("removed {removed} history entries");
                }
            }
        }
        Commands::Settings { path, command } => {
            let path = path.unwrap_or_else(ScoringSettings::default_path);
            match command {
                SettingsCommands::Show => {
                    let settings = ScoringSettings::load(&path)?.apply_env()?;
                    let mut shown = serde_json::to_value(&settings)?;
                    if settings.api_key.is_some() {
                        shown["api_key"] = serde_json::Value::from("<redacted>");
                    }
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                }
                SettingsCommands::Init {
                    model,
                    custom_model_name,
                    temperature,
                    max_tokens,
                    force,
                } => {
                    if path.exists() && !force {
                        return Err(format!(
                            "{} already exists (use --force to overwrite)",
                            path.display()
                        )
                        .into());
                    }
                    let mut settings = ScoringSettings::default();
                    if let Some(model) = model {
                        settings.model = model.parse::<ModelChoice>()?;
                    }
                    settings.custom_model_name = custom_model_name;
                    if let Some(t) = temperature {
                        settings.temperature = t;
                    }
                    if let Some(m) = max_tokens {
                        settings.max_tokens = m;
                    }
                    settings.save(&path)?;
                    println!("wrote {}", path.display());
                }
            }
        }
    }

    Ok(())
}

/// Copies human scores from an export into matching reviews. Returns how many matched.
fn carry_human_scores(
    session: &mut Session,
    path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let records = parse_export(&std::fs::read_to_string(path)?)?;
    let mut carried = 0;
    for record in records {
        if session.store().contains(&record.review_id) {
            session
                .store_mut()
                .replace_human_scores(&record.review_id, record.human_scores)?;
            carried += 1;
        }
    }
    Ok(carried)
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > 60 {
        let truncated: String = line.chars().take(57).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}
