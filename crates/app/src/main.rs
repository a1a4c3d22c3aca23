use std::fmt;

use services::{Clock, ReviewSession, SessionError, SessionLoopService, SessionPhase};
use storage::repository::Storage;
use study_core::model::{Difficulty, ReviewSettings, SessionSummary, StudyPlanId};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPlanId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPlanId { raw } => write!(f, "invalid --plan-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug)]
struct Args {
    db_url: String,
    plan_id: StudyPlanId,
    session_limit: Option<u32>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--plan-id <id>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --plan-id 1");
    eprintln!("  --limit (none, review until the queue is empty or you quit)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_PLAN_ID, STUDY_SESSION_LIMIT");
}

fn parse_limit(raw: String) -> Result<u32, ArgsError> {
    match raw.parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ArgsError::InvalidLimit { raw }),
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STUDY_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:dev.sqlite3".into()), normalize_sqlite_url);
        let mut plan_id = std::env::var("STUDY_PLAN_ID")
            .ok()
            .and_then(|value| value.parse::<StudyPlanId>().ok())
            .unwrap_or_else(|| StudyPlanId::new(1));
        let mut session_limit = std::env::var("STUDY_SESSION_LIMIT")
            .ok()
            .and_then(|value| parse_limit(value).ok());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--plan-id" => {
                    let value = require_value(args, "--plan-id")?;
                    plan_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPlanId { raw: value.clone() })?;
                }
                "--limit" => {
                    session_limit = Some(parse_limit(require_value(args, "--limit")?)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            plan_id,
            session_limit,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── TERMINAL LOOP ─────────────────────────────────────────────────────────────
//

/// One line of learner input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Select(usize),
    Reveal,
    Rate(Difficulty),
    Reload,
    Quit,
    Unknown,
}

impl Input {
    /// Options are numbered from 1 on screen.
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Ok(n) = line.parse::<usize>() {
            return n.checked_sub(1).map_or(Self::Unknown, Self::Select);
        }
        match line.to_ascii_lowercase().as_str() {
            "s" | "show" => Self::Reveal,
            "r" | "reload" => Self::Reload,
            "q" | "quit" => Self::Quit,
            other => other.parse::<Difficulty>().map_or(Self::Unknown, Self::Rate),
        }
    }
}

fn render(session: &ReviewSession) {
    match session.phase() {
        SessionPhase::Presenting | SessionPhase::Revealed => {}
        SessionPhase::Unavailable => {
            println!(
                "Nothing to review: {}",
                session.last_error().unwrap_or("no questions")
            );
            println!("[r] reload  [q] quit");
            return;
        }
        SessionPhase::Loading | SessionPhase::Finished => return,
    }
    let Some(question) = session.current() else {
        return;
    };

    let progress = session.progress();
    println!();
    println!(
        "new {} | hard {} | medium {} | easy {} | rated {}",
        progress.new, progress.hard, progress.medium, progress.easy, progress.ratings_given
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.selection() == Some(i) { '>' } else { ' ' };
        println!(" {marker} {}. {option}", i + 1);
    }

    if session.phase() == SessionPhase::Revealed {
        let verdict = if session.answered_correctly() == Some(true) {
            "Correct."
        } else {
            "Not quite."
        };
        println!("{verdict} Answer: {}", question.correct_option());
        if let Some(citation) = question.citation() {
            println!("Source: {citation}");
        }
        println!("Rate it: [easy] [medium] [hard]  (q to finish)");
    } else {
        println!("Pick an option number, [s] to show the answer, [q] to finish");
    }
}

fn print_summary(summary: &SessionSummary) {
    let stats = summary.plan_stats();
    println!();
    println!("Session finished.");
    println!(
        "Rated {} questions ({} new): {} easy, {} medium, {} hard; {} answered correctly.",
        summary.total_ratings(),
        summary.new_questions_answered(),
        summary.easy(),
        summary.medium(),
        summary.hard(),
        summary.correct_answers()
    );
    println!(
        "Plan totals: {} reviewed ({} easy, {} medium, {} hard).",
        stats.reviewed, stats.easy, stats.medium, stats.hard
    );
}

async fn review_loop(
    service: &SessionLoopService,
    session: &mut ReviewSession,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<(), Box<dyn std::error::Error>> {
    render(session);
    while let Some(line) = lines.next_line().await? {
        let outcome = match Input::parse(&line) {
            Input::Select(index) => session.select(index),
            Input::Reveal => session.reveal().map(|_| ()),
            Input::Rate(rating) => service.rate_current(session, rating).await.map(|_| ()),
            Input::Reload => service.reload(session).await,
            Input::Quit => {
                if session.phase() == SessionPhase::Unavailable {
                    return Ok(());
                }
                service.finish(session).map(|_| ())
            }
            Input::Unknown => {
                println!("Unrecognised input: {}", line.trim());
                continue;
            }
        };

        match outcome {
            Ok(()) => {}
            // The session already advanced; tell the learner and keep going.
            Err(SessionError::PersistenceFailure(err)) => {
                println!("Warning: rating not saved ({err})");
            }
            Err(err) => println!("{err}"),
        }

        if let Some(summary) = session.summary() {
            print_summary(summary);
            return Ok(());
        }
        render(session);
    }

    // Input closed: end the session if it was running.
    if matches!(
        session.phase(),
        SessionPhase::Presenting | SessionPhase::Revealed
    ) {
        let summary = service.finish(session)?;
        print_summary(&summary);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let settings = ReviewSettings::default().with_session_limit(parsed.session_limit)?;
    let service = SessionLoopService::from_storage(Clock::system(), &storage)
        .with_settings(settings);
    log::info!("reviewing plan {} from {}", parsed.plan_id, parsed.db_url);

    let mut session = service.new_session(parsed.plan_id);
    if let Err(err) = service.reload(&mut session).await {
        log::warn!("initial load failed: {err}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    review_loop(&service, &mut session, &mut lines).await
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_maps_numbers_from_one() {
        assert_eq!(Input::parse("1"), Input::Select(0));
        assert_eq!(Input::parse(" 3 "), Input::Select(2));
        assert_eq!(Input::parse("0"), Input::Unknown);
    }

    #[test]
    fn input_parses_ratings_and_commands() {
        assert_eq!(Input::parse("Hard"), Input::Rate(Difficulty::Hard));
        assert_eq!(Input::parse("easy"), Input::Rate(Difficulty::Easy));
        assert_eq!(Input::parse("s"), Input::Reveal);
        assert_eq!(Input::parse("reload"), Input::Reload);
        assert_eq!(Input::parse("q"), Input::Quit);
        assert_eq!(Input::parse("later"), Input::Unknown);
    }

    #[test]
    fn sqlite_urls_become_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/study.db".into()),
            "sqlite:///tmp/study.db"
        );
        assert_eq!(normalize_sqlite_url("sqlite:/tmp/a.db".into()), "sqlite:///tmp/a.db");
    }

    #[test]
    fn limit_must_be_positive() {
        assert_eq!(parse_limit("5".into()).unwrap(), 5);
        assert!(parse_limit("0".into()).is_err());
        assert!(parse_limit("many".into()).is_err());
    }
}
