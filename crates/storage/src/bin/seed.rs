use std::fmt;

use study_core::model::{Question, QuestionId, QuestionSetId, StudyPlan, StudyPlanId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    plan_id: StudyPlanId,
    set_id: QuestionSetId,
    set_name: String,
    questions: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPlanId { raw: String },
    InvalidSetId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidQuestions { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPlanId { raw } => write!(f, "invalid --plan-id value: {raw}"),
            ArgsError::InvalidSetId { raw } => write!(f, "invalid --set-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut plan_id = std::env::var("STUDY_PLAN_ID")
            .ok()
            .and_then(|value| value.parse::<StudyPlanId>().ok())
            .unwrap_or_else(|| StudyPlanId::new(1));
        let mut set_id = QuestionSetId::new(1);
        let mut set_name = std::env::var("STUDY_SET_NAME").unwrap_or_else(|_| "Geography".into());
        let mut questions = std::env::var("STUDY_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(6);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--plan-id" => {
                    let value = require_value(&mut args, "--plan-id")?;
                    plan_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPlanId { raw: value.clone() })?;
                }
                "--set-id" => {
                    let value = require_value(&mut args, "--set-id")?;
                    set_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSetId { raw: value.clone() })?;
                }
                "--set-name" => {
                    set_name = require_value(&mut args, "--set-name")?;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
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
            set_id,
            set_name,
            questions,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --plan-id <id>            Study plan id to upsert (default: 1)");
    eprintln!("  --set-id <id>             Question set id (default: 1)");
    eprintln!("  --set-name <name>         Question set name (default: Geography)");
    eprintln!("  --questions <n>           Number of sample questions to upsert (default: 6)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_PLAN_ID, STUDY_SET_NAME, STUDY_QUESTIONS");
}

const SAMPLES: [(&str, [&str; 4], usize); 6] = [
    ("Capital of Australia?", ["Sydney", "Canberra", "Melbourne", "Perth"], 1),
    ("Longest river in Africa?", ["Congo", "Niger", "Nile", "Zambezi"], 2),
    ("Highest mountain in Europe?", ["Mont Blanc", "Elbrus", "Matterhorn", "Olympus"], 1),
    ("Largest desert on Earth?", ["Sahara", "Gobi", "Arabian", "Antarctic"], 3),
    ("Country with the most islands?", ["Sweden", "Indonesia", "Philippines", "Norway"], 0),
    ("Deepest lake in the world?", ["Superior", "Tanganyika", "Baikal", "Victoria"], 2),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let plan = match storage.bank.get_plan(args.plan_id).await? {
        Some(existing) => existing,
        None => StudyPlan::new(args.plan_id, args.set_id, args.set_name.clone()),
    };
    storage.bank.upsert_plan(&plan).await?;

    for i in 0..args.questions {
        let idx = (i as usize) % SAMPLES.len();
        let (prompt, options, correct) = SAMPLES[idx];
        let question = Question::new(
            QuestionId::new(u64::from(i + 1)),
            prompt,
            options.iter().map(|o| (*o).to_string()).collect(),
            correct,
            Some("World Atlas, 2024 edition".into()),
        )?;
        storage
            .bank
            .upsert_question(plan.question_set_id(), &question)
            .await?;
    }

    println!(
        "Seeded plan {} ({}) with {} questions into {}",
        plan.id(),
        plan.question_set_name(),
        args.questions,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
