use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::{AppState, create_router};
use services::Clock;
use services::ai::GeminiClient;
use spacey_core::model::{
    ChoiceOption, Lesson, LessonSlug, MediaPath, Question, QuestionBank, QuestionId, Section,
    SectionId,
};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidBind { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBind { raw } => write!(f, "invalid --bind value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--db <sqlite_url>] [--bind <addr>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db   sqlite:spacey.sqlite3");
    eprintln!("  --bind 127.0.0.1:8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SPACEY_DB_URL, SPACEY_BIND");
    eprintln!("  SPACEY_AI_API_KEY, SPACEY_AI_BASE_URL, SPACEY_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    bind: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("SPACEY_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://spacey.sqlite3".into(), normalize_sqlite_url);
        let mut bind = std::env::var("SPACEY_BIND").unwrap_or_else(|_| "127.0.0.1:8080".into());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bind" => {
                    let value = require_value(args, "--bind")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBind { raw: value });
                    }
                    bind = value;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, bind })
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Serve => {
            let ai = Arc::new(GeminiClient::from_env());
            if !ai.enabled() {
                warn!("SPACEY_AI_API_KEY is not set; AI endpoints will return errors");
            }

            let state = AppState::new(ai.clone(), ai);
            let router = create_router(state);

            let listener = tokio::net::TcpListener::bind(&parsed.bind).await?;
            info!(addr = %parsed.bind, db = %parsed.db_url, "serving API");
            axum::serve(listener, router).await?;
            Ok(())
        }
        Command::Seed => {
            let clock = Clock::default_clock();
            seed_demo_content(&storage).await?;
            info!(db = %parsed.db_url, seeded_at = %clock.now(), "demo content seeded");
            Ok(())
        }
    }
}

/// Insert the demo lesson and its quiz bank for local development.
async fn seed_demo_content(storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    let slug = LessonSlug::new("build-your-own-satellite")?;

    let lesson = Lesson::new(
        slug.clone(),
        "Build Your Own Satellite",
        Some("Design a satellite from scratch: structure, power, payload, and orbit.".into()),
        vec![
            Section::AudioText {
                id: SectionId::new("welcome")?,
                text: "Welcome to mission control. Today you become a satellite engineer.".into(),
                audio_path: Some(MediaPath::new("lessons/satellite/welcome.mp3")?),
            },
            Section::Text {
                id: SectionId::new("structure")?,
                content: "Every satellite starts with a bus: the frame that holds power, \
                          communications, and the payload together."
                    .into(),
                speak: true,
            },
            Section::Image {
                id: SectionId::new("cubesat")?,
                path: MediaPath::new("lessons/satellite/cubesat.png")?,
                caption: Some("A 1U CubeSat next to a coffee mug for scale.".into()),
                duration: Duration::from_millis(7000),
            },
            Section::Text {
                id: SectionId::new("orbit")?,
                content: "Low Earth orbit keeps your satellite close enough for crisp images \
                          but means it circles the planet every ninety minutes."
                    .into(),
                speak: false,
            },
            Section::AudioText {
                id: SectionId::new("launch")?,
                text: "Strap in. Your satellite rides to orbit inside a rocket fairing.".into(),
                audio_path: Some(MediaPath::new("lessons/satellite/launch.mp3")?),
            },
        ],
    )?;
    storage.lessons.upsert_lesson(&lesson).await?;

    let bank = QuestionBank::new(
        slug,
        Some("Satellite Quiz".into()),
        vec![
            Question::MultipleChoice {
                id: QuestionId::new("q-orbit-force")?,
                text: "Which force keeps a satellite in orbit around Earth?".into(),
                options: vec![
                    ChoiceOption {
                        id: "a".into(),
                        text: "Gravity".into(),
                        is_correct: true,
                    },
                    ChoiceOption {
                        id: "b".into(),
                        text: "Magnetism".into(),
                        is_correct: false,
                    },
                    ChoiceOption {
                        id: "c".into(),
                        text: "Solar wind".into(),
                        is_correct: false,
                    },
                ],
                explanation: "Gravity provides the centripetal force that bends the satellite's \
                              path into an orbit."
                    .into(),
            },
            Question::MultipleChoice {
                id: QuestionId::new("q-leo-period")?,
                text: "Roughly how long does a low-Earth-orbit satellite take to circle the planet?"
                    .into(),
                options: vec![
                    ChoiceOption {
                        id: "a".into(),
                        text: "Ninety minutes".into(),
                        is_correct: true,
                    },
                    ChoiceOption {
                        id: "b".into(),
                        text: "Twenty-four hours".into(),
                        is_correct: false,
                    },
                    ChoiceOption {
                        id: "c".into(),
                        text: "One week".into(),
                        is_correct: false,
                    },
                ],
                explanation: "LEO satellites complete an orbit in about ninety minutes.".into(),
            },
            Question::MultipleChoice {
                id: QuestionId::new("q-bus")?,
                text: "What is the satellite bus?".into(),
                options: vec![
                    ChoiceOption {
                        id: "a".into(),
                        text: "The frame holding power, comms, and payload together".into(),
                        is_correct: true,
                    },
                    ChoiceOption {
                        id: "b".into(),
                        text: "The vehicle that drives satellites to the launch pad".into(),
                        is_correct: false,
                    },
                ],
                explanation: "The bus is the satellite's structural and service backbone.".into(),
            },
            Question::Open {
                id: QuestionId::new("q-payload")?,
                text: "In your own words, what is a satellite's payload?".into(),
                explanation: "The instruments the satellite carries to do its job, such as \
                              cameras or radio transponders."
                    .into(),
            },
            Question::Open {
                id: QuestionId::new("q-power")?,
                text: "How do most satellites generate electrical power?".into(),
                explanation: "Solar panels charging onboard batteries.".into(),
            },
        ],
    )?;
    storage.quizzes.upsert_bank(&bank).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
