mod commands;

use std::fmt;
use std::sync::Arc;

use exam_core::model::TestId;
use exam_core::{AnswerValue, NavQuestionRef};
use remote::{HttpAssessmentApi, RemoteConfig};
use services::{
    SessionConfig, SessionError, SessionState, SubmitOutcome, TestSession, TimerHandle,
    spawn_timer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::{Command, HELP};

const DEFAULT_LOG_FILTER: &str = "app=info,services=info,remote=info";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingTestId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingTestId => write!(f, "no test id: pass --test-id or set EXAM_TEST_ID"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--test-id <id>] [--base-url <url>]");
    eprintln!();
    eprintln!("Environment (a .env file is read when present):");
    eprintln!("  EXAM_TEST_ID, EXAM_API_BASE_URL, EXAM_API_TOKEN, EXAM_API_TIMEOUT_SECS");
    eprintln!("  EXAM_TICK_MILLIS, EXAM_REQUIRE_ANSWER, RUST_LOG");
}

struct Args {
    test_id: TestId,
    base_url: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut test_id = std::env::var("EXAM_TEST_ID")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut base_url = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--test-id" => test_id = Some(require_value(args, "--test-id")?),
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let test_id = test_id.ok_or(ArgsError::MissingTestId)?;
        Ok(Self {
            test_id: TestId::new(test_id.trim()),
            base_url,
        })
    }
}

fn init_tracing() {
    // Logs go to stderr so they do not interleave with the question text.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Terminal front end for one session.
struct Console {
    session: Arc<TestSession>,
    test_id: TestId,
    timer: Option<TimerHandle>,
    result_shown: bool,
}

impl Console {
    async fn load(&mut self) {
        match self.session.load(self.test_id.clone()).await {
            Ok(()) => self.print_instructions(),
            Err(err) => println!("could not load test: {err} (type `load` to retry)"),
        }
    }

    async fn handle(&mut self, command: Command) {
        let outcome = match command {
            Command::Load => {
                self.load().await;
                Ok(())
            }
            Command::Begin => self.begin(),
            Command::Answer { question_id, value } => self
                .session
                .set_answer(question_id.clone(), value)
                .map(|()| println!("saved {question_id}")),
            Command::Clear(question_id) => self
                .session
                .set_answer(question_id.clone(), AnswerValue::Absent)
                .map(|()| println!("cleared {question_id}")),
            Command::Flag(question_id) => {
                self.session.toggle_flag(question_id.clone()).map(|flagged| {
                    let verb = if flagged { "flagged" } else { "unflagged" };
                    println!("{verb} {question_id}");
                })
            }
            Command::Next => self.session.next().map(|nav| match nav {
                Some(nav) => self.print_question(&nav),
                None => println!("already at the last question"),
            }),
            Command::Previous => self.session.previous().map(|nav| match nav {
                Some(nav) => self.print_question(&nav),
                None => println!("already at the first question"),
            }),
            Command::Jump(position) => self
                .session
                .jump_to(position - 1)
                .map(|nav| self.print_question(&nav)),
            Command::Goto(question_id) => self
                .session
                .jump_to_question(&question_id)
                .map(|nav| self.print_question(&nav)),
            Command::Unanswered => {
                self.print_unanswered();
                Ok(())
            }
            Command::Status => {
                self.print_status();
                Ok(())
            }
            Command::Submit => self.submit().await,
            Command::Reset => self.reset().await,
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::Exit => Ok(()),
        };

        if let Err(err) = outcome {
            println!("{err}");
        }
        self.announce_result();
    }

    fn begin(&mut self) -> Result<(), SessionError> {
        self.session.begin()?;
        self.timer = Some(spawn_timer(Arc::clone(&self.session)));
        self.result_shown = false;
        self.print_status();
        if let Some(nav) = self.session.current() {
            self.print_question(&nav);
        }
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), SessionError> {
        let unanswered = self.session.unanswered_questions().len();
        if unanswered > 0 {
            println!("submitting with {unanswered} unanswered question(s)");
        }
        match self.session.submit().await? {
            SubmitOutcome::Submitted(_) => {}
            SubmitOutcome::AlreadyInFlight => println!("a submission is already in progress"),
            SubmitOutcome::Discarded => println!("session was closed before the result arrived"),
        }
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), SessionError> {
        self.session.reset()?;
        self.stop_timer().await;
        self.print_instructions();
        Ok(())
    }

    async fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop().await;
        }
    }

    async fn shutdown(mut self) {
        self.stop_timer().await;
        self.session.exit();
    }

    fn announce_result(&mut self) {
        if self.result_shown {
            return;
        }
        let Some(result) = self.session.result() else {
            return;
        };
        self.result_shown = true;
        println!();
        println!("Test submitted.");
        println!("  band score: {:.1}", result.band_score);
        println!(
            "  correct:    {}/{}",
            result.correct_answers, result.total_questions
        );
        println!("Type `reset` to try again or `exit` to leave.");
    }

    fn print_instructions(&self) {
        let Some(test) = self.session.test() else {
            return;
        };
        println!();
        println!("{}", test.title());
        if let Some(description) = test.description() {
            println!("{description}");
        }
        for section in test.sections() {
            println!(
                "  {:<12} {:>3} min  {} question(s)",
                section.name,
                section.duration_minutes,
                section.question_count()
            );
        }
        println!("Time allowed: {}", format_clock(test.total_duration_seconds()));
        if let Some(instructions) = test.instructions() {
            println!();
            println!("{instructions}");
        }
        println!();
        println!("Type `begin` when ready, `help` for commands.");
    }

    fn print_question(&self, nav: &NavQuestionRef) {
        let (Some(test), Some(index)) = (self.session.test(), self.session.navigation()) else {
            return;
        };
        let Some(section) = test.sections().get(nav.section_index) else {
            return;
        };
        let Some(group) = section.groups.get(nav.group_index) else {
            return;
        };
        let Some(question) = test.questions().nth(nav.flat_index) else {
            return;
        };

        println!();
        if index.is_first_in_group(nav) {
            println!("== {} ==", section.name);
            if let Some(instruction) = group.instruction.as_deref().or(group.title.as_deref()) {
                println!("{instruction}");
            }
            if let Some(passage) = group.passage.as_deref() {
                println!("{passage}");
            }
        }
        if let Some(passage) = question.passage() {
            println!("{passage}");
        }
        println!(
            "[{}/{}] {} ({}) {}",
            nav.flat_index + 1,
            index.len(),
            question.prompt(),
            question.question_type(),
            question.id()
        );
        for option in question.options() {
            println!("    {:<8} {}", option.id, option.text);
        }
        if let Some(answer) = self.session.answer(question.id()) {
            println!("    answer: {}", describe_answer(&answer));
        }
        if self.session.flagged().contains(question.id()) {
            println!("    (flagged)");
        }
    }

    fn print_unanswered(&self) {
        let unanswered = self.session.unanswered_questions();
        if unanswered.is_empty() {
            println!("every question has an answer");
            return;
        }
        let listed: Vec<String> = unanswered
            .iter()
            .map(|nav| format!("{}:{}", nav.flat_index + 1, nav.question_id))
            .collect();
        println!("unanswered: {}", listed.join(" "));
    }

    fn print_status(&self) {
        let snapshot = self.session.snapshot();
        let remaining = snapshot
            .remaining_seconds
            .map_or_else(|| "--:--".to_string(), format_clock);
        println!(
            "[{}] {} left, {}/{} answered, {} flagged",
            snapshot.state,
            remaining,
            snapshot.answered,
            snapshot.total,
            snapshot.flagged.len()
        );
        for section in &snapshot.sections {
            let marker = if snapshot.active_section.as_ref() == Some(&section.section_id) {
                '>'
            } else {
                ' '
            };
            println!(
                " {marker} {:<12} {}/{}",
                section.name, section.answered, section.total
            );
        }
        if let Some(err) = &snapshot.last_error {
            println!("last error: {err}");
        }
    }
}

fn describe_answer(answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Single(value) | AnswerValue::Text(value) => value.clone(),
        AnswerValue::Multi(values) => values.join(", "),
        AnswerValue::Absent => String::new(),
    }
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let base_override = args.base_url.clone();
    let remote_config = RemoteConfig::from_lookup(|key| match (key, &base_override) {
        ("EXAM_API_BASE_URL", Some(url)) => Some(url.clone()),
        _ => std::env::var(key).ok(),
    })?;
    let session_config = SessionConfig::from_env()?;
    tracing::info!(
        base_url = %remote_config.base_url,
        test_id = %args.test_id,
        tick_interval = ?session_config.tick_interval,
        "starting session"
    );

    let api = HttpAssessmentApi::new(remote_config)?;
    let session = Arc::new(TestSession::new(Arc::new(api)).with_config(session_config));

    let mut console = Console {
        session,
        test_id: args.test_id,
        timer: None,
        result_shown: false,
    };
    console.load().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            console.announce_result();
            continue;
        }
        match commands::parse(&line) {
            Ok(Command::Exit) => break,
            Ok(command) => console.handle(command).await,
            Err(err) => println!("{err}"),
        }
    }

    if console.session.state() == SessionState::InProgress {
        println!("leaving without submitting");
    }
    console.shutdown().await;
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
