mod config;
mod quiz;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use config::Config;
use dotenv::dotenv;
use quiz::{
    export::{FeatureLog, FeatureRow},
    results::{Summary, TrialResult},
    sequencer::TrialPresentation,
    session::QuizSession,
    TrialPool, TOTAL_QUESTIONS,
};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{InputFile, InputMedia, InputMediaPhoto, KeyboardButton, KeyboardMarkup},
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveAge,
    ReadyToStart {
        age: u32,
        session: QuizSession,
    },
    InProgress {
        age: u32,
        session: QuizSession,
    },
    Completed {
        age: u32,
        session: QuizSession,
    },
}

type UserInfoStorage = std::sync::Arc<ErasedStorage<State>>;

/// Read-only collaborators shared by every chat.
pub struct QuizApp {
    pool: TrialPool,
    config: Config,
    features: FeatureLog,
}

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting mental rotation task bot...");

    let config = Config::from_env();
    let pool = TrialPool::reference();

    pool.check(TOTAL_QUESTIONS)?;

    for missing in pool.missing_assets(&config.images_dir) {
        log::warn!("Stimulus image not found: {}", missing.display());
    }

    let bot = Bot::from_env();

    log::info!("Opening dialogue storage at {}", config.db_path);
    let storage: UserInfoStorage = SqliteStorage::open(&config.db_path, Json)
        .await?
        .erase();

    let app = Arc::new(QuizApp {
        features: FeatureLog::new(config.export_path.clone()),
        pool,
        config,
    });
    let app_for_progress = app.clone();
    let app_for_completed = app.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveAge].endpoint(receive_age))
            .branch(dptree::case![State::ReadyToStart { age, session }].endpoint(
                move |bot: Bot,
                      dialogue: QuizDialogue,
                      (age, session): (u32, QuizSession),
                      msg: Message| {
                    ready_to_start(app.clone(), bot, dialogue, (age, session), msg)
                },
            ))
            .branch(dptree::case![State::InProgress { age, session }].endpoint(
                move |bot: Bot,
                      dialogue: QuizDialogue,
                      (age, session): (u32, QuizSession),
                      msg: Message| {
                    answer_trial(app_for_progress.clone(), bot, dialogue, (age, session), msg)
                },
            ))
            .branch(dptree::case![State::Completed { age, session }].endpoint(
                move |bot: Bot,
                      dialogue: QuizDialogue,
                      (age, session): (u32, QuizSession),
                      msg: Message| {
                    completed(app_for_completed.clone(), bot, dialogue, (age, session), msg)
                },
            )),
    )
    .dependencies(dptree::deps![storage])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const GREETING_TEXT: &str = "Hi! This is the Mental Rotation Task. Before we begin, how old are you?";
const INSTRUCTIONS_TEXT: &str = "Welcome to the Mental Rotation Task!

Instructions:
- You will see a target image first
- Then two choice images: one is correctly rotated, one is wrong
- Tap the option you think is the correct rotation
- You will proceed to the next question automatically
- Complete all questions as quickly and accurately as possible

Ready? Tap the button below to start!";

const START_TASK: &str = "▶️ Start Task";
const NEW_TASK: &str = "🔄 Start New Task";
const OPTION_A: &str = "Option A";
const OPTION_B: &str = "Option B";
const OPTION_LABELS: [&str; 2] = [OPTION_A, OPTION_B];

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    dialogue.update(State::ReceiveAge).await?;
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    Ok(())
}

fn parse_age(text: Option<&str>) -> Option<u32> {
    let age = text?.trim().parse::<u32>().ok()?;
    (1..=120).contains(&age).then_some(age)
}

async fn receive_age(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let Some(age) = parse_age(msg.text()) else {
        bot.send_message(msg.chat.id, "Please enter your age as a whole number")
            .await?;
        return Ok(());
    };

    dialogue
        .update(State::ReadyToStart {
            age,
            session: QuizSession::default(),
        })
        .await?;
    send_welcome(&bot, msg.chat.id).await?;
    Ok(())
}

async fn send_welcome(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(START_TASK)]]);
    bot.send_message(chat_id, INSTRUCTIONS_TEXT)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn ready_to_start(
    app: Arc<QuizApp>,
    bot: Bot,
    dialogue: QuizDialogue,
    (age, mut session): (u32, QuizSession),
    msg: Message,
) -> HandlerResult {
    if msg.text() != Some(START_TASK) {
        send_welcome(&bot, msg.chat.id).await?;
        return Ok(());
    }

    session.start(&app.pool, &mut rand::thread_rng(), Utc::now())?;
    log::info!("Chat {} started a task", msg.chat.id.0);

    let view = prepare_trial(&app.pool, &mut session);
    dialogue.update(State::InProgress { age, session }).await?;
    send_trial(&app, &bot, msg.chat.id, &view).await?;
    Ok(())
}

/// What a chat sees for the active trial.
#[derive(Debug, Clone, PartialEq)]
struct TrialView {
    question_number: usize,
    total_questions: usize,
    target: String,
    presentation: TrialPresentation,
}

/// Fixes the option order of the active trial in the session. Repeated calls
/// within one trial return the same view.
fn prepare_trial(pool: &TrialPool, session: &mut QuizSession) -> TrialView {
    let trial = session.current_trial(pool).clone();
    let presentation = session
        .presentation_for(&trial, &mut rand::thread_rng())
        .clone();

    TrialView {
        question_number: session.current_index() + 1,
        total_questions: session.total_questions(),
        target: trial.target,
        presentation,
    }
}

async fn send_trial(app: &QuizApp, bot: &Bot, chat_id: ChatId, view: &TrialView) -> HandlerResult {
    let images_dir = &app.config.images_dir;

    bot.send_message(
        chat_id,
        format!(
            "Question {} of {}",
            view.question_number, view.total_questions
        ),
    )
    .await?;

    bot.send_photo(chat_id, InputFile::file(images_dir.join(&view.target)))
        .caption(format!("🎯 Target Image {}", view.question_number))
        .await?;

    let options = view
        .presentation
        .options
        .iter()
        .zip(OPTION_LABELS)
        .map(|(choice, label)| {
            InputMedia::Photo(
                InputMediaPhoto::new(InputFile::file(images_dir.join(&choice.asset)))
                    .caption(label),
            )
        })
        .collect::<Vec<_>>();
    bot.send_media_group(chat_id, options).await?;

    let keyboard = KeyboardMarkup::new(vec![OPTION_LABELS
        .iter()
        .map(|label| KeyboardButton::new(*label))
        .collect::<Vec<_>>()]);
    bot.send_message(chat_id, "👆 Which option is the correct rotated version?")
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

fn option_slot(text: Option<&str>) -> Option<usize> {
    OPTION_LABELS.iter().position(|label| Some(*label) == text)
}

/// Records an answer. Returns the summary when it was the last one of the attempt.
fn record_answer(session: &mut QuizSession, is_correct: bool, now: DateTime<Utc>) -> Option<Summary> {
    let result = session.answer(is_correct, now);
    log::debug!(
        "Answered question {} ({}, {:.2}s)",
        result.question_number,
        if result.correct { "correct" } else { "wrong" },
        result.elapsed_seconds
    );

    session.is_complete().then(|| session.summary(now))
}

/// Writes the feature row of a finished attempt. Failures are logged only.
fn export_attempt(features: &FeatureLog, age: u32, summary: &Summary) {
    let row = FeatureRow::from_summary(age, summary);
    if let Err(err) = features.append(&row) {
        log::warn!("Failed to export features: {}", err);
    }
}

async fn answer_trial(
    app: Arc<QuizApp>,
    bot: Bot,
    dialogue: QuizDialogue,
    (age, mut session): (u32, QuizSession),
    msg: Message,
) -> HandlerResult {
    let selection = option_slot(msg.text()).and_then(|slot| {
        session
            .cached_presentation()
            .and_then(|presentation| presentation.option(slot))
            .map(|choice| choice.is_correct)
    });

    let Some(is_correct) = selection else {
        // Anything but an option button redraws the same trial
        let view = prepare_trial(&app.pool, &mut session);
        dialogue.update(State::InProgress { age, session }).await?;
        send_trial(&app, &bot, msg.chat.id, &view).await?;
        return Ok(());
    };

    let Some(summary) = record_answer(&mut session, is_correct, Utc::now()) else {
        let view = prepare_trial(&app.pool, &mut session);
        dialogue.update(State::InProgress { age, session }).await?;
        send_trial(&app, &bot, msg.chat.id, &view).await?;
        return Ok(());
    };

    log::info!(
        "Chat {} completed a task: {:.1}% in {:.1}s",
        msg.chat.id.0,
        summary.accuracy_percent,
        summary.total_elapsed_seconds
    );
    let results_text = format_results(&summary, session.results());

    // State is stored before the export and the reply
    dialogue.update(State::Completed { age, session }).await?;
    export_attempt(&app.features, age, &summary);

    let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(NEW_TASK)]]);
    bot.send_message(msg.chat.id, results_text)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn completed(
    app: Arc<QuizApp>,
    bot: Bot,
    dialogue: QuizDialogue,
    (age, mut session): (u32, QuizSession),
    msg: Message,
) -> HandlerResult {
    if msg.text() != Some(NEW_TASK) {
        let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(NEW_TASK)]]);
        bot.send_message(msg.chat.id, "The task is over. Tap the button to try again")
            .reply_markup(keyboard)
            .await?;
        return Ok(());
    }

    session.reset();
    log::debug!(
        "Chat {} reset its session ({} trials in pool)",
        msg.chat.id.0,
        app.pool.len()
    );

    dialogue.update(State::ReadyToStart { age, session }).await?;
    send_welcome(&bot, msg.chat.id).await?;
    Ok(())
}

fn format_results(summary: &Summary, results: &[TrialResult]) -> String {
    let mut text = format!(
        "🎉 Task Completed!\n\n\
         ✅ Accuracy: {:.1}% ({}/{})\n\
         ⏱️ Total Time: {:.1}s\n\
         ⚡ Avg Time per Question: {:.2}s\n\n\
         📊 Question-by-Question Results",
        summary.accuracy_percent,
        summary.correct_count,
        summary.total_questions,
        summary.total_elapsed_seconds,
        summary.average_elapsed_seconds
    );
    for result in results {
        let status = if result.correct { "✅" } else { "❌" };
        text.push_str(&format!(
            "\n{} Question {}: {:.2}s",
            status, result.question_number, result.elapsed_seconds
        ));
    }
    text
}
