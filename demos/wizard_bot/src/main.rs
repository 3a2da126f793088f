//! Registration Wizard Example
//!
//! A three-step conversation built from steps, filters and the
//! conversation store:
//!
//! ```text
//! /start ──▶ ASK_NAME ──text──▶ ASK_AGE ──number──▶ CONFIRM ──[Yes]──▶ idle
//!               ▲                                      │
//!               └───────────────[No]───────────────────┘
//! ```
//!
//! `/cancel` leaves the wizard from any step. Routes are tried in
//! registration order, so the commands are registered before the step
//! handlers that would otherwise swallow them.
//!
//! # Usage
//!
//! ```bash
//! MAXKIT_BOT__TOKEN=... cargo run --package wizard-bot
//! cargo run --package wizard-bot -- --config ./maxkit.toml --profile production
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use maxkit::prelude::*;
use tracing::info;

const ASK_NAME: Step = Step::new("registration", "name");
const ASK_AGE: Step = Step::new("registration", "age");
const CONFIRM: Step = Step::new("registration", "confirm");

#[derive(Debug, Parser)]
#[command(about = "Registration wizard bot for the Max messenger")]
struct Args {
    /// Configuration file (defaults to ./maxkit.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn reply(bot: &BoxedBot, chat_id: i64, message: NewMessage) -> Result<()> {
    bot.send_message(Target::Chat(chat_id), message).await?;
    Ok(())
}

async fn start(bot: BoxedBot, msg: Message, conv: Conversation) -> Result<()> {
    conv.set_state(ASK_NAME);
    reply(&bot, msg.chat_id, NewMessage::text("Welcome! Please enter your name:")).await
}

async fn cancel(bot: BoxedBot, msg: Message, conv: Conversation) -> Result<()> {
    let text = if conv.erase_state() {
        "Current operation cancelled."
    } else {
        "No active operation to cancel."
    };
    reply(&bot, msg.chat_id, NewMessage::text(text)).await
}

async fn process_name(bot: BoxedBot, msg: Message, conv: Conversation) -> Result<()> {
    let name = msg.text().trim();
    if name.is_empty() {
        return reply(&bot, msg.chat_id, NewMessage::text("Please send your name as text.")).await;
    }

    conv.set_data("name", name)?;
    conv.set_state(ASK_AGE);
    reply(
        &bot,
        msg.chat_id,
        NewMessage::text(format!("Nice to meet you, {name}! Now please enter your age:")),
    )
    .await
}

async fn process_age(bot: BoxedBot, msg: Message, conv: Conversation) -> Result<()> {
    let Ok(age) = msg.text().trim().parse::<u8>() else {
        return reply(&bot, msg.chat_id, NewMessage::text("Please enter a valid number for age.")).await;
    };

    conv.set_data("age", age)?;
    let name: String = conv.require_data("name")?;
    conv.set_state(CONFIRM);

    let keyboard = InlineKeyboard::new().row([
        Button::callback("Yes", "confirm_yes"),
        Button::callback("No", "confirm_no"),
    ]);
    reply(
        &bot,
        msg.chat_id,
        NewMessage::text(format!("Please confirm your details:\nName: {name}\nAge: {age}"))
            .keyboard(keyboard),
    )
    .await
}

async fn confirm_yes(bot: BoxedBot, query: CallbackQuery, conv: Conversation) -> Result<()> {
    let name: String = conv.require_data("name")?;
    let age: u8 = conv.require_data("age")?;
    conv.erase_state();

    info!(chat_id = query.chat_id, %name, age, "Registration completed");
    bot.answer_callback(
        &query.callback_id,
        CallbackAnswer::replace(NewMessage::text(format!(
            "Thank you for registration, {name}! Your data has been saved."
        ))),
    )
    .await?;
    Ok(())
}

async fn confirm_no(bot: BoxedBot, query: CallbackQuery, conv: Conversation) -> Result<()> {
    conv.set_state(ASK_NAME);
    bot.answer_callback(&query.callback_id, CallbackAnswer::notify("Registration cancelled"))
        .await?;
    reply(&bot, query.chat_id, NewMessage::text("Let's start over. Please enter your name:")).await
}

/// Buttons of a finished or cancelled wizard.
async fn stale_button(bot: BoxedBot, query: CallbackQuery) -> Result<()> {
    bot.answer_callback(&query.callback_id, CallbackAnswer::notify("This form is no longer active."))
        .await?;
    Ok(())
}

async fn greet(bot: BoxedBot, event: LifecycleEvent) -> Result<()> {
    reply(&bot, event.chat_id, NewMessage::text("Hi! Send /start to register.")).await
}

fn router() -> Router {
    let mut router = Router::new();

    router
        .on_message("start", start, filters![filter::command("start")])
        .on_message("cancel", cancel, filters![filter::command("cancel")])
        .on_message("process_name", process_name, filters![filter::state(ASK_NAME)])
        .on_message("process_age", process_age, filters![filter::state(ASK_AGE)]);

    router
        .on_callback(
            "confirm_yes",
            confirm_yes,
            filters![filter::state(CONFIRM), filter::callback("confirm_yes")],
        )
        .on_callback(
            "confirm_no",
            confirm_no,
            filters![filter::state(CONFIRM), filter::callback("confirm_no")],
        )
        .on_callback(
            "stale_button",
            stale_button,
            filters![filter::callback_matches(|payload| payload.starts_with("confirm_"))],
        );

    router.on_lifecycle(
        "greet",
        greet,
        filters![filter::lifecycle(LifecycleKind::BotStarted)],
    );

    router
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = MaxkitRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime.run(router()).await?;

    let stats = runtime.stats();
    info!(
        handled = stats.handled,
        failed = stats.failed,
        "Wizard bot stopped"
    );
    Ok(())
}
