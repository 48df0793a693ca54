//! AI analysis and chat commands.

use anyhow::{Context, Result};
use dialoguer::{Input, theme::ColorfulTheme};
use serde_json::json;
use vanadristi_core::ChatSession;
use vanadristi_core::queries::{GetAiAnalysis, GetLatestAnalysis};

use super::CommandContext;
use crate::cli::AiAction;
use crate::format::{format_analysis_text, format_chat_message, format_latest_analysis_text};
use crate::util::{require_plant, with_spinner, write_output};

pub async fn cmd_ai(ctx: &CommandContext<'_>, action: AiAction) -> Result<()> {
    match action {
        AiAction::Analyze { plant } => {
            let id = require_plant(plant.plant, ctx.config, ctx.client, ctx.quiet).await?;
            let analysis = with_spinner(
                "Analyzing plant health...",
                ctx.quiet,
                ctx.client.fetch(&GetAiAnalysis::new(&id)),
            )
            .await
            .with_context(|| format!("Failed to analyze plant {}", id))?;
            ctx.render(&*analysis, || format_analysis_text(&analysis, ctx.opts))
        }
        AiAction::Latest => {
            let latest = with_spinner(
                "Loading latest analysis...",
                ctx.quiet,
                ctx.client.fetch(&GetLatestAnalysis),
            )
            .await
            .context("Failed to load the latest analysis")?;
            ctx.render(&*latest, || {
                format_latest_analysis_text((*latest).as_ref(), ctx.opts)
            })
        }
        AiAction::Chat { plant, question } => {
            let id = require_plant(plant.plant, ctx.config, ctx.client, ctx.quiet).await?;
            let mut session = open_session(ctx, &id).await;
            match question {
                Some(question) => ask_once(ctx, &mut session, &question).await,
                None => chat_loop(ctx, &mut session).await,
            }
        }
    }
}

/// Start a session, opening with the latest analysis when it is about this plant.
async fn open_session(ctx: &CommandContext<'_>, plant_id: &str) -> ChatSession {
    let latest = ctx.client.fetch(&GetLatestAnalysis).await.ok();
    let analysis = latest
        .as_deref()
        .and_then(Option::as_ref)
        .filter(|item| item.plant_id == plant_id)
        .and_then(|item| item.ai_result_parsed.as_ref());
    ChatSession::start(plant_id, analysis)
}

async fn ask_once(ctx: &CommandContext<'_>, session: &mut ChatSession, question: &str) -> Result<()> {
    let reply = with_spinner("Thinking...", ctx.quiet, session.send(ctx.client, question))
        .await
        .cloned();
    let Some(reply) = reply else {
        anyhow::bail!("The question is empty.");
    };
    ctx.render(
        &json!({ "question": question, "response": reply.text }),
        || format_chat_message(&reply, ctx.opts),
    )
}

async fn chat_loop(ctx: &CommandContext<'_>, session: &mut ChatSession) -> Result<()> {
    for message in session.messages() {
        write_output(ctx.output, &format_chat_message(message, ctx.opts))?;
    }
    eprintln!("Type a question, or an empty line to finish.");

    loop {
        let question: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read question")?;
        let question = question.trim();
        if question.is_empty() || question == "exit" || question == "quit" {
            return Ok(());
        }

        let reply = with_spinner("Thinking...", ctx.quiet, session.send(ctx.client, question))
            .await
            .cloned();
        if let Some(reply) = reply {
            write_output(ctx.output, &format_chat_message(&reply, ctx.opts))?;
        }
    }
}
