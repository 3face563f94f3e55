//! Process wiring: bus, stores, agent, scheduler, sequencer, API, Telegram.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use attache_agent::{run_turn, AgentContext, ChatClient, ModelConfig, OpenRouterClient};
use attache_api::{ApiConfig, AppState};
use attache_events::{ApprovalGate, EventBus};
use attache_models::{BusEvent, EventKind, NodeLogEvent};
use attache_persistence::{MessageStore, ReminderStore};
use attache_scheduler::ReminderScheduler;
use attache_sequencer::{translate, Sequencer, SequencerHandle};
use attache_telegram::TelegramBot;

use crate::config::AppConfig;
use crate::error::Result;

pub async fn run(config: AppConfig) -> Result<()> {
    info!(state_dir = %config.state_dir.display(), "starting attache");

    let bus = EventBus::new();
    let reminders = Arc::new(ReminderStore::new(&config.state_dir));
    let messages = Arc::new(MessageStore::new(&config.state_dir));
    let gate = ApprovalGate::new(bus.clone());

    let chat: Arc<dyn ChatClient> = Arc::new(OpenRouterClient::from_env()?);

    let mut agent = AgentContext::new(
        bus.clone(),
        Arc::clone(&reminders),
        Arc::clone(&messages),
        Arc::clone(&chat),
        &config.hub_url,
    )
    .with_approval(gate);
    if let Some(model) = &config.model {
        agent = agent.with_model(ModelConfig::new(model));
    }
    if let Some(model) = &config.child_model {
        agent = agent.with_child_model(ModelConfig::new(model));
    }
    let agent = Arc::new(agent);

    // Visualization sequencer, fed by every node log on the bus.
    let (sequencer, sequencer_handle) = Sequencer::new();
    tokio::spawn(sequencer.run());
    let _sequencer_feed = spawn_sequencer_feed(&bus, sequencer_handle.clone())?;
    spawn_sequencer_state_log(&sequencer_handle);

    // Reminder scheduler with a shutdown line back from main.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scheduler = ReminderScheduler::new(Arc::clone(&reminders), bus.clone(), shutdown_rx);
    tokio::spawn(async move { scheduler.run().await });

    // HTTP control surface.
    let api_config = ApiConfig {
        port: config.api_port,
        hub_url: config.hub_url.clone(),
        ..ApiConfig::default()
    };
    let api_state = AppState::new(api_config, bus.clone(), Some(Arc::clone(&chat)))?;
    tokio::spawn(async move {
        if let Err(error) = attache_api::serve(api_state).await {
            error!(%error, "api server exited");
        }
    });

    let telegram = TelegramBot::new(
        &config.telegram_token,
        config.telegram_chat_id,
        bus.clone(),
        Arc::clone(&messages),
    );

    let _turns = spawn_turn_loop(&bus, Arc::clone(&agent), telegram.clone())?;
    let _reminder_turns = spawn_reminder_loop(&bus, Arc::clone(&agent), telegram.clone())?;
    let _agent_log = spawn_agent_log(&bus)?;

    let dispatcher = telegram.clone();
    let telegram_task = tokio::spawn(async move {
        if let Err(error) = dispatcher.run().await {
            error!(%error, "telegram dispatcher exited");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    telegram_task.abort();
    Ok(())
}

/// Replies to every flushed inbound message with a full agent turn.
fn spawn_turn_loop(
    bus: &EventBus,
    agent: Arc<AgentContext>,
    telegram: TelegramBot,
) -> Result<attache_events::SubscriptionHandle> {
    let (handle, mut rx) = bus.subscribe_channel(EventKind::MessageReceived)?;

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let BusEvent::MessageReceived(message) = event else {
                continue;
            };
            if let Err(error) = telegram.send_typing().await {
                warn!(%error, "failed to send typing action");
            }
            let reply = run_turn(&agent, &message.text, &message.images, &message.user_id).await;
            if let Err(error) = telegram.send_html(&reply).await {
                warn!(%error, "failed to send reply");
            }
        }
    });

    Ok(handle)
}

/// Announces fired reminders and lets the agent act on them.
fn spawn_reminder_loop(
    bus: &EventBus,
    agent: Arc<AgentContext>,
    telegram: TelegramBot,
) -> Result<attache_events::SubscriptionHandle> {
    let (handle, mut rx) = bus.subscribe_channel(EventKind::ReminderTriggered)?;

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let BusEvent::ReminderTriggered { id, note } = event else {
                continue;
            };
            info!(reminder_id = %id, "reminder fired");

            if let Err(error) = telegram
                .send_html(&format!("⏰ <b>Reminder:</b> {note}"))
                .await
            {
                warn!(%error, "failed to announce reminder");
            }

            let prompt = format!(
                "[SYSTEM EVENT] Reminder Triggered: \"{note}\".\n\
                 Perform the task requested in the reminder."
            );
            let reply = run_turn(&agent, &prompt, &[], "system-reminder-trigger").await;
            if let Err(error) = telegram.send_html(&reply).await {
                warn!(%error, "failed to send reminder follow-up");
            }
        }
    });

    Ok(handle)
}

/// Feeds node logs through the translator into the sequencer.
fn spawn_sequencer_feed(
    bus: &EventBus,
    handle: SequencerHandle,
) -> Result<attache_events::SubscriptionHandle> {
    let subscription = bus.subscribe(EventKind::NodeLog, move |event| {
        let BusEvent::NodeLog(log) = event else {
            return;
        };
        let translation = translate(&NodeLogEvent::from_log(log));
        if let Some(manifest) = translation.manifest {
            if let Err(error) = handle.set_manifest(manifest.cards, manifest.shortlist) {
                warn!(%error, "sequencer manifest update dropped");
            }
        }
        for step in translation.events {
            if let Err(error) = handle.external_event(step) {
                warn!(%error, "sequencer event dropped");
            }
        }
    })?;
    Ok(subscription)
}

fn spawn_sequencer_state_log(handle: &SequencerHandle) {
    let mut state_rx = handle.watch();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow().clone();
            debug!(
                step = state.current_step,
                running = state.is_running,
                complete = state.is_complete,
                "sequencer state changed"
            );
        }
    });
}

/// Mirrors agent log and error events into tracing output.
fn spawn_agent_log(bus: &EventBus) -> Result<Vec<attache_events::SubscriptionHandle>> {
    let logs = bus.subscribe(EventKind::AgentLog, |event| {
        if let BusEvent::AgentLog { role, content } = event {
            debug!(%role, %content, "agent log");
        }
    })?;
    let errors = bus.subscribe(EventKind::AgentError, |event| {
        if let BusEvent::AgentError { message } = event {
            error!(%message, "agent error");
        }
    })?;
    let decisions = bus.subscribe(EventKind::ApprovalDecision, |event| {
        if let BusEvent::ApprovalDecision(decision) = event {
            debug!(approval_id = %decision.id, approved = decision.approved, "approval decided");
        }
    })?;
    Ok(vec![logs, errors, decisions])
}
