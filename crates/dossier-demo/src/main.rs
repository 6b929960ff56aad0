//! Dossier bulk actions - demo driver.
//!
//! Runs the selection, confirmation, execution and undo lifecycle against an
//! in-memory deliverable list and prints each surface as text.

mod render;
mod simulated;

use std::sync::Arc;
use std::time::Duration;

use dossier_bulk::{
    ActionCatalog, BulkActionController, Confirmation, ConfirmationContext, ConfirmationError,
    ConfirmationMode, ExecutionOutcome, Keystroke, LifecycleError, PreviewConfirmation,
};
use dossier_core::{
    ActionKind, BulkConfig, ConfigError, EntityStatus, EntityType, ItemId, SelectableItem,
};
use thiserror::Error;

use crate::simulated::SimulatedExecutor;

const ITEM_COUNT: usize = 25;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

fn sample_items() -> Vec<SelectableItem> {
    let statuses = ["pending", "in_progress", "review"];
    (1..=ITEM_COUNT)
        .map(|i| {
            SelectableItem::new(format!("d-{:02}", i))
                .with_name(format!("Deliverable {}", i))
                .with_status(statuses[i % statuses.len()])
                .with_priority("medium")
        })
        .collect()
}

fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Completed {
            report,
            undo_available,
        } => println!(
            "  -> {} succeeded, {} failed{}",
            report.success_count,
            report.failed_count,
            if *undo_available { ", undo available" } else { "" }
        ),
        ExecutionOutcome::Failed { error, .. } => println!("  -> failed: {}", error),
        ExecutionOutcome::Cancelled { processed } => {
            println!("  -> cancelled after {} items", processed)
        }
    }
}

// =============================================================================
// Demo
// =============================================================================

async fn run(config: BulkConfig) -> Result<(), DemoError> {
    let items = sample_items();
    let executor = Arc::new(SimulatedExecutor::new(items.clone()));
    executor.fail_item("d-07");

    let controller = BulkActionController::new(
        config,
        EntityType::Deliverable,
        Arc::new(ActionCatalog::with_defaults()),
        executor.clone(),
    )?;

    // Lifecycle events go to the log, as a host's telemetry sink would
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(
                "{} {}",
                event.event_name(),
                serde_json::to_string(&event).unwrap_or_default()
            );
        }
    });

    let mut progress = controller.subscribe_progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let line = render::progress_line(&progress.borrow_and_update());
            println!("  {}", line);
        }
    });

    let ids: Vec<ItemId> = items.iter().map(SelectableItem::item_id).collect();
    controller.set_visible(ids);

    // Selection
    println!("== Selection");
    controller.toggle("d-01")?;
    controller.toggle("d-03")?;
    controller.shift_select("d-12")?;
    println!(
        "{}",
        render::toolbar_line(&controller.selection(), &controller.toolbar_actions())
    );

    // Update status through the simple dialog
    println!("== Update status");
    let mut dialog = controller.begin_confirmation(
        ActionKind::UpdateStatus,
        &executor.items(),
        ConfirmationMode::Simple,
    )?;
    if let Some(options) = render::form_options(dialog.action().kind) {
        println!("{}", options);
    }
    dialog.form_mut().status = EntityStatus::Completed;
    let invocation = dialog.confirm()?;
    let outcome = controller.execute(invocation).await?;
    dialog.settle();
    print_outcome(&outcome);

    if let Some(view) = controller.undo_view() {
        println!("{}", render::undo_line(&view));
    }

    // Undo through the keyboard shortcut
    println!("== Undo");
    let ctrl_z = Keystroke::new("z").ctrl();
    match controller.key_down(&ctrl_z, false).await {
        Some(Ok(record)) => println!("  restored {} items", record.item_ids.len()),
        Some(Err(e)) => println!("  undo failed: {}", e),
        None => println!("  nothing to undo"),
    }
    controller.key_up(&ctrl_z);

    // Archive with a preview, excluding one item
    println!("== Archive");
    controller.select_all()?;
    let definition = controller.definition(ActionKind::Archive)?;
    let context = ConfirmationContext::new(
        definition,
        controller.entity_type(),
        controller.config().undo_ttl_ms,
    );
    let mut preview =
        PreviewConfirmation::new(context, controller.selected_items(&executor.items()));
    preview.set_query("Deliverable 2");
    preview.toggle_item(&ItemId::from("d-02"))?;
    println!("{}", render::preview_text(&preview));
    preview.clear_query();

    let invocation = preview.confirm()?;
    let outcome = controller.execute(invocation).await?;
    preview.settle();
    print_outcome(&outcome);

    // Hovering the toast holds the countdown
    controller.pointer_enter();
    tokio::time::sleep(Duration::from_secs(2)).await;
    if let Some(view) = controller.undo_view() {
        println!("{}", render::undo_line(&view));
    }
    controller.pointer_leave();
    controller.dismiss_undo();

    // Export needs no confirmation and has no undo
    println!("== Export");
    controller.toggle("d-05")?;
    let outcome = controller.execute_selected(ActionKind::Export).await?;
    print_outcome(&outcome);

    // Let the watcher tasks drain
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Dossier bulk-action demo starting...");

    let config = match dossier_core::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default config: {}", e);
            BulkConfig::default()
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to create tokio runtime");

    if let Err(e) = runtime.block_on(run(config)) {
        tracing::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
