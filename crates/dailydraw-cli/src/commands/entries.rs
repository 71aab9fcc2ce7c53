use std::sync::Arc;

use dailydraw_core::broadcast::NoopSink;
use dailydraw_core::{Broadcaster, Config, EntryLoader, HttpBackend};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let backend = HttpBackend::new(&config.backend_settings())?;
    let mut loader = EntryLoader::new(
        Arc::new(backend),
        config.loader_settings(),
        Broadcaster::new(Box::new(NoopSink)),
    );

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let entries = runtime.block_on(loader.load());
    if let Some(failure) = loader.failure() {
        return Err(format!("{} (after {} attempts)", failure.message, failure.attempts).into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No entries for the current cycle.");
        return Ok(());
    }
    for entry in &entries {
        let marker = if entry.is_winner() { "*" } else { " " };
        println!(
            "{marker} {:<12} {:<20} {}",
            entry.id,
            entry.uploaded_at.format("%Y-%m-%d %H:%M"),
            entry.description
        );
    }
    Ok(())
}
