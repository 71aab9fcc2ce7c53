use std::sync::{Arc, Mutex};

use clap::Args;
use dailydraw_core::broadcast::{NoopSink, NotificationSink, SubscriberError, TracingSink};
use dailydraw_core::{
    Broadcaster, Config, Database, DrawCoordinator, EntryLoader, HistoryStore, HttpBackend, Notification,
    RetryTrigger, Subscriber, SystemClock,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Args)]
pub struct RunArgs {
    /// Echo every notification to stdout
    #[arg(long)]
    pub echo: bool,
}

/// Merges each delivered notification into the stored history, so marks made
/// by other processes in the meantime are kept.
struct HistoryWriter {
    db: Mutex<Database>,
    capacity: usize,
}

impl Subscriber for HistoryWriter {
    fn on_notification(&self, notification: &Notification) -> Result<(), SubscriberError> {
        let db = self.db.lock().map_err(|_| "history database lock poisoned")?;
        let mut history = db.load_history()?;
        history.retain(|n| n.id != notification.id);
        history.insert(0, notification.clone());
        history.truncate(self.capacity);
        db.save_history(&history)?;
        Ok(())
    }
}

/// `kill -HUP <pid>` asks the running host to reload entries, clearing a
/// loader error that would otherwise hold until the next restart.
#[cfg(unix)]
fn spawn_retry_listener(trigger: RetryTrigger, cancel: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = hangup.recv() => match received {
                    Some(()) => {
                        tracing::info!("SIGHUP received, retrying entry load");
                        trigger.request();
                    }
                    None => break,
                },
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_retry_listener(_trigger: RetryTrigger, _cancel: CancellationToken) -> std::io::Result<()> {
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DAILYDRAW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = Config::load()?;

    let sink: Box<dyn NotificationSink> = if config.notifications.os_enabled {
        Box::new(TracingSink)
    } else {
        Box::new(NoopSink)
    };
    let broadcaster = Broadcaster::with_icon(
        sink,
        config.notifications.history_capacity,
        config.notifications.icon.clone(),
    );
    broadcaster.restore(Database::open()?.load_history()?);

    let _history = broadcaster.subscribe(Arc::new(HistoryWriter {
        db: Mutex::new(Database::open()?),
        capacity: config.notifications.history_capacity,
    }));
    if args.echo {
        let _echo = broadcaster.subscribe(Arc::new(|n: &Notification| -> Result<(), SubscriberError> {
            println!("[{}] {}: {}", n.kind, n.title, n.message);
            Ok(())
        }));
    }

    let backend = Arc::new(HttpBackend::new(&config.backend_settings())?);
    let loader = EntryLoader::new(backend.clone(), config.loader_settings(), broadcaster.clone());
    let cancel = CancellationToken::new();
    let mut coordinator = DrawCoordinator::new(
        config.coordinator_settings()?,
        Arc::new(SystemClock),
        Box::new(Database::open()?),
        loader,
        backend,
        broadcaster,
        cancel.clone(),
    )?;

    let snapshot = coordinator.snapshot();
    tracing::info!(
        pid = std::process::id(),
        deadline = %snapshot.deadline,
        remaining = %snapshot.remaining,
        "draw coordinator started"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        });
        spawn_retry_listener(coordinator.retry_trigger(), cancel.clone())?;
        coordinator.run(config.tick_interval()).await?;
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
