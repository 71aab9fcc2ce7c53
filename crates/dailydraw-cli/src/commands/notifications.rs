use clap::Subcommand;
use dailydraw_core::broadcast::NoopSink;
use dailydraw_core::{Broadcaster, Config, Database, HistoryStore, Notification};

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List the notification history, most recent first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the number of unread notifications
    Unread,
    /// Mark one notification as read
    Read {
        /// Notification ID
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
    /// Drop the whole history
    Clear,
}

fn print_notification(n: &Notification) {
    let unread = if n.read { " " } else { "•" };
    let urgent = if n.urgent { "!" } else { " " };
    println!(
        "{unread}{urgent} {}  {:<12} {}: {}",
        n.created_at.format("%Y-%m-%d %H:%M:%S"),
        n.kind,
        n.title,
        n.message
    );
    println!("     id: {}", n.id);
}

pub fn run(action: NotificationsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let broadcaster = Broadcaster::with_capacity(Box::new(NoopSink), config.notifications.history_capacity);
    broadcaster.restore(db.load_history()?);

    match action {
        NotificationsAction::List { json } => {
            let history = broadcaster.history();
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("No notifications.");
            } else {
                history.iter().for_each(print_notification);
            }
        }
        NotificationsAction::Unread => {
            println!("{}", broadcaster.unread_count());
        }
        NotificationsAction::Read { id } => {
            if !broadcaster.mark_read(&id) {
                return Err(format!("notification not found: {id}").into());
            }
            db.save_history(&broadcaster.history())?;
            println!("ok");
        }
        NotificationsAction::ReadAll => {
            broadcaster.mark_all_read();
            db.save_history(&broadcaster.history())?;
            println!("ok");
        }
        NotificationsAction::Clear => {
            broadcaster.clear();
            db.save_history(&broadcaster.history())?;
            println!("history cleared");
        }
    }
    Ok(())
}
