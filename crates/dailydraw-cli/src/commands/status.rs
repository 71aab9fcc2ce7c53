use chrono::Utc;
use dailydraw_core::draw::{format_remaining, DrawCycle};
use dailydraw_core::{Database, DeadlineStore, HistoryStore};
use serde_json::json;

/// Read-only view of the persisted cycle. Never starts or resumes one.
pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let deadline = db.load_deadline()?;
    let unread = db.load_history()?.iter().filter(|n| !n.read).count();
    let now = Utc::now();

    let Some(deadline) = deadline else {
        if json {
            println!("{}", json!({ "deadline": null, "unread": unread }));
        } else {
            println!("No active cycle. Start one with `dailydraw-cli run`.");
        }
        return Ok(());
    };

    let remaining_secs = DrawCycle::with_deadline(deadline).remaining_secs(now);
    if json {
        let value = json!({
            "deadline": deadline,
            "remainingSecs": remaining_secs.max(0),
            "remaining": format_remaining(remaining_secs),
            "elapsed": remaining_secs <= 0,
            "unread": unread,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Deadline:  {}", deadline.to_rfc3339());
    if remaining_secs > 0 {
        println!("Remaining: {}", format_remaining(remaining_secs));
    } else {
        println!("Remaining: 00:00:00 (deadline passed; a new cycle starts on the next run)");
    }
    println!("Unread:    {unread}");
    Ok(())
}
