use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Pending,
    Winner,
}

/// A submitted photo eligible for the draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub image_ref: String,
    pub description: String,
    pub owner_ref: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub status: EntryStatus,
}

impl Entry {
    pub fn is_winner(&self) -> bool {
        self.status == EntryStatus::Winner
    }
}

/// Flag `winner` as the only winner in `entries`. A winner missing from the
/// snapshot (uploaded after the last load) is appended.
pub fn apply_winner(entries: &mut Vec<Entry>, winner: &Entry) {
    let mut found = false;
    for entry in entries.iter_mut() {
        if entry.id == winner.id {
            entry.status = EntryStatus::Winner;
            found = true;
        } else {
            entry.status = EntryStatus::Pending;
        }
    }
    if !found {
        let mut winner = winner.clone();
        winner.status = EntryStatus::Winner;
        entries.push(winner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, status: EntryStatus) -> Entry {
        Entry {
            id: id.into(),
            image_ref: format!("img/{id}.jpg"),
            description: format!("photo {id}"),
            owner_ref: "owner".into(),
            uploaded_at: Utc::now(),
            status,
        }
    }

    #[test]
    fn apply_winner_moves_flag() {
        let mut entries = vec![
            entry("1", EntryStatus::Winner),
            entry("2", EntryStatus::Pending),
            entry("3", EntryStatus::Pending),
        ];
        apply_winner(&mut entries, &entry("2", EntryStatus::Pending));
        let winners: Vec<&str> = entries.iter().filter(|e| e.is_winner()).map(|e| e.id.as_str()).collect();
        assert_eq!(winners, vec!["2"]);
    }

    #[test]
    fn apply_winner_appends_unknown_entry() {
        let mut entries = vec![entry("1", EntryStatus::Pending)];
        apply_winner(&mut entries, &entry("9", EntryStatus::Pending));
        assert_eq!(entries.len(), 2);
        assert!(entries[1].is_winner());
    }
}
