mod loader;
mod model;

pub use loader::{EntryLoader, LoadFailure, LoaderSettings};
pub use model::{apply_winner, Entry, EntryStatus};
