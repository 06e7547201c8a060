use caixa_core::{EntryStatus, LedgerEntry};
use chrono::Utc;
use uuid::Uuid;

use crate::staging::{ImportSession, StagingItem};

pub struct ImportCommitter;

impl ImportCommitter {
    /// One settled entry per selected item, in staging order, each with a fresh
    /// id. Unselected items produce nothing. No field is re-validated here.
    pub fn commit(items: &[StagingItem]) -> Vec<LedgerEntry> {
        let created_at = Utc::now();
        items
            .iter()
            .filter(|item| item.is_selected())
            .map(|item| LedgerEntry {
                id: Uuid::new_v4(),
                date: item.date().to_string(),
                amount: item.amount(),
                direction: item.direction(),
                description: item.description().to_string(),
                category: item.category().to_string(),
                unit: item.unit().map(str::to_string),
                status: EntryStatus::Settled,
                created_at,
                external_ref: item.external_ref().map(str::to_string),
            })
            .collect()
    }
}

impl ImportSession {
    /// Consumes the session. Unselected items are discarded with it.
    pub fn commit(self) -> Vec<LedgerEntry> {
        let (session_id, items) = self.into_items();
        let entries = ImportCommitter::commit(&items);
        tracing::info!(
            session = %session_id,
            committed = entries.len(),
            discarded = items.len() - entries.len(),
            "import session committed"
        );
        entries
    }
}
