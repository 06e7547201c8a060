use std::collections::{HashMap, HashSet};
use std::fmt;

use caixa_core::{CategoryCatalogue, Direction, Money};
use serde::Serialize;
use uuid::Uuid;

use crate::normalize::{FieldNormalizer, NormalizedFields};
use crate::ofx::{self, RecordParser};
use crate::rules::RuleClassifier;

/// Identifies an item within one session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StagingId(pub u64);

impl fmt::Display for StagingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A classified record waiting to be loaded into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub fields: NormalizedFields,
    pub category: String,
    pub unit: Option<String>,
}

/// One reviewable row. Amount and direction are fixed once parsed; the other
/// fields change only through [`ImportSession`] operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagingItem {
    id: StagingId,
    date: String,
    amount: Money,
    direction: Direction,
    description: String,
    category: String,
    unit: Option<String>,
    selected: bool,
    category_edited: bool,
    external_ref: Option<String>,
}

impl StagingItem {
    pub fn id(&self) -> StagingId {
        self.id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the category was changed by hand since loading.
    pub fn category_edited(&self) -> bool {
        self.category_edited
    }

    pub fn external_ref(&self) -> Option<&str> {
        self.external_ref.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingField {
    Date,
    Description,
    Category,
    Unit,
}

impl std::str::FromStr for StagingField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(StagingField::Date),
            "description" => Ok(StagingField::Description),
            "category" => Ok(StagingField::Category),
            "unit" => Ok(StagingField::Unit),
            other => Err(format!("Field '{other}' is not editable")),
        }
    }
}

/// The in-memory batch for one import. Created empty, loaded once, edited
/// freely, then consumed whole by commit or cancel.
#[derive(Debug)]
pub struct ImportSession {
    id: Uuid,
    items: Vec<StagingItem>,
    next_id: u64,
    catalogue: CategoryCatalogue,
    units: Vec<String>,
    protect_manual_edits: bool,
    restrict_proposals: bool,
}

impl ImportSession {
    pub fn new(catalogue: CategoryCatalogue, units: Vec<String>) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "import session opened");
        Self {
            id,
            items: Vec::new(),
            next_id: 1,
            catalogue,
            units,
            protect_manual_edits: false,
            restrict_proposals: false,
        }
    }

    /// Parses, normalizes and classifies a decoded statement into a new session.
    /// Every item gets the first unit of `units`, if any.
    pub fn from_statement(
        text: &str,
        classifier: &RuleClassifier,
        catalogue: CategoryCatalogue,
        units: Vec<String>,
    ) -> Self {
        let mut session = Self::new(catalogue, units);
        let candidates = session.classify_records(RecordParser::parse(text), classifier);
        session.load(candidates);
        session
    }

    /// Same as [`ImportSession::from_statement`] for undecoded file contents.
    pub fn from_bytes(
        data: &[u8],
        classifier: &RuleClassifier,
        catalogue: CategoryCatalogue,
        units: Vec<String>,
    ) -> Self {
        let mut session = Self::new(catalogue, units);
        let candidates = session.classify_records(ofx::parse(data), classifier);
        session.load(candidates);
        session
    }

    fn classify_records(
        &self,
        records: Vec<ofx::RawRecord>,
        classifier: &RuleClassifier,
    ) -> Vec<Candidate> {
        let unit = self.default_unit().map(str::to_string);
        records
            .iter()
            .map(|raw| {
                let fields = FieldNormalizer::normalize(raw);
                let category =
                    classifier.classify(&fields.description, fields.direction, &self.catalogue);
                Candidate {
                    fields,
                    category,
                    unit: unit.clone(),
                }
            })
            .collect()
    }

    /// Replaces the list. Every loaded item starts selected.
    pub fn load(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        self.items = candidates
            .into_iter()
            .map(|c| {
                let id = StagingId(self.next_id);
                self.next_id += 1;
                StagingItem {
                    id,
                    date: c.fields.date,
                    amount: c.fields.amount,
                    direction: c.fields.direction,
                    description: c.fields.description,
                    category: c.category,
                    unit: c.unit,
                    selected: true,
                    category_edited: false,
                    external_ref: c.fields.external_ref,
                }
            })
            .collect();
        tracing::debug!(session = %self.id, items = self.items.len(), "staging loaded");
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn items(&self) -> &[StagingItem] {
        &self.items
    }

    pub fn get(&self, id: StagingId) -> Option<&StagingItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|i| i.selected).count()
    }

    pub fn catalogue(&self) -> &CategoryCatalogue {
        &self.catalogue
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn default_unit(&self) -> Option<&str> {
        self.units.first().map(String::as_str)
    }

    /// When set, AI merges skip items whose category was edited by hand.
    pub fn set_protect_manual_edits(&mut self, protect: bool) {
        self.protect_manual_edits = protect;
    }

    pub fn protect_manual_edits(&self) -> bool {
        self.protect_manual_edits
    }

    /// When set, AI proposals must name a category of the item's direction
    /// (case-insensitive, catalogue spelling kept); other names are ignored.
    pub fn set_restrict_proposals(&mut self, restrict: bool) {
        self.restrict_proposals = restrict;
    }

    pub fn restrict_proposals(&self) -> bool {
        self.restrict_proposals
    }

    fn item_mut(&mut self, id: StagingId) -> Option<&mut StagingItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// Flips one item's selection. Unknown ids are ignored.
    pub fn toggle_selection(&mut self, id: StagingId) {
        if let Some(item) = self.item_mut(id) {
            item.selected = !item.selected;
        }
    }

    pub fn set_selected(&mut self, id: StagingId, selected: bool) {
        if let Some(item) = self.item_mut(id) {
            item.selected = selected;
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for item in &mut self.items {
            item.selected = selected;
        }
    }

    /// Edits one item. An empty unit clears it. Returns whether the id was found.
    pub fn update_field(&mut self, id: StagingId, field: StagingField, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(item) = self.item_mut(id) else {
            tracing::debug!(%id, "update for unknown staging item ignored");
            return false;
        };
        match field {
            StagingField::Date => item.date = value,
            StagingField::Description => item.description = value,
            StagingField::Category => {
                item.category = value;
                item.category_edited = true;
            }
            StagingField::Unit => {
                item.unit = if value.trim().is_empty() { None } else { Some(value) };
            }
        }
        true
    }

    /// Sets `name` on every selected item and returns how many were changed.
    pub fn bulk_apply_category(&mut self, name: &str) -> usize {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|i| i.selected) {
            item.category = name.to_string();
            item.category_edited = true;
            changed += 1;
        }
        changed
    }

    /// Descriptions currently present, in first-seen order, without repeats.
    pub fn distinct_descriptions(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for item in &self.items {
            if seen.insert(item.description.as_str()) {
                out.push(item.description.clone());
            }
        }
        out
    }

    /// Overwrites the category of every item whose description has a proposal
    /// with the proposed value, hand-edited items included unless protection is
    /// on. Returns the number of items whose category changed.
    pub fn apply_category_proposals(&mut self, proposals: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for item in &mut self.items {
            let Some(proposed) = proposals.get(&item.description) else {
                continue;
            };
            if self.protect_manual_edits && item.category_edited {
                continue;
            }
            let category = if self.restrict_proposals {
                match self.catalogue.find(item.direction, proposed) {
                    Some(resolved) => resolved,
                    None => {
                        tracing::debug!(
                            category = %proposed,
                            direction = %item.direction,
                            "proposed category not in catalogue"
                        );
                        continue;
                    }
                }
            } else {
                proposed.as_str()
            };
            if item.category != category {
                item.category = category.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Drops the batch without producing anything.
    pub fn cancel(self) {
        tracing::info!(session = %self.id, discarded = self.items.len(), "import session cancelled");
    }

    pub(crate) fn into_items(self) -> (Uuid, Vec<StagingItem>) {
        (self.id, self.items)
    }
}
