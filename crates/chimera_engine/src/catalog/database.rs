use std::cell::OnceCell;
use std::collections::HashMap;

use super::defaults::default_entries;
use super::types::{NumericField, TemplateCategory, TemplateEntry};

#[derive(Debug, Default, Clone)]
struct CatalogIndex {
    by_id: HashMap<String, usize>,
    by_category: HashMap<TemplateCategory, Vec<usize>>,
}

impl CatalogIndex {
    fn build(entries: &[TemplateEntry]) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            // Later duplicates shadow earlier ones.
            by_id.insert(entry.id.clone(), idx);
        }

        let mut winners = by_id.values().copied().collect::<Vec<_>>();
        winners.sort_unstable();
        let mut by_category = HashMap::<TemplateCategory, Vec<usize>>::new();
        for idx in winners {
            by_category
                .entry(entries[idx].category)
                .or_default()
                .push(idx);
        }

        Self { by_id, by_category }
    }
}

/// Static table of every known template.
///
/// The id and category indexes are built on first lookup and thrown away
/// whenever the backing list is edited, so the next lookup pays one full
/// rebuild.
#[derive(Debug, Default, Clone)]
pub struct PrefabCatalog {
    entries: Vec<TemplateEntry>,
    index: OnceCell<CatalogIndex>,
}

impl PrefabCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<TemplateEntry>) -> Self {
        Self {
            entries,
            index: OnceCell::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.initialize_defaults();
        catalog
    }

    /// Seeds the built-in templates when the catalog is empty. Returns how
    /// many entries were added.
    pub fn initialize_defaults(&mut self) -> usize {
        if !self.entries.is_empty() {
            return 0;
        }
        self.entries = default_entries();
        self.invalidate_index();
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.index().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<TemplateEntry> {
        self.invalidate_index();
        &mut self.entries
    }

    /// Inserts or replaces the entry with the same id.
    pub fn insert(&mut self, entry: TemplateEntry) -> Option<TemplateEntry> {
        let existing = self.index().by_id.get(&entry.id).copied();
        self.invalidate_index();
        match existing {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index().by_id.contains_key(id)
    }

    pub fn lookup(&self, id: &str) -> Option<&TemplateEntry> {
        self.index()
            .by_id
            .get(id)
            .and_then(|idx| self.entries.get(*idx))
    }

    pub fn lookup_by_category(&self, category: TemplateCategory) -> Vec<&TemplateEntry> {
        self.index()
            .by_category
            .get(&category)
            .map(|indices| indices.iter().map(|idx| &self.entries[*idx]).collect())
            .unwrap_or_default()
    }

    pub fn first_in_category(&self, category: TemplateCategory) -> Option<&TemplateEntry> {
        self.index()
            .by_category
            .get(&category)
            .and_then(|indices| indices.first())
            .map(|idx| &self.entries[*idx])
    }

    pub fn lookup_by_numeric_range(
        &self,
        field: NumericField,
        min: f32,
        max: f32,
    ) -> Vec<&TemplateEntry> {
        if min > max {
            return Vec::new();
        }
        self.indexed_entries()
            .filter(|entry| {
                let value = entry.params.get(field);
                value >= min && value <= max
            })
            .collect()
    }

    pub fn lookup_by_capability(&self, tag: &str) -> Vec<&TemplateEntry> {
        self.indexed_entries()
            .filter(|entry| entry.has_capability(tag))
            .collect()
    }

    /// Entries of `category` that provide every requested capability, the
    /// tightest fit first.
    pub fn recommend(
        &self,
        category: TemplateCategory,
        capabilities: &[&str],
    ) -> Vec<&TemplateEntry> {
        let mut matches = self
            .lookup_by_category(category)
            .into_iter()
            .filter(|entry| capabilities.iter().all(|tag| entry.has_capability(tag)))
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| {
            let extra_a = a.required_capabilities.len().saturating_sub(capabilities.len());
            let extra_b = b.required_capabilities.len().saturating_sub(capabilities.len());
            extra_a.cmp(&extra_b).then_with(|| a.id.cmp(&b.id))
        });
        matches
    }

    pub fn category_counts(&self) -> Vec<(TemplateCategory, usize)> {
        let index = self.index();
        TemplateCategory::ALL
            .into_iter()
            .map(|category| {
                let count = index.by_category.get(&category).map_or(0, Vec::len);
                (category, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    fn indexed_entries(&self) -> impl Iterator<Item = &TemplateEntry> {
        let index = self.index();
        self.entries
            .iter()
            .enumerate()
            .filter(move |(idx, entry)| index.by_id.get(&entry.id) == Some(idx))
            .map(|(_, entry)| entry)
    }

    fn index(&self) -> &CatalogIndex {
        self.index.get_or_init(|| CatalogIndex::build(&self.entries))
    }

    fn invalidate_index(&mut self) {
        self.index = OnceCell::new();
    }
}
