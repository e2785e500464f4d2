// ============================================================================
// Data Set : snapshot courant du marché
// ============================================================================
// Contient le dernier résultat complet de l'API, et les projections dérivées :
// - recherche (liste principale uniquement)
// - tri (6 modes, ordre total explicite)
// - réconciliation de la sélection pour le panneau de comparaison
//
// CONCEPTS RUST :
// 1. Remplacement complet : replace() échange tout le Vec, jamais de fusion
// 2. Références : les projections retournent des &AssetRecord, pas de copie
// 3. Ordering : f64::total_cmp + then_with pour un ordre total
// ============================================================================

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::format;
use crate::models::{AssetRecord, PreferenceSet, Selection, SelectionEntry};

// ============================================================================
// Structure DataSet
// ============================================================================

/// Dernier snapshot complet (non persisté)
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    records: Vec<AssetRecord>,

    /// Index id -> position dans records
    index: HashMap<String, usize>,

    /// Heure du dernier remplacement réussi
    updated_at: Option<DateTime<Utc>>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace tout le snapshot
    ///
    /// Pas de fusion partielle : soit tout est remplacé, soit rien.
    pub fn replace(&mut self, records: Vec<AssetRecord>, at: DateTime<Utc>) {
        self.index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
        self.records = records;
        self.updated_at = Some(at);
    }

    /// Enregistrements dans l'ordre de l'API
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    /// Cherche un actif par id
    pub fn get(&self, id: &str) -> Option<&AssetRecord> {
        self.index.get(id).and_then(|&i| self.records.get(i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Vrai après le premier fetch réussi
    pub fn has_loaded(&self) -> bool {
        self.updated_at.is_some()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// ============================================================================
// Recherche
// ============================================================================

/// Filtre par sous-chaîne (insensible à la casse) sur le nom OU le symbole
///
/// Un terme vide (ou seulement des espaces) retourne la liste inchangée.
pub fn search<'a>(records: &'a [AssetRecord], term: &str) -> Vec<&'a AssetRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }

    records.iter().filter(|record| record.matches(&needle)).collect()
}

// ============================================================================
// Tri
// ============================================================================

/// Modes de tri de la liste principale
///
/// CONCEPT : Ordre total explicite
/// - Valeur absente = plus petite valeur possible
/// - Égalité départagée par id (croissant)
/// - Le mode descendant est exactement l'inverse du mode ascendant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    MarketCapDesc,
    MarketCapAsc,
    PriceDesc,
    PriceAsc,
    ChangeDesc,
    ChangeAsc,
}

impl SortMode {
    /// Tous les modes, dans l'ordre du cycle de la touche 's'
    pub const ALL: [SortMode; 6] = [
        SortMode::MarketCapDesc,
        SortMode::MarketCapAsc,
        SortMode::PriceDesc,
        SortMode::PriceAsc,
        SortMode::ChangeDesc,
        SortMode::ChangeAsc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::MarketCapDesc => "Market cap ↓",
            SortMode::MarketCapAsc => "Market cap ↑",
            SortMode::PriceDesc => "Price ↓",
            SortMode::PriceAsc => "Price ↑",
            SortMode::ChangeDesc => "24h change ↓",
            SortMode::ChangeAsc => "24h change ↑",
        }
    }

    /// Mode suivant (cycle)
    pub fn next(&self) -> SortMode {
        let position = Self::ALL.iter().position(|mode| mode == self).unwrap_or(0);
        Self::ALL[(position + 1) % Self::ALL.len()]
    }

    /// Même clé, direction opposée
    pub fn inverse(&self) -> SortMode {
        match self {
            SortMode::MarketCapDesc => SortMode::MarketCapAsc,
            SortMode::MarketCapAsc => SortMode::MarketCapDesc,
            SortMode::PriceDesc => SortMode::PriceAsc,
            SortMode::PriceAsc => SortMode::PriceDesc,
            SortMode::ChangeDesc => SortMode::ChangeAsc,
            SortMode::ChangeAsc => SortMode::ChangeDesc,
        }
    }

    fn is_descending(&self) -> bool {
        matches!(
            self,
            SortMode::MarketCapDesc | SortMode::PriceDesc | SortMode::ChangeDesc
        )
    }

    fn key(&self, record: &AssetRecord) -> Option<f64> {
        match self {
            SortMode::MarketCapDesc | SortMode::MarketCapAsc => record.market_cap,
            SortMode::PriceDesc | SortMode::PriceAsc => record.current_price,
            SortMode::ChangeDesc | SortMode::ChangeAsc => record.price_change_percentage_24h,
        }
    }

    /// Comparateur du mode
    pub fn compare(&self, a: &AssetRecord, b: &AssetRecord) -> Ordering {
        let ascending = compare_optional(self.key(a), self.key(b)).then_with(|| a.id.cmp(&b.id));
        if self.is_descending() {
            ascending.reverse()
        } else {
            ascending
        }
    }
}

/// None < Some(_), puis ordre total des f64
fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.total_cmp(&b),
    }
}

/// Trie une projection selon le mode
pub fn sort(mut records: Vec<&AssetRecord>, mode: SortMode) -> Vec<&AssetRecord> {
    records.sort_by(|a, b| mode.compare(a, b));
    records
}

// ============================================================================
// Réconciliation : panneau de comparaison
// ============================================================================

/// Une ligne du panneau de comparaison
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonRow<'a> {
    /// L'actif est présent dans le snapshot courant
    Live {
        entry: &'a SelectionEntry,
        record: &'a AssetRecord,
    },

    /// Absent du snapshot (avant le premier fetch, ou sorti du top 100)
    Pending { entry: &'a SelectionEntry },
}

impl<'a> ComparisonRow<'a> {
    pub fn entry(&self) -> &'a SelectionEntry {
        match *self {
            ComparisonRow::Live { entry, .. } | ComparisonRow::Pending { entry } => entry,
        }
    }

    pub fn record(&self) -> Option<&'a AssetRecord> {
        match *self {
            ComparisonRow::Live { record, .. } => Some(record),
            ComparisonRow::Pending { .. } => None,
        }
    }

    /// Valeur affichée pour un champ : formatée, ou placeholder si Pending
    pub fn display(&self, field: ComparisonField) -> String {
        match self.record() {
            Some(record) => field.format(record),
            None => PENDING_PLACEHOLDER.to_string(),
        }
    }
}

/// Texte affiché pour les champs numériques d'un actif absent du snapshot
pub const PENDING_PLACEHOLDER: &str = "Loading...";

/// Associe chaque entrée de la sélection au snapshot, dans l'ordre de la sélection
///
/// Ne retourne jamais d'erreur et ne supprime jamais d'entrée.
pub fn reconcile<'a>(selection: &'a Selection, data: &'a DataSet) -> Vec<ComparisonRow<'a>> {
    selection
        .entries()
        .iter()
        .map(|entry| match data.get(&entry.id) {
            Some(record) => ComparisonRow::Live { entry, record },
            None => ComparisonRow::Pending { entry },
        })
        .collect()
}

/// Champs numériques affichables dans la comparaison (et la liste)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonField {
    Price,
    Change,
    MarketCap,
    Volume,
}

impl ComparisonField {
    pub fn label(&self) -> &'static str {
        match self {
            ComparisonField::Price => "Price",
            ComparisonField::Change => "24h",
            ComparisonField::MarketCap => "Market cap",
            ComparisonField::Volume => "Volume",
        }
    }

    pub fn format(&self, record: &AssetRecord) -> String {
        match self {
            ComparisonField::Price => format::format_price(record.current_price),
            ComparisonField::Change => format::format_change(record.price_change_percentage_24h),
            ComparisonField::MarketCap => format::format_magnitude(record.market_cap),
            ComparisonField::Volume => format::format_magnitude(record.total_volume),
        }
    }

    /// Champs visibles selon les préférences (le prix est toujours affiché)
    pub fn visible(prefs: &PreferenceSet) -> Vec<ComparisonField> {
        let mut fields = vec![ComparisonField::Price];
        if prefs.show_change {
            fields.push(ComparisonField::Change);
        }
        if prefs.show_market_cap {
            fields.push(ComparisonField::MarketCap);
        }
        if prefs.show_volume {
            fields.push(ComparisonField::Volume);
        }
        fields
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new("bitcoin", "Bitcoin", "btc")
                .with_price(67000.0)
                .with_change(1.5)
                .with_market_cap(1.3e12)
                .with_volume(2.5e10),
            AssetRecord::new("ethereum", "Ethereum", "eth")
                .with_price(3500.0)
                .with_change(-2.0)
                .with_market_cap(4.2e11),
            AssetRecord::new("tether", "Tether", "usdt")
                .with_price(1.0)
                .with_market_cap(1.1e11),
            AssetRecord::new("bitcoin-cash", "Bitcoin Cash", "bch")
                .with_price(450.0)
                .with_change(1.5),
            AssetRecord::new("pepe", "Pepe", "PEPE").with_price(0.0000123),
        ]
    }

    fn ids(records: &[&AssetRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_search_empty_is_identity() {
        let records = sample();
        let all: Vec<&AssetRecord> = records.iter().collect();
        assert_eq!(search(&records, ""), all);
        assert_eq!(search(&records, "   "), all);
    }

    #[test]
    fn test_search_matches_exactly_the_predicate() {
        let records = sample();
        for term in ["BIT", "eth", "pe", "usd", "zzz", "h"] {
            let found = search(&records, term);
            let needle = term.to_lowercase();

            for record in &records {
                let expected = record.name.to_lowercase().contains(&needle)
                    || record.symbol.to_lowercase().contains(&needle);
                let included = found.iter().any(|r| r.id == record.id);
                assert_eq!(expected, included, "term {:?} record {}", term, record.id);
            }
        }
    }

    #[test]
    fn test_search_case_insensitive_symbol() {
        let records = sample();
        assert_eq!(ids(&search(&records, "pepe")), vec!["pepe"]);
        assert_eq!(ids(&search(&records, "BCH")), vec!["bitcoin-cash"]);
    }

    #[test]
    fn test_sort_is_permutation_and_ordered() {
        let records = sample();
        for mode in SortMode::ALL {
            let sorted = sort(records.iter().collect(), mode);

            let mut sorted_ids = ids(&sorted);
            let mut original_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
            sorted_ids.sort();
            original_ids.sort();
            assert_eq!(sorted_ids, original_ids, "mode {:?}", mode);

            for pair in sorted.windows(2) {
                assert_ne!(mode.compare(pair[0], pair[1]), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_inverse_mode_reverses_exactly() {
        let records = sample();
        for mode in SortMode::ALL {
            let forward = ids(&sort(records.iter().collect(), mode));
            let mut backward = ids(&sort(records.iter().collect(), mode.inverse()));
            backward.reverse();
            assert_eq!(forward, backward, "mode {:?}", mode);
        }
    }

    #[test]
    fn test_absent_values_rank_lowest() {
        let records = sample();

        let asc = ids(&sort(records.iter().collect(), SortMode::ChangeAsc));
        // tether et pepe n'ont pas de variation : en tête, départagés par id
        assert_eq!(&asc[..2], &["pepe".to_string(), "tether".to_string()]);

        let desc = ids(&sort(records.iter().collect(), SortMode::ChangeDesc));
        // bitcoin et bitcoin-cash à égalité (1.5) : ordre inverse des ids
        assert_eq!(desc[0], "bitcoin-cash");
        assert_eq!(desc[1], "bitcoin");
        assert_eq!(&desc[3..], &["tether".to_string(), "pepe".to_string()]);
    }

    #[test]
    fn test_sort_mode_cycle() {
        let mut mode = SortMode::default();
        for _ in 0..SortMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, SortMode::default());
        assert_eq!(SortMode::PriceAsc.inverse().inverse(), SortMode::PriceAsc);
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut data = DataSet::new();
        assert!(!data.has_loaded());

        data.replace(sample(), Utc::now());
        assert_eq!(data.len(), 5);
        assert!(data.get("tether").is_some());

        data.replace(vec![AssetRecord::new("solana", "Solana", "sol")], Utc::now());
        assert_eq!(data.len(), 1);
        assert!(data.get("tether").is_none());
        assert!(data.get("solana").is_some());
    }

    #[test]
    fn test_reconcile_keeps_order_and_pending() {
        let mut data = DataSet::new();
        data.replace(sample(), Utc::now());

        let mut selection = Selection::new();
        selection.toggle(&AssetRecord::new("ethereum", "Ethereum", "eth"));
        selection.toggle(&AssetRecord::new("delisted", "Delisted", "dls"));
        selection.toggle(&AssetRecord::new("bitcoin", "Bitcoin", "btc"));

        let rows = reconcile(&selection, &data);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].entry().id, "ethereum");
        assert!(rows[0].record().is_some());
        assert!(matches!(rows[1], ComparisonRow::Pending { .. }));
        assert_eq!(rows[1].display(ComparisonField::Price), PENDING_PLACEHOLDER);
        assert_eq!(rows[2].display(ComparisonField::Price), "67,000.00");
    }

    #[test]
    fn test_reconcile_before_first_fetch() {
        let data = DataSet::new();
        let mut selection = Selection::new();
        selection.toggle(&AssetRecord::new("bitcoin", "Bitcoin", "btc"));

        let rows = reconcile(&selection, &data);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].record().is_none());
        assert_eq!(rows[0].entry().name, "Bitcoin");
    }

    #[test]
    fn test_visible_fields_follow_preferences() {
        let mut prefs = PreferenceSet::default();
        assert_eq!(ComparisonField::visible(&prefs), vec![ComparisonField::Price]);

        prefs.show_volume = true;
        prefs.show_change = true;
        assert_eq!(
            ComparisonField::visible(&prefs),
            vec![ComparisonField::Price, ComparisonField::Change, ComparisonField::Volume]
        );
    }
}
