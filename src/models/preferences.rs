// ============================================================================
// Structure : PreferenceSet
// ============================================================================
// Drapeaux d'affichage choisis par l'utilisateur, persistés entre sessions
// ============================================================================

use serde::{Deserialize, Serialize};

/// Préférences d'affichage
///
/// CONCEPT RUST : #[serde(default)] au niveau struct
/// - Un champ absent du JSON persisté prend la valeur de Default (false)
/// - Permet d'ajouter un drapeau sans casser les fichiers existants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceSet {
    pub show_change: bool,
    pub show_market_cap: bool,
    pub show_volume: bool,
    pub dark_mode: bool,
}

/// Un drapeau individuel de PreferenceSet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceFlag {
    ShowChange,
    ShowMarketCap,
    ShowVolume,
    DarkMode,
}

impl PreferenceFlag {
    /// Libellé pour les notifications
    pub fn label(&self) -> &'static str {
        match self {
            PreferenceFlag::ShowChange => "24h change",
            PreferenceFlag::ShowMarketCap => "market cap",
            PreferenceFlag::ShowVolume => "volume",
            PreferenceFlag::DarkMode => "dark mode",
        }
    }
}

impl PreferenceSet {
    /// Lit un drapeau
    pub fn get(&self, flag: PreferenceFlag) -> bool {
        match flag {
            PreferenceFlag::ShowChange => self.show_change,
            PreferenceFlag::ShowMarketCap => self.show_market_cap,
            PreferenceFlag::ShowVolume => self.show_volume,
            PreferenceFlag::DarkMode => self.dark_mode,
        }
    }

    /// Modifie un drapeau
    pub fn set(&mut self, flag: PreferenceFlag, value: bool) {
        let slot = match flag {
            PreferenceFlag::ShowChange => &mut self.show_change,
            PreferenceFlag::ShowMarketCap => &mut self.show_market_cap,
            PreferenceFlag::ShowVolume => &mut self.show_volume,
            PreferenceFlag::DarkMode => &mut self.dark_mode,
        };
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unset() {
        let prefs = PreferenceSet::default();
        assert!(!prefs.show_change);
        assert!(!prefs.show_market_cap);
        assert!(!prefs.show_volume);
        assert!(!prefs.dark_mode);
    }

    #[test]
    fn test_get_set() {
        let mut prefs = PreferenceSet::default();
        prefs.set(PreferenceFlag::ShowVolume, true);
        assert!(prefs.get(PreferenceFlag::ShowVolume));
        assert!(!prefs.get(PreferenceFlag::ShowMarketCap));

        prefs.set(PreferenceFlag::ShowVolume, false);
        assert_eq!(prefs, PreferenceSet::default());
    }

    #[test]
    fn test_missing_fields_default_to_false() {
        let prefs: PreferenceSet = serde_json::from_str(r#"{"dark_mode": true}"#).unwrap();
        assert!(prefs.dark_mode);
        assert!(!prefs.show_change);
    }
}
