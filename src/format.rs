// ============================================================================
// Formatage des valeurs numériques
// ============================================================================
// Fonctions pures qui transforment les valeurs brutes de l'API en chaînes
// affichables (prix, capitalisation, volume, variation)
//
// CONCEPTS RUST :
// 1. Fonctions pures : pas d'état, pas d'effet de bord, faciles à tester
// 2. Option<f64> en entrée : l'absence de valeur est gérée ici, une seule fois
// 3. format! avec précision : {:.2}, {:.4}, {:.6}
// ============================================================================

/// Texte affiché quand une valeur est absente
pub const NOT_AVAILABLE: &str = "N/A";

/// Formate un prix selon son ordre de grandeur
///
/// | Valeur            | Format                      |
/// |-------------------|-----------------------------|
/// | < 0.01            | 6 décimales                 |
/// | 0.01 ..< 1        | 4 décimales                 |
/// | 1 ..< 10 000      | 2 décimales                 |
/// | >= 10 000         | 2 décimales + séparateurs   |
///
/// # Exemple
/// assert_eq!(format_price(Some(25000.0)), "25,000.00");
pub fn format_price(value: Option<f64>) -> String {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return NOT_AVAILABLE.to_string(),
    };

    // Le palier est choisi sur la valeur arrondie : 0.99999 s'affiche "1.00",
    // pas "1.0000", et 9999.996 prend les séparateurs
    let rounded = format!("{:.*}", price_decimals(value), value)
        .parse::<f64>()
        .unwrap_or(value);
    let text = format!("{:.*}", price_decimals(rounded), value);

    if rounded < 10_000.0 {
        text
    } else {
        group_thousands(&text)
    }
}

/// Nombre de décimales du palier de prix
fn price_decimals(value: f64) -> usize {
    if value < 0.01 {
        6
    } else if value < 1.0 {
        4
    } else {
        2
    }
}

/// Formate une grandeur (capitalisation, volume) avec suffixe B/M/K
///
/// # Exemple
/// assert_eq!(format_magnitude(Some(1_500_000_000.0)), "1.50B");
pub fn format_magnitude(value: Option<f64>) -> String {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return NOT_AVAILABLE.to_string(),
    };

    if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

/// Formate une variation en pourcentage avec une flèche
///
/// Format : "▲ +2.11%" ou "▼ -0.50%"
pub fn format_change(value: Option<f64>) -> String {
    match value {
        Some(change) if change.is_finite() => {
            let arrow = if change >= 0.0 { "▲" } else { "▼" };
            format!("{} {:+.2}%", arrow, change)
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Insère des virgules tous les 3 chiffres dans la partie entière
///
/// CONCEPT RUST : Itération sur les caractères
/// - split_once() sépare partie entière et décimales
/// - On parcourt les chiffres et on insère ',' selon la position
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };

    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let digits = integer.len();
    let mut grouped = String::with_capacity(digits + digits / 3 + 4);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
