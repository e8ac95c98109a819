use serde::Serialize;

use super::Locale;

/// Market rates for a fractional role, in the locale's own currency.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefaults {
    pub label: &'static str,
    pub avg_day_rate: f64,
    pub avg_salary: f64,
    pub min_day_rate: f64,
    pub max_day_rate: f64,
}

pub const ROLE_KEYS: [&str; 9] = [
    "cmo", "cfo", "cto", "coo", "ciso", "chro", "cpo", "ceo", "cco",
];

const fn role(label: &'static str, avg: f64, salary: f64, min: f64, max: f64) -> RoleDefaults {
    RoleDefaults {
        label,
        avg_day_rate: avg,
        avg_salary: salary,
        min_day_rate: min,
        max_day_rate: max,
    }
}

// Same order as ROLE_KEYS.
const UK_ROLES: [RoleDefaults; 9] = [
    role("CMO", 900.0, 130_000.0, 600.0, 1_500.0),
    role("CFO", 1_000.0, 145_000.0, 750.0, 1_500.0),
    role("CTO", 1_050.0, 155_000.0, 850.0, 1_600.0),
    role("COO", 950.0, 140_000.0, 750.0, 1_400.0),
    role("CISO", 1_350.0, 165_000.0, 1_000.0, 2_000.0),
    role("CHRO", 900.0, 130_000.0, 650.0, 1_400.0),
    role("CPO", 950.0, 145_000.0, 800.0, 1_400.0),
    role("CEO", 1_200.0, 180_000.0, 900.0, 1_800.0),
    role("CCO", 900.0, 140_000.0, 700.0, 1_300.0),
];

const US_ROLES: [RoleDefaults; 9] = [
    role("CMO", 1_400.0, 200_000.0, 1_000.0, 2_000.0),
    role("CFO", 1_500.0, 220_000.0, 1_100.0, 2_200.0),
    role("CTO", 1_600.0, 240_000.0, 1_200.0, 2_400.0),
    role("COO", 1_400.0, 210_000.0, 1_000.0, 2_000.0),
    role("CISO", 1_650.0, 230_000.0, 1_250.0, 2_300.0),
    role("CHRO", 1_200.0, 185_000.0, 900.0, 1_700.0),
    role("CPO", 1_450.0, 215_000.0, 1_100.0, 2_000.0),
    role("CEO", 1_800.0, 280_000.0, 1_300.0, 2_800.0),
    role("CCO", 1_400.0, 200_000.0, 1_100.0, 1_800.0),
];

const AU_ROLES: [RoleDefaults; 9] = [
    role("CMO", 1_600.0, 220_000.0, 1_200.0, 2_400.0),
    role("CFO", 1_800.0, 250_000.0, 1_400.0, 2_600.0),
    role("CTO", 1_900.0, 270_000.0, 1_500.0, 2_800.0),
    role("COO", 1_600.0, 240_000.0, 1_300.0, 2_400.0),
    role("CISO", 2_000.0, 260_000.0, 1_600.0, 2_800.0),
    role("CHRO", 1_400.0, 210_000.0, 1_100.0, 2_000.0),
    role("CPO", 1_700.0, 250_000.0, 1_400.0, 2_400.0),
    role("CEO", 2_100.0, 310_000.0, 1_600.0, 3_200.0),
    role("CCO", 1_700.0, 240_000.0, 1_400.0, 2_100.0),
];

const NZ_ROLES: [RoleDefaults; 9] = [
    role("CMO", 1_500.0, 200_000.0, 1_100.0, 2_200.0),
    role("CFO", 1_700.0, 230_000.0, 1_300.0, 2_400.0),
    role("CTO", 1_800.0, 250_000.0, 1_400.0, 2_600.0),
    role("COO", 1_500.0, 220_000.0, 1_200.0, 2_200.0),
    role("CISO", 1_850.0, 240_000.0, 1_500.0, 2_600.0),
    role("CHRO", 1_300.0, 190_000.0, 1_000.0, 1_800.0),
    role("CPO", 1_600.0, 230_000.0, 1_300.0, 2_200.0),
    role("CEO", 1_950.0, 290_000.0, 1_500.0, 3_000.0),
    role("CCO", 1_600.0, 220_000.0, 1_300.0, 1_950.0),
];

fn table(locale: Locale) -> &'static [RoleDefaults; 9] {
    match locale {
        Locale::Uk => &UK_ROLES,
        Locale::Us => &US_ROLES,
        Locale::Au => &AU_ROLES,
        Locale::Nz => &NZ_ROLES,
    }
}

/// Defaults for `role` (case-insensitive); unknown roles fall back to CFO.
pub fn role_defaults(locale: Locale, role: &str) -> RoleDefaults {
    let key = role.trim().to_ascii_lowercase();
    let index = ROLE_KEYS.iter().position(|k| *k == key).unwrap_or(1);
    table(locale)[index]
}

pub fn roles_for_locale(locale: Locale) -> Vec<(&'static str, RoleDefaults)> {
    ROLE_KEYS
        .iter()
        .copied()
        .zip(table(locale).iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_lookup_is_case_insensitive() {
        let cto = role_defaults(Locale::Uk, "CTO");
        assert_eq!(cto.label, "CTO");
        assert_eq!(cto.avg_day_rate, 1_050.0);
    }

    #[test]
    fn unknown_role_falls_back_to_cfo() {
        let fallback = role_defaults(Locale::Us, "chief vibes officer");
        assert_eq!(fallback.label, "CFO");
        assert_eq!(fallback.avg_day_rate, 1_500.0);
    }

    #[test]
    fn every_table_is_ordered_like_role_keys() {
        for locale in Locale::ALL {
            for (key, defaults) in roles_for_locale(locale) {
                assert_eq!(defaults.label.to_ascii_lowercase(), key);
                assert!(defaults.min_day_rate <= defaults.avg_day_rate);
                assert!(defaults.avg_day_rate <= defaults.max_day_rate);
            }
        }
    }
}
