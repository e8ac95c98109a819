use serde::Serialize;

use super::{Currency, Locale};
use crate::core::Comparison;

const COMPACT_UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub max_fraction_digits: usize,
    pub compact: bool,
}

impl FormatOptions {
    pub fn compact() -> Self {
        Self {
            max_fraction_digits: 0,
            compact: true,
        }
    }
}

/// Converts through sterling and rounds to whole units.
pub fn convert_currency(amount: f64, from: Currency, to: Currency) -> f64 {
    let in_gbp = amount / from.rate_from_gbp();
    (in_gbp * to.rate_from_gbp()).round()
}

pub fn convert_from_gbp(amount: f64, locale: Locale) -> f64 {
    convert_currency(amount, Currency::Gbp, locale.currency())
}

/// `£153,600`, `-£11,803`, or `£154K` in compact form.
pub fn format_currency(amount: f64, locale: Locale, options: FormatOptions) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let magnitude = amount.abs();
    let symbol = locale.currency_symbol();

    if options.compact && magnitude >= 1_000.0 {
        let (scaled, suffix) = compact_parts(magnitude, options.max_fraction_digits);
        return format!("{sign}{symbol}{scaled}{suffix}");
    }

    let digits = options.max_fraction_digits;
    let rounded = round_to(magnitude, digits);
    let sign = if rounded == 0.0 { "" } else { sign };
    format!("{sign}{symbol}{}", group_digits(rounded, digits))
}

pub fn format_salary(amount: f64, locale: Locale, from_gbp: bool) -> String {
    let value = if from_gbp {
        convert_from_gbp(amount, locale)
    } else {
        amount
    };
    format_currency(value, locale, FormatOptions::default())
}

/// `£900-£1,500/day`.
pub fn format_day_rate_range(
    min_rate: f64,
    max_rate: f64,
    locale: Locale,
    from_gbp: bool,
) -> String {
    let (min, max) = if from_gbp {
        (convert_from_gbp(min_rate, locale), convert_from_gbp(max_rate, locale))
    } else {
        (min_rate, max_rate)
    };
    let symbol = locale.currency_symbol();
    format!(
        "{symbol}{}-{symbol}{}/day",
        plain_number(min),
        plain_number(max)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedComparison {
    pub locale: Locale,
    pub gross_annual: String,
    pub inside_take_home: String,
    pub outside_take_home: String,
    pub difference: String,
    pub percentage_saved: String,
}

/// Display strings for a sterling comparison in `locale`'s currency.
pub fn format_comparison(comparison: &Comparison, locale: Locale) -> FormattedComparison {
    let money = |gbp: f64| {
        format_currency(
            convert_from_gbp(gbp, locale),
            locale,
            FormatOptions::default(),
        )
    };

    FormattedComparison {
        locale,
        gross_annual: money(comparison.gross_annual),
        inside_take_home: money(comparison.inside.take_home),
        outside_take_home: money(comparison.outside.take_home),
        difference: money(comparison.difference),
        percentage_saved: match comparison.percentage_saved {
            Some(pct) => format!("{pct:.1}%"),
            None => "n/a".to_string(),
        },
    }
}

fn compact_parts(magnitude: f64, digits: usize) -> (String, &'static str) {
    let mut unit_index = COMPACT_UNITS
        .iter()
        .position(|(unit, _)| magnitude >= *unit)
        .unwrap_or(COMPACT_UNITS.len() - 1);

    let mut scaled = round_to(magnitude / COMPACT_UNITS[unit_index].0, digits);
    // 999,999 rounds to 1000K; promote to the next unit.
    if scaled >= 1_000.0 && unit_index > 0 {
        unit_index -= 1;
        scaled = round_to(magnitude / COMPACT_UNITS[unit_index].0, digits);
    }

    let text = format!("{scaled:.digits$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    (text, COMPACT_UNITS[unit_index].1)
}

fn round_to(value: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

fn group_digits(value: f64, digits: usize) -> String {
    let text = format!("{value:.digits$}");
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}

/// Grouped number with up to three fraction digits, trailing zeros dropped.
fn plain_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let grouped = group_digits(round_to(value.abs(), 3), 3);
    let trimmed = grouped.trim_end_matches('0').trim_end_matches('.');
    format!("{sign}{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngagementInputs, TaxYearConfig, compute_tax_comparison};

    #[test]
    fn convert_currency_goes_through_sterling_and_rounds() {
        assert_eq!(convert_currency(1_000.0, Currency::Gbp, Currency::Usd), 1_270.0);
        assert_eq!(convert_currency(1_270.0, Currency::Usd, Currency::Gbp), 1_000.0);
        assert_eq!(convert_currency(100.0, Currency::Aud, Currency::Nzd), 108.0);
        assert_eq!(convert_from_gbp(900.0, Locale::Uk), 900.0);
        assert_eq!(convert_from_gbp(900.0, Locale::Nz), 1_872.0);
    }

    #[test]
    fn format_currency_groups_thousands_without_decimals() {
        let options = FormatOptions::default();
        assert_eq!(format_currency(153_600.0, Locale::Uk, options), "£153,600");
        assert_eq!(format_currency(999.5, Locale::Uk, options), "£1,000");
        assert_eq!(format_currency(42.0, Locale::Us, options), "$42");
        assert_eq!(format_currency(1_234_567.0, Locale::Au, options), "A$1,234,567");
        assert_eq!(format_currency(0.0, Locale::Nz, options), "NZ$0");
    }

    #[test]
    fn format_currency_handles_negative_and_fraction_digits() {
        let two_dp = FormatOptions {
            max_fraction_digits: 2,
            compact: false,
        };
        assert_eq!(format_currency(-11_803.12, Locale::Uk, FormatOptions::default()), "-£11,803");
        assert_eq!(format_currency(1_234.5, Locale::Uk, two_dp), "£1,234.50");
        assert_eq!(format_currency(-0.2, Locale::Uk, FormatOptions::default()), "£0");
    }

    #[test]
    fn compact_format_uses_suffixes() {
        let compact = FormatOptions::compact();
        assert_eq!(format_currency(153_600.0, Locale::Uk, compact), "£154K");
        assert_eq!(format_currency(2_400_000.0, Locale::Us, compact), "$2M");
        assert_eq!(format_currency(999_999.0, Locale::Uk, compact), "£1M");
        assert_eq!(format_currency(950.0, Locale::Uk, compact), "£950");

        let one_dp = FormatOptions {
            max_fraction_digits: 1,
            compact: true,
        };
        assert_eq!(format_currency(1_500_000.0, Locale::Uk, one_dp), "£1.5M");
        assert_eq!(format_currency(2_000_000.0, Locale::Uk, one_dp), "£2M");
    }

    #[test]
    fn day_rate_range_converts_when_asked() {
        assert_eq!(
            format_day_rate_range(900.0, 1_500.0, Locale::Uk, false),
            "£900-£1,500/day"
        );
        assert_eq!(
            format_day_rate_range(900.0, 1_500.0, Locale::Us, true),
            "$1,143-$1,905/day"
        );
    }

    #[test]
    fn salary_format_converts_from_sterling() {
        assert_eq!(format_salary(100_000.0, Locale::Us, true), "$127,000");
        assert_eq!(format_salary(100_000.0, Locale::Us, false), "$100,000");
    }

    #[test]
    fn formatted_comparison_marks_undefined_percentage() {
        let config = TaxYearConfig::uk_2024_25();
        let degenerate = compute_tax_comparison(&EngagementInputs::new(10.0, 1.0, 48.0), &config)
            .expect("valid");
        let formatted = format_comparison(&degenerate, Locale::Uk);
        assert_eq!(formatted.percentage_saved, "n/a");

        let normal = compute_tax_comparison(&EngagementInputs::new(800.0, 4.0, 48.0), &config)
            .expect("valid");
        let formatted = format_comparison(&normal, Locale::Uk);
        assert_eq!(formatted.gross_annual, "£153,600");
        assert_eq!(formatted.inside_take_home, "£98,036");
        assert_eq!(formatted.outside_take_home, "£86,233");
        assert_eq!(formatted.difference, "-£11,803");
        assert_eq!(formatted.percentage_saved, "-12.0%");
    }
}
