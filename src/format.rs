use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};

/// How to display an amount of money for a particular locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub code: &'static str,
    pub symbol: &'static str,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub symbol_after: bool,
    pub minor_units: u32,
}

impl CurrencyFormat {
    pub const USD: CurrencyFormat = CurrencyFormat {
        code: "USD",
        symbol: "$",
        decimal_separator: '.',
        grouping_separator: ',',
        symbol_after: false,
        minor_units: 2,
    };

    pub const GBP: CurrencyFormat = CurrencyFormat {
        code: "GBP",
        symbol: "£",
        ..CurrencyFormat::USD
    };

    pub const AUD: CurrencyFormat = CurrencyFormat {
        code: "AUD",
        ..CurrencyFormat::USD
    };

    pub const JPY: CurrencyFormat = CurrencyFormat {
        code: "JPY",
        symbol: "¥",
        minor_units: 0,
        ..CurrencyFormat::USD
    };

    // German and French conventions differ only in how thousands are grouped
    pub const EUR_DE: CurrencyFormat = CurrencyFormat {
        code: "EUR",
        symbol: "€",
        decimal_separator: ',',
        grouping_separator: '.',
        symbol_after: true,
        minor_units: 2,
    };

    pub const EUR_FR: CurrencyFormat = CurrencyFormat {
        grouping_separator: '\u{202f}',
        ..CurrencyFormat::EUR_DE
    };

    /// Pick the format for a BCP 47 style locale tag such as `en-GB` or `de_DE`.
    ///
    /// Unknown locales fall back to US dollars.
    pub fn for_locale(tag: &str) -> CurrencyFormat {
        let normalised = tag.replace('_', "-").to_ascii_lowercase();

        match normalised.as_str() {
            "en-us" => CurrencyFormat::USD,
            "en-gb" => CurrencyFormat::GBP,
            "en-au" => CurrencyFormat::AUD,
            "de-de" => CurrencyFormat::EUR_DE,
            "fr-fr" => CurrencyFormat::EUR_FR,
            "ja-jp" => CurrencyFormat::JPY,
            _ => {
                debug!("no currency format for locale '{}', using USD", tag);
                CurrencyFormat::USD
            }
        }
    }

    pub fn format(&self, amount: Decimal) -> String {
        let rounded = amount
            .abs()
            .round_dp_with_strategy(self.minor_units, RoundingStrategy::MidpointAwayFromZero);
        let digits = format!("{:.*}", self.minor_units as usize, rounded);

        let (whole, fraction) = match digits.find('.') {
            Some(i) => (&digits[..i], Some(&digits[i + 1..])),
            None => (digits.as_str(), None),
        };

        let mut number = group_thousands(whole, self.grouping_separator);
        if let Some(fraction) = fraction {
            number.push(self.decimal_separator);
            number.push_str(fraction);
        }

        let sign = if amount.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        if self.symbol_after {
            format!("{}{}\u{a0}{}", sign, number, self.symbol)
        } else {
            format!("{}{}{}", sign, self.symbol, number)
        }
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat::USD
    }
}

fn group_thousands(whole: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);

    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_usd() {
        let usd = CurrencyFormat::default();
        assert_eq!(usd.format(dec!(4.5)), "$4.50");
        assert_eq!(usd.format(dec!(1499)), "$1,499.00");
        assert_eq!(usd.format(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(usd.format(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn format_rounds_half_away_from_zero() {
        let usd = CurrencyFormat::USD;
        assert_eq!(usd.format(dec!(0.125)), "$0.13");
        assert_eq!(usd.format(dec!(-0.125)), "-$0.13");
        assert_eq!(usd.format(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn format_symbol_after() {
        assert_eq!(
            CurrencyFormat::EUR_DE.format(dec!(1499)),
            "1.499,00\u{a0}€"
        );
        assert_eq!(
            CurrencyFormat::EUR_FR.format(dec!(1499)),
            "1\u{202f}499,00\u{a0}€"
        );
    }

    #[test]
    fn format_no_minor_units() {
        assert_eq!(CurrencyFormat::JPY.format(dec!(1499.5)), "¥1,500");
        assert_eq!(CurrencyFormat::JPY.format(dec!(999)), "¥999");
    }

    #[test]
    fn for_locale() {
        assert_eq!(CurrencyFormat::for_locale("en_GB"), CurrencyFormat::GBP);
        assert_eq!(CurrencyFormat::for_locale("DE-de"), CurrencyFormat::EUR_DE);
        assert_eq!(CurrencyFormat::for_locale("en-AU").code, "AUD");
        assert_eq!(CurrencyFormat::for_locale("xx-YY"), CurrencyFormat::USD);
    }

    #[test]
    fn group_thousands_boundaries() {
        assert_eq!(group_thousands("1", ','), "1");
        assert_eq!(group_thousands("100", ','), "100");
        assert_eq!(group_thousands("1000", ','), "1,000");
        assert_eq!(group_thousands("100000", ','), "100,000");
    }
}
