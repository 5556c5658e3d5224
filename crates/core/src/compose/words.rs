use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] =
    ["", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety"];

/// Spells an amount in rupees and paise using crore/lakh/thousand grouping,
/// e.g. `Rupees One Lakh Twenty Thousand and Paise Fifty Only`.
pub fn amount_in_words(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let absolute = rounded.abs();
    let rupees = whole(absolute);
    let paise = whole((absolute - absolute.trunc()) * Decimal::ONE_HUNDRED);

    let mut words = String::new();
    if negative {
        words.push_str("Minus ");
    }
    words.push_str("Rupees ");
    words.push_str(&spell(rupees));
    if paise > 0 {
        words.push_str(" and Paise ");
        words.push_str(&spell(paise));
    }
    words.push_str(" Only");
    words
}

/// Integral part of a non-negative value. Any `Decimal` fits in a `u128`.
fn whole(value: Decimal) -> u128 {
    let mut integral = value.trunc();
    integral.rescale(0);
    integral.mantissa().unsigned_abs()
}

fn spell(number: u128) -> String {
    if number == 0 {
        return ONES[0].to_string();
    }

    let mut parts = Vec::new();
    let crore = number / 10_000_000;
    let mut rest = number % 10_000_000;
    if crore > 0 {
        parts.push(format!("{} Crore", spell(crore)));
    }
    for (divisor, label) in [(100_000, "Lakh"), (1_000, "Thousand"), (100, "Hundred")] {
        let count = rest / divisor;
        rest %= divisor;
        if count > 0 {
            parts.push(format!("{} {label}", below_hundred(count)));
        }
    }
    if rest > 0 {
        parts.push(below_hundred(rest));
    }
    parts.join(" ")
}

fn below_hundred(number: u128) -> String {
    let index = number as usize;
    if index < 20 {
        return ONES[index].to_string();
    }
    let tens = TENS[index / 10];
    match index % 10 {
        0 => tens.to_string(),
        unit => format!("{tens} {}", ONES[unit]),
    }
}
