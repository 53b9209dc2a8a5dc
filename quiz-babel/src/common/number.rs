//! Decimal rendering for numbers written into quiz documents
//!
//! Values are printed in their shortest round-trip form with a fixed layout:
//! integral values keep a trailing `.0`, very small and very large values use
//! an exponent with a signed two-digit minimum (`1e-05`, `2.5e+16`).

const SCIENTIFIC_BELOW: f64 = 1e-4;
const SCIENTIFIC_FROM: f64 = 1e16;

/// Render a float the way it is written in both quiz encodings.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let magnitude = x.abs();
    if (SCIENTIFIC_BELOW..SCIENTIFIC_FROM).contains(&magnitude) {
        let plain = format!("{x}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sci = format!("{x:e}");
        match sci.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => sci,
        }
    }
}

/// Render a value that is conceptually an integer count (no `.0`).
pub fn format_integral(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < SCIENTIFIC_FROM {
        format!("{}", x as i64)
    } else {
        format_number(x)
    }
}

/// Parse a decimal literal, accepting surrounding whitespace.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_keep_a_decimal_point() {
        assert_eq!(format_number(1.0), "1.0");
        assert_eq!(format_number(-200.0), "-200.0");
        assert_eq!(format_number(0.0), "0.0");
    }

    #[test]
    fn fractions_use_shortest_form() {
        assert_eq!(format_number(0.0125), "0.0125");
        assert_eq!(format_number(33.33333), "33.33333");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn extremes_use_exponents() {
        assert_eq!(format_number(1e-5), "1e-05");
        assert_eq!(format_number(2.5e-7), "2.5e-07");
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(1.5e300), "1.5e+300");
    }

    #[test]
    fn integral_counts() {
        assert_eq!(format_integral(3.0), "3");
        assert_eq!(format_integral(2.5), "2.5");
    }

    #[test]
    fn parses_with_whitespace() {
        assert_eq!(parse_number(" 4.5 "), Some(4.5));
        assert_eq!(parse_number("x"), None);
    }
}
