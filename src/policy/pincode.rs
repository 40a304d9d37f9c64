use std::sync::LazyLock;

use regex::Regex;

static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{6}\b").expect("valid pincode regex"));

/// First standalone run of exactly six decimal digits in an address, if any.
/// Absence is a normal outcome: many addresses simply carry no postal code.
pub fn extract_pincode(address: &str) -> Option<&str> {
    PINCODE_RE.find(address).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::extract_pincode;

    #[test]
    fn finds_pincode_inside_address() {
        let address = "12 MG Road, Shivajinagar, Bengaluru 560001, Karnataka";
        assert_eq!(extract_pincode(address), Some("560001"));
    }

    #[test]
    fn absent_when_no_digits() {
        assert_eq!(extract_pincode("no digits here"), None);
    }

    #[test]
    fn ignores_longer_digit_runs() {
        assert_eq!(extract_pincode("phone 9876543210"), None);
        assert_eq!(extract_pincode("flat 12345"), None);
    }

    #[test]
    fn takes_first_of_multiple_matches() {
        assert_eq!(
            extract_pincode("old pin 110042, new pin 110085"),
            Some("110042")
        );
    }
}
