//! Street address splitting.
//!
//! Purely positional: `"NUMBER NAME... TYPE"`, anything after the first comma
//! (city, state, zip) is dropped. There is no unit/apartment handling and no
//! street-type dictionary, so `"12 Elm"` yields an empty type.

use crate::model::AddressComponents;

pub fn parse(address: &str) -> AddressComponents {
    let street = address.split(',').next().unwrap_or("").trim();
    let tokens: Vec<&str> = street.split_whitespace().collect();

    match tokens.as_slice() {
        [] => AddressComponents::default(),
        [number] => AddressComponents {
            street_number: number.to_string(),
            ..AddressComponents::default()
        },
        [number, name] => AddressComponents {
            street_number: number.to_string(),
            street_name: name.to_string(),
            street_type: String::new(),
        },
        [number, middle @ .., kind] => AddressComponents {
            street_number: number.to_string(),
            street_name: middle.join(" "),
            street_type: kind.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(a: &AddressComponents) -> (&str, &str, &str) {
        (&a.street_number, &a.street_name, &a.street_type)
    }

    #[test]
    fn empty_address() {
        let a = parse("");
        assert!(a.is_empty());
        assert!(parse("   ").is_empty());
        assert!(parse(", Mount Vernon").is_empty());
    }

    #[test]
    fn three_tokens() {
        assert_eq!(parts(&parse("123 Main St")), ("123", "Main", "St"));
    }

    #[test]
    fn multi_word_name() {
        assert_eq!(parts(&parse("123 North Park Ave")), ("123", "North Park", "Ave"));
    }

    #[test]
    fn two_tokens_has_no_type() {
        assert_eq!(parts(&parse("55 Elm")), ("55", "Elm", ""));
    }

    #[test]
    fn single_token() {
        assert_eq!(parts(&parse("55")), ("55", "", ""));
    }

    #[test]
    fn drops_city_after_comma() {
        let a = parse("  7 Fairway   Dr , Mount Vernon, OH 43050");
        assert_eq!(parts(&a), ("7", "Fairway", "Dr"));
        assert!(a.is_complete());
    }

    #[test]
    fn recompose_uppercase() {
        let a = parse("12 oak st").to_uppercase();
        assert_eq!(a.recompose(), "12 OAK ST");
    }
}
