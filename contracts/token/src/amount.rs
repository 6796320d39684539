//! Decimal text amounts, as carried in parameters and stored values.

use crate::error::{TokenError, TokenResult};

pub type Amount = i64;

pub fn parse_integer(field: &str, value: &str) -> TokenResult<Amount> {
    value
        .parse::<Amount>()
        .map_err(|e| TokenError::conversion(field, format!("{value:?} must be an integer ({e})")))
}

/// Amounts that move value: strictly greater than zero.
pub fn parse_positive(field: &str, value: &str) -> TokenResult<Amount> {
    let amount = parse_integer(field, value)?;
    if amount <= 0 {
        return Err(TokenError::conversion(field, format!("{amount} must be positive")));
    }
    Ok(amount)
}

/// Absolute allowance values: zero revokes.
pub fn parse_non_negative(field: &str, value: &str) -> TokenResult<Amount> {
    let amount = parse_integer(field, value)?;
    if amount < 0 {
        return Err(TokenError::conversion(
            field,
            format!("{amount} cannot be negative"),
        ));
    }
    Ok(amount)
}

pub fn parse_supply(field: &str, value: &str) -> TokenResult<u64> {
    value.parse::<u64>().map_err(|_| {
        TokenError::conversion(field, format!("{value:?} must be a non-negative integer"))
    })
}

/// Decode a stored decimal value; `field` names the record in errors.
pub fn decode_stored(field: &str, bytes: &[u8]) -> TokenResult<Amount> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| TokenError::conversion(field, "stored value is not UTF-8"))?;
    text.parse::<Amount>()
        .map_err(|e| TokenError::conversion(field, format!("stored value {text:?} is not an integer ({e})")))
}

pub fn encode(amount: Amount) -> Vec<u8> {
    amount.to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("amount", "40").unwrap(), 40);
        assert!(parse_positive("amount", "0").is_err());
        assert!(parse_positive("amount", "-5").is_err());
        assert!(parse_positive("amount", "4.5").is_err());
        assert!(parse_positive("amount", "").is_err());
    }

    #[test]
    fn test_parse_non_negative_accepts_zero() {
        assert_eq!(parse_non_negative("amount", "0").unwrap(), 0);
        assert!(parse_non_negative("amount", "-1").is_err());
    }

    #[test]
    fn test_conversion_error_names_field() {
        let err = parse_positive("transferAmount", "abc").unwrap_err();
        match err {
            TokenError::Conversion { field, .. } => assert_eq!(field, "transferAmount"),
            other => panic!("Expected Conversion error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_supply_rejects_negative() {
        assert_eq!(parse_supply("totalSupply", "100000").unwrap(), 100_000);
        assert!(parse_supply("totalSupply", "-1").is_err());
    }

    #[test]
    fn test_decode_stored() {
        assert_eq!(decode_stored("alice", b"60").unwrap(), 60);
        assert!(decode_stored("alice", b"{\"name\":\"x\"}").is_err());
        assert!(decode_stored("alice", &[0xff, 0xfe]).is_err());
    }
}
