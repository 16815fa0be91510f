//! Luhn checksum routines for decimal order numbers.
//!
//! `validate` checks a complete number (payload + check digit). `calculate` appends a fresh check
//! digit to a payload. Both reject anything that is not pure ASCII digits.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuhnError {
    #[error("number must contain only decimal digits")]
    NonDigit,
    #[error("number is empty")]
    Empty,
    #[error("checksum digit does not match")]
    ChecksumMismatch,
}

fn digits_of(number: &str) -> Result<Vec<u32>, LuhnError> {
    if number.is_empty() {
        return Err(LuhnError::Empty);
    }
    number.chars().map(|c| c.to_digit(10).ok_or(LuhnError::NonDigit)).collect()
}

/// Luhn sum of the given digits, where `shift` selects which positions (counted from the right)
/// get doubled. For a full number the check digit sits at the rightmost position, so every second
/// digit starting with the *second* from the right is doubled; for a bare payload it is every
/// second digit starting with the rightmost.
fn luhn_sum(digits: &[u32], shift: usize) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if (i + shift) % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

/// Validates a complete Luhn number, check digit included.
pub fn validate(number: &str) -> Result<(), LuhnError> {
    let digits = digits_of(number)?;
    if luhn_sum(&digits, 0) % 10 == 0 {
        Ok(())
    } else {
        Err(LuhnError::ChecksumMismatch)
    }
}

/// Computes the check digit for a payload (a number *without* its check digit).
pub fn check_digit(payload: &str) -> Result<u32, LuhnError> {
    let digits = digits_of(payload)?;
    let sum = luhn_sum(&digits, 1);
    Ok((10 - sum % 10) % 10)
}

/// Appends the Luhn check digit to the payload, returning the complete number.
pub fn calculate(payload: &str) -> Result<String, LuhnError> {
    let check = check_digit(payload)?;
    Ok(format!("{payload}{check}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validates_known_good_numbers() {
        for number in ["12345678903", "79927398713", "4561261212345467", "0"] {
            assert!(validate(number).is_ok(), "{number} should pass the Luhn check");
        }
    }

    #[test]
    fn rejects_known_bad_numbers() {
        assert_eq!(validate("12345678904"), Err(LuhnError::ChecksumMismatch));
        assert_eq!(validate("79927398710"), Err(LuhnError::ChecksumMismatch));
    }

    #[test]
    fn rejects_non_digit_input() {
        assert_eq!(validate("1234a678903"), Err(LuhnError::NonDigit));
        assert_eq!(validate(""), Err(LuhnError::Empty));
    }

    #[test]
    fn calculate_round_trips_through_validate() {
        for payload in ["1", "42", "1234567890", "18446744073709551615"] {
            let number = calculate(payload).unwrap();
            assert!(number.starts_with(payload));
            assert_eq!(number.len(), payload.len() + 1);
            validate(&number).unwrap();
        }
    }

    #[test]
    fn check_digit_matches_reference_values() {
        // 7992739871 is the textbook example with check digit 3
        assert_eq!(check_digit("7992739871").unwrap(), 3);
        assert_eq!(check_digit("1234567890").unwrap(), 3);
    }
}
