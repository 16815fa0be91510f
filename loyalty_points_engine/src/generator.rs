//! Fresh order number generation.
//!
//! Numbers are an incrementing counter rendered as decimal with a Luhn check digit appended. The
//! counter can be seeded from the last stored order number so the sequence continues across
//! restarts. In practice order numbers come from clients, so the generator mostly idles.
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use lpg_common::luhn;
use thiserror::Error;

use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("generator limit reached, values started from the very beginning")]
    LimitReached,
    #[error("seed must be a valid numeric luhn sequence: {0}")]
    InvalidSeed(String),
}

#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    counter: AtomicU64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the counter from a previously issued order number.
    pub fn with_seed(seed: &str) -> Result<Self, GeneratorError> {
        let generator = Self::new();
        generator.set_seed(seed)?;
        Ok(generator)
    }

    /// The seed must be a valid Luhn number; its check digit is stripped and the remainder becomes
    /// the counter value. Seed "0" is what an empty orders table produces on the very first start
    /// and skips validation.
    pub fn set_seed(&self, seed: &str) -> Result<(), GeneratorError> {
        if seed != "0" {
            luhn::validate(seed).map_err(|e| GeneratorError::InvalidSeed(e.to_string()))?;
        }
        let payload = if seed.len() > 1 { &seed[..seed.len() - 1] } else { seed };
        let value = payload.parse::<u64>().map_err(|e| GeneratorError::InvalidSeed(e.to_string()))?;
        self.counter.store(value, Ordering::SeqCst);
        Ok(())
    }

    /// Next order number in the sequence. Counter wrap-around is reported as
    /// [`GeneratorError::LimitReached`]; the sequence then restarts from the beginning.
    pub fn next(&self) -> Result<OrderNumber, GeneratorError> {
        let count = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        if count == 0 {
            return Err(GeneratorError::LimitReached);
        }
        let number = luhn::calculate(&count.to_string()).expect("a decimal counter always has a check digit");
        Ok(OrderNumber(number))
    }

    /// Like [`next`](Self::next), but exhaustion is downgraded to a warning and the value "0".
    /// Callers that must always produce a number use this form.
    pub fn next_or_zero(&self) -> OrderNumber {
        match self.next() {
            Ok(number) => number,
            Err(e) => {
                warn!("🔢️ Order number generator error: {e}");
                OrderNumber::from("0")
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_generator_counts_from_one() {
        let generator = OrderNumberGenerator::new();
        assert_eq!(generator.next().unwrap(), OrderNumber::from("18"));
        assert_eq!(generator.next().unwrap(), OrderNumber::from("26"));
    }

    #[test]
    fn generated_numbers_validate() {
        let generator = OrderNumberGenerator::new();
        for _ in 0..100 {
            let number = generator.next().unwrap();
            number.validate().unwrap();
        }
    }

    #[test]
    fn seed_continues_the_sequence() {
        // seed 12345678903 = payload 1234567890 + check digit 3
        let generator = OrderNumberGenerator::with_seed("12345678903").unwrap();
        let next = generator.next().unwrap();
        assert!(next.as_str().starts_with("1234567891"));
        next.validate().unwrap();
    }

    #[test]
    fn zero_seed_is_accepted_without_validation() {
        let generator = OrderNumberGenerator::with_seed("0").unwrap();
        assert_eq!(generator.next().unwrap(), OrderNumber::from("18"));
    }

    #[test]
    fn invalid_seeds_are_rejected()  {
        assert!(OrderNumberGenerator::with_seed("12345678904").is_err());
        assert!(OrderNumberGenerator::with_seed("not-a-number").is_err());
    }

    #[test]
    fn wrap_around_reports_limit_reached() {
        let generator = OrderNumberGenerator::new();
        generator.counter.store(u64::MAX, Ordering::SeqCst);
        assert!(matches!(generator.next(), Err(GeneratorError::LimitReached)));
        // the counter has wrapped; the sequence starts over
        assert_eq!(generator.next().unwrap(), OrderNumber::from("18"));
    }

    #[test]
    fn next_or_zero_downgrades_exhaustion_to_zero() {
        let generator = OrderNumberGenerator::new();
        assert_eq!(generator.next_or_zero(), OrderNumber::from("18"));

        generator.counter.store(u64::MAX, Ordering::SeqCst);
        assert_eq!(generator.next_or_zero(), OrderNumber::from("0"));
        assert_eq!(generator.next_or_zero(), OrderNumber::from("18"));
    }
}
