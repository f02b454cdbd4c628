//! Account number minting

use crate::core::traits::AccountNumberGenerator;
use crate::types::{AccountNumber, LedgerError};
use rand::Rng;

/// Mints fixed-length random numeric account numbers
///
/// Uniqueness is not guaranteed here; the store rejects duplicates and the
/// account service retries with a fresh number.
#[derive(Debug, Clone)]
pub struct RandomAccountNumberGenerator {
    length: usize,
}

impl RandomAccountNumberGenerator {
    pub fn new(length: usize) -> Self {
        RandomAccountNumberGenerator { length }
    }
}

impl AccountNumberGenerator for RandomAccountNumberGenerator {
    fn generate(&self) -> Result<AccountNumber, LedgerError> {
        if self.length == 0 {
            return Err(LedgerError::storage("account number length must be positive"));
        }

        let mut rng = rand::thread_rng();
        let digits: String = (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        Ok(AccountNumber::new(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(10)]
    #[case(16)]
    fn test_generates_numeric_string_of_length(#[case] length: usize) {
        let number = RandomAccountNumberGenerator::new(length).generate().unwrap();

        assert_eq!(number.as_str().len(), length);
        assert!(number.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(RandomAccountNumberGenerator::new(0).generate().is_err());
    }
}
