//! Brazilian registration numbers (CNPJ for companies, CPF for people).
//!
//! Both are stored as bare digits; punctuation is accepted on input and
//! re-applied by `Display`.

use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, ValueObject};

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Company registration number (14 digits, two check digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

/// Individual taxpayer number (11 digits, two check digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl ValueObject for Cnpj {}
impl ValueObject for Cpf {}

fn digits_of(input: &str) -> DomainResult<Vec<u32>> {
    let mut out = Vec::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '0'..='9' => out.push(c as u32 - '0' as u32),
            '.' | '-' | '/' | ' ' => {}
            other => {
                return Err(DomainError::validation(format!(
                    "unexpected character '{other}' in document number"
                )));
            }
        }
    }
    Ok(out)
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn to_string(digits: &[u32]) -> String {
    digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

impl Cnpj {
    pub fn parse(input: &str) -> DomainResult<Self> {
        let digits = digits_of(input)?;
        if digits.len() != 14 {
            return Err(DomainError::validation("CNPJ must have 14 digits"));
        }
        if all_same(&digits) {
            return Err(DomainError::validation("CNPJ cannot repeat a single digit"));
        }
        let first = check_digit(&digits[..12], &CNPJ_WEIGHTS[1..]);
        let second = check_digit(&digits[..13], &CNPJ_WEIGHTS);
        if digits[12] != first || digits[13] != second {
            return Err(DomainError::validation("CNPJ check digits do not match"));
        }
        Ok(Self(to_string(&digits)))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl Cpf {
    pub fn parse(input: &str) -> DomainResult<Self> {
        let digits = digits_of(input)?;
        if digits.len() != 11 {
            return Err(DomainError::validation("CPF must have 11 digits"));
        }
        if all_same(&digits) {
            return Err(DomainError::validation("CPF cannot repeat a single digit"));
        }
        let weights: Vec<u32> = (2..=11).rev().collect();
        let first = check_digit(&digits[..9], &weights[1..]);
        let second = check_digit(&digits[..10], &weights);
        if digits[9] != first || digits[10] != second {
            return Err(DomainError::validation("CPF check digits do not match"));
        }
        Ok(Self(to_string(&digits)))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Cnpj {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let d = &self.0;
        write!(
            f,
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }
}

impl core::fmt::Display for Cpf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let d = &self.0;
        write!(f, "{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }
}

impl TryFrom<String> for Cnpj {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cnpj> for String {
    fn from(value: Cnpj) -> Self {
        value.0
    }
}

impl TryFrom<String> for Cpf {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(value: Cpf) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_accepts_masked_and_bare_input() {
        let masked = Cnpj::parse("11.222.333/0001-81").unwrap();
        let bare = Cnpj::parse("11222333000181").unwrap();
        assert_eq!(masked, bare);
        assert_eq!(masked.digits(), "11222333000181");
        assert_eq!(masked.to_string(), "11.222.333/0001-81");
    }

    #[test]
    fn cnpj_rejects_wrong_check_digits() {
        let err = Cnpj::parse("11.222.333/0001-82").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("check digits")));
    }

    #[test]
    fn cnpj_rejects_repeated_digits_and_bad_length() {
        assert!(Cnpj::parse("00000000000000").is_err());
        assert!(Cnpj::parse("1122233300018").is_err());
        assert!(Cnpj::parse("11a22233300018").is_err());
    }

    #[test]
    fn cpf_validates_check_digits() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(cpf.digits(), "52998224725");
        assert_eq!(cpf.to_string(), "529.982.247-25");

        assert!(Cpf::parse("529.982.247-26").is_err());
        assert!(Cpf::parse("111.111.111-11").is_err());
    }

    #[test]
    fn documents_deserialize_through_validation() {
        let cpf: Cpf = serde_json::from_str("\"529.982.247-25\"").unwrap();
        assert_eq!(serde_json::to_string(&cpf).unwrap(), "\"52998224725\"");
        assert!(serde_json::from_str::<Cnpj>("\"123\"").is_err());
    }
}
