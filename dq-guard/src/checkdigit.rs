//! Check-digit arithmetic for Brazilian fiscal identifiers.
//!
//! Both CPF (individual taxpayer, 11 digits) and CNPJ (company, 14 digits)
//! end in two check digits computed with a weighted sum modulo 11:
//!
//! - weights are assigned from the rightmost digit of the input leftwards,
//!   starting at 2 and growing by one per position; CNPJ wraps back to 2
//!   after reaching 9, CPF never wraps;
//! - with `r = sum % 11`, the digit is `0` when `r < 2` and `11 - r` otherwise;
//! - the second digit is computed over the base plus the first check digit.
//!
//! Validation never fails with an error: malformed input is simply invalid.
//!
//! ```rust
//! use dq_guard::checkdigit::{Cnpj, Cpf, IdentifierFormat};
//!
//! assert!(Cnpj.is_valid("11.222.333/0001-81"));
//! assert!(!Cnpj.is_valid("11.222.333/0001-82"));
//! assert_eq!(Cpf.compute_check_digits("123456789"), Some((0, 9)));
//! ```

/// A fiscal identifier format protected by two modulo-11 check digits.
pub trait IdentifierFormat {
    /// Short lower-case name of the format.
    fn name(&self) -> &'static str;

    /// Number of digits before the check digits.
    fn base_len(&self) -> usize;

    /// Largest weight before the cycle wraps back to 2, if it wraps at all.
    fn weight_cycle(&self) -> Option<u32>;

    /// Total number of digits, check digits included.
    fn total_len(&self) -> usize {
        self.base_len() + 2
    }

    /// Computes the two check digits for `base_digits`.
    ///
    /// Returns `None` unless the input is exactly [`base_len`](Self::base_len)
    /// ASCII digits.
    fn compute_check_digits(&self, base_digits: &str) -> Option<(u8, u8)> {
        let digits = parse_digits(base_digits)?;
        if digits.len() != self.base_len() {
            return None;
        }
        Some(check_digits(&digits, self.weight_cycle()))
    }

    /// Validates a possibly formatted identifier.
    ///
    /// Formatting characters are stripped first; the remaining digits must
    /// have the expected length, must not all be the same digit and must end
    /// in the correct check digits.
    fn is_valid(&self, identifier: &str) -> bool {
        let digits: Vec<u8> = identifier
            .chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| d as u8)
            .collect();

        if digits.len() != self.total_len() || is_repeated_digit(&digits) {
            return false;
        }

        let (base, supplied) = digits.split_at(self.base_len());
        let (d1, d2) = check_digits(base, self.weight_cycle());
        supplied == [d1, d2]
    }

    /// Appends the computed check digits to `base_digits`.
    fn complete(&self, base_digits: &str) -> Option<String> {
        let (d1, d2) = self.compute_check_digits(base_digits)?;
        Some(format!("{base_digits}{d1}{d2}"))
    }
}

/// CPF: 9 base digits, weights 10..=2 then 11..=2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cpf;

/// CNPJ: 12 base digits, weights cycling 2..=9 from the right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cnpj;

impl IdentifierFormat for Cpf {
    fn name(&self) -> &'static str {
        "cpf"
    }

    fn base_len(&self) -> usize {
        9
    }

    fn weight_cycle(&self) -> Option<u32> {
        None
    }
}

impl IdentifierFormat for Cnpj {
    fn name(&self) -> &'static str {
        "cnpj"
    }

    fn base_len(&self) -> usize {
        12
    }

    fn weight_cycle(&self) -> Option<u32> {
        Some(9)
    }
}

/// Validates a CPF, formatted or not.
pub fn is_valid_cpf(identifier: &str) -> bool {
    Cpf.is_valid(identifier)
}

/// Validates a CNPJ, formatted or not.
pub fn is_valid_cnpj(identifier: &str) -> bool {
    Cnpj.is_valid(identifier)
}

fn parse_digits(input: &str) -> Option<Vec<u8>> {
    input
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

fn is_repeated_digit(digits: &[u8]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

fn check_digits(base: &[u8], cycle: Option<u32>) -> (u8, u8) {
    let d1 = mod11_digit(base, cycle);
    let mut extended = base.to_vec();
    extended.push(d1);
    let d2 = mod11_digit(&extended, cycle);
    (d1, d2)
}

fn mod11_digit(digits: &[u8], cycle: Option<u32>) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(position, &digit)| u32::from(digit) * weight(position as u32, cycle))
        .sum();

    match sum % 11 {
        r if r < 2 => 0,
        r => (11 - r) as u8,
    }
}

fn weight(position_from_right: u32, cycle: Option<u32>) -> u32 {
    match cycle {
        Some(max) => 2 + position_from_right % (max - 1),
        None => 2 + position_from_right,
    }
}
