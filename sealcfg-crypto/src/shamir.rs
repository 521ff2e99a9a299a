//! Shamir secret sharing over GF(256).
//!
//! Each byte of the secret is the constant term of an independent random
//! polynomial of degree `threshold - 1`. Share `i` (1-based) is the
//! evaluation at `x = i`; any `threshold` shares recover the secret by
//! Lagrange interpolation at zero.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use zeroize::Zeroizing;

/// One share of a split secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    /// Evaluation point, never zero.
    pub x: u8,
    /// Evaluations, one per secret byte.
    pub y: Vec<u8>,
}

impl Share {
    /// Encodes as `y || x`.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.y.len() + 1));
        out.extend_from_slice(&self.y);
        out.push(self.x);
        out
    }

    /// Decodes the `y || x` form.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        match bytes.split_last() {
            Some((&x, y)) if x != 0 && !y.is_empty() => Ok(Self { x, y: y.to_vec() }),
            _ => Err(CryptoError::Sharing("malformed share".into())),
        }
    }
}

/// Splits `secret` into `shares` shares, any `threshold` of which recover it.
pub fn split(secret: &[u8], threshold: usize, shares: usize) -> CryptoResult<Vec<Share>> {
    if threshold == 0 || threshold > shares || shares > 255 {
        return Err(CryptoError::Sharing(format!(
            "invalid threshold {threshold} of {shares} shares"
        )));
    }
    if secret.is_empty() {
        return Err(CryptoError::Sharing("empty secret".into()));
    }

    let mut rng = rand::rngs::OsRng;
    let mut coefficients = Zeroizing::new(vec![0u8; threshold]);
    let mut out: Vec<Share> = (1..=shares)
        .map(|x| Share {
            x: x as u8,
            y: Vec::with_capacity(secret.len()),
        })
        .collect();

    for &byte in secret {
        coefficients[0] = byte;
        rng.fill_bytes(&mut coefficients[1..]);
        for share in &mut out {
            // Horner evaluation at share.x.
            let y = coefficients
                .iter()
                .rev()
                .fold(0u8, |acc, &c| gf_mul(acc, share.x) ^ c);
            share.y.push(y);
        }
    }
    Ok(out)
}

/// Recovers the secret from at least `threshold` distinct shares.
pub fn combine(shares: &[Share], threshold: usize) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if threshold == 0 || shares.len() < threshold {
        return Err(CryptoError::Sharing(format!(
            "need {threshold} shares, have {}",
            shares.len()
        )));
    }
    let used = &shares[..threshold];
    let len = used[0].y.len();
    for (i, share) in used.iter().enumerate() {
        if share.x == 0 || share.y.len() != len {
            return Err(CryptoError::Sharing("inconsistent shares".into()));
        }
        if used[..i].iter().any(|other| other.x == share.x) {
            return Err(CryptoError::Sharing("duplicate share".into()));
        }
    }

    let mut secret = Zeroizing::new(vec![0u8; len]);
    for (i, share) in used.iter().enumerate() {
        // Lagrange basis at zero: prod x_j / (x_j - x_i); subtraction is XOR.
        let mut num = 1u8;
        let mut den = 1u8;
        for (j, other) in used.iter().enumerate() {
            if i != j {
                num = gf_mul(num, other.x);
                den = gf_mul(den, other.x ^ share.x);
            }
        }
        let basis = gf_mul(num, gf_inv(den));
        for (out, &y) in secret.iter_mut().zip(&share.y) {
            *out ^= gf_mul(y, basis);
        }
    }
    Ok(secret)
}

fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut p = 0u8;
    for _ in 0..8 {
        if b & 1 == 1 {
            p ^= a;
        }
        let hi = a & 0x80;
        a <<= 1;
        if hi != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    p
}

fn gf_pow(mut a: u8, mut e: u8) -> u8 {
    let mut r = 1u8;
    while e > 0 {
        if e & 1 == 1 {
            r = gf_mul(r, a);
        }
        a = gf_mul(a, a);
        e >>= 1;
    }
    r
}

fn gf_inv(a: u8) -> u8 {
    // a^254 == a^-1 for a != 0
    if a == 0 { 0 } else { gf_pow(a, 254) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gf_mul(a, gf_inv(a)), 1, "inverse of {a}");
        }
    }

    #[test]
    fn any_threshold_subset_recovers() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let shares = split(secret, 2, 3).unwrap();
        for pair in [[0, 1], [0, 2], [1, 2], [2, 0]] {
            let subset = [shares[pair[0]].clone(), shares[pair[1]].clone()];
            assert_eq!(combine(&subset, 2).unwrap().as_slice(), secret);
        }
    }

    #[test]
    fn threshold_one_copies_secret() {
        let shares = split(b"key", 1, 3).unwrap();
        assert!(shares.iter().all(|s| s.y == b"key"));
    }

    #[test]
    fn too_few_shares_fail() {
        let shares = split(b"secret", 3, 3).unwrap();
        assert!(combine(&shares[..2], 3).is_err());
    }

    #[test]
    fn duplicate_shares_fail() {
        let shares = split(b"secret", 2, 2).unwrap();
        assert!(combine(&[shares[0].clone(), shares[0].clone()], 2).is_err());
    }

    #[test]
    fn invalid_parameters() {
        assert!(split(b"s", 0, 2).is_err());
        assert!(split(b"s", 3, 2).is_err());
        assert!(split(b"", 1, 1).is_err());
    }

    #[test]
    fn share_bytes_roundtrip() {
        let share = Share { x: 7, y: vec![1, 2, 3] };
        assert_eq!(Share::from_bytes(&share.to_bytes()).unwrap(), share);
        assert!(Share::from_bytes(&[1]).is_err());
        assert!(Share::from_bytes(&[1, 0]).is_err());
    }
}
