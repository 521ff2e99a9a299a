//! Data key wrapping across key groups.
//!
//! With a single group every member wraps the whole data key. With several
//! groups the key is split into one Shamir share per group, and each member of
//! group `i` wraps share `i`; any `threshold` groups recover the key.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DataKey;
use crate::keyring::Keyring;
use crate::master_key::KeyGroup;
use crate::shamir::{self, Share};
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// One member's wrapped copy of the group secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedKey {
    pub scheme: String,
    pub recipient: String,
    pub enc: String,
}

/// The wrapped secrets of one key group, in member order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrappedGroup {
    pub keys: Vec<WrappedKey>,
}

/// Output of [`wrap_data_key`].
#[derive(Clone, Debug)]
pub struct WrappedDataKey {
    pub groups: Vec<WrappedGroup>,
    /// Present only when more than one group was used.
    pub threshold: Option<usize>,
}

/// Checks a threshold against a group count and returns the effective value.
pub fn effective_threshold(groups: usize, threshold: Option<usize>) -> CryptoResult<usize> {
    if groups == 0 {
        return Err(CryptoError::KeyResolution("no key groups".into()));
    }
    let t = threshold.unwrap_or(groups);
    if t == 0 || t > groups {
        return Err(CryptoError::Sharing(format!(
            "threshold {t} is outside 1..={groups}"
        )));
    }
    Ok(t)
}

/// Wraps `key` for every member of every group.
pub fn wrap_data_key(
    key: &DataKey,
    groups: &[KeyGroup],
    threshold: Option<usize>,
) -> CryptoResult<WrappedDataKey> {
    let t = effective_threshold(groups.len(), threshold)?;
    if let Some(index) = groups.iter().position(KeyGroup::is_empty) {
        return Err(CryptoError::KeyResolution(format!("key group {} is empty", index + 1)));
    }

    let secrets: Vec<Zeroizing<Vec<u8>>> = if groups.len() == 1 {
        vec![Zeroizing::new(key.as_bytes().to_vec())]
    } else {
        shamir::split(key.as_bytes(), t, groups.len())?
            .iter()
            .map(Share::to_bytes)
            .collect()
    };

    let mut wrapped = Vec::with_capacity(groups.len());
    for (group, secret) in groups.iter().zip(&secrets) {
        let mut keys = Vec::with_capacity(group.len());
        for member in group.members() {
            keys.push(WrappedKey {
                scheme: member.scheme().to_string(),
                recipient: member.recipient(),
                enc: member.wrap_key(secret)?,
            });
        }
        wrapped.push(WrappedGroup { keys });
    }

    debug!(
        groups = wrapped.len(),
        recipients = wrapped.iter().map(|g| g.keys.len()).sum::<usize>(),
        threshold = t,
        "wrapped data key"
    );
    Ok(WrappedDataKey {
        threshold: (groups.len() > 1).then_some(t),
        groups: wrapped,
    })
}

/// Recovers the data key from stored groups.
///
/// Groups are tried in order, members within a group in order; the first
/// member that unwraps supplies the group's secret. Returns as soon as enough
/// groups are satisfied.
pub fn unwrap_data_key(
    groups: &[WrappedGroup],
    threshold: Option<usize>,
    keyring: &Keyring,
) -> CryptoResult<DataKey> {
    let t = effective_threshold(groups.len(), threshold)?;
    let mut shares = Vec::with_capacity(t);
    let mut failures = 0usize;

    for (index, group) in groups.iter().enumerate() {
        let Some(secret) = unwrap_group(index, group, keyring, &mut failures) else {
            continue;
        };
        if groups.len() == 1 {
            return DataKey::from_slice(&secret);
        }
        shares.push(Share::from_bytes(&secret)?);
        if shares.len() == t {
            let recovered = shamir::combine(&shares, t)?;
            return DataKey::from_slice(&recovered);
        }
    }

    Err(CryptoError::KeyUnavailable(format!(
        "{} of {t} required key groups could be unwrapped ({failures} member attempts failed)",
        shares.len()
    )))
}

fn unwrap_group(
    index: usize,
    group: &WrappedGroup,
    keyring: &Keyring,
    failures: &mut usize,
) -> Option<Zeroizing<Vec<u8>>> {
    for wrapped in &group.keys {
        let attempt = keyring
            .resolve_stored(&wrapped.scheme, &wrapped.recipient)
            .and_then(|key| key.unwrap_key(&wrapped.enc));
        match attempt {
            Ok(secret) => {
                debug!(group = index + 1, recipient = %wrapped.recipient, "unwrapped group secret");
                return Some(secret);
            }
            Err(e) => {
                *failures += 1;
                trace!(group = index + 1, recipient = %wrapped.recipient, error = %e, "member could not unwrap");
            }
        }
    }
    None
}
