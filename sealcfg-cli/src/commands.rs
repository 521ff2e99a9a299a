//! Subcommand implementations.

use crate::args::{DecryptArgs, EncryptArgs, KeyScheme, KeygenArgs};
use crate::config::{DecryptConfig, EncryptConfig};
use crate::identity::Identities;
use anyhow::{bail, Context, Result};
use sealcfg_crypto::{encode_secret_key, generate_age_identity, generate_box_keypair, CipherSuite};
use sealcfg_engine::{
    Decoder, Encoder, EngineResult, EnvelopeDecoder, EnvelopeEncoder, NotEncryptedPolicy, Scope,
};
use sealcfg_fs::{write_atomic, FsResult, WalkReport, Walker};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use zeroize::Zeroizing;

enum Mode<'a> {
    Encrypt(&'a dyn Encoder),
    Decrypt(&'a dyn Decoder),
}

impl Mode<'_> {
    fn transform_file(&self, path: &Path) -> EngineResult<Vec<u8>> {
        match self {
            Mode::Encrypt(encoder) => encoder.encode_file(path),
            Mode::Decrypt(decoder) => decoder.decode_file(path),
        }
    }

    fn walk(&self, walker: &Walker, root: &Path) -> FsResult<WalkReport> {
        match self {
            Mode::Encrypt(encoder) => walker.encode_tree(root, *encoder),
            Mode::Decrypt(decoder) => walker.decode_tree(root, *decoder),
        }
    }
}

pub fn encrypt(args: EncryptArgs, config: &EncryptConfig, walker: &Walker, out: &mut dyn Write) -> Result<()> {
    let groups = recipient_groups(&args, config)?;

    let scope = if args.encrypted_regex.is_some()
        || args.unencrypted_regex.is_some()
        || args.encrypted_suffix.is_some()
        || args.unencrypted_suffix.is_some()
    {
        Scope::from_options(
            args.encrypted_regex,
            args.unencrypted_regex,
            args.encrypted_suffix,
            args.unencrypted_suffix,
        )?
    } else {
        Scope::from_options(
            config.encrypted_regex.clone(),
            config.unencrypted_regex.clone(),
            config.encrypted_suffix.clone(),
            config.unencrypted_suffix.clone(),
        )
        .context("invalid scope in configuration")?
    };

    let cipher = match args.cipher {
        Some(cipher) => cipher,
        None => config
            .cipher
            .parse::<CipherSuite>()
            .context("invalid cipher in configuration")?,
    };

    let mut builder = EnvelopeEncoder::builder().scope(scope).cipher(cipher);
    for group in groups {
        builder = builder.recipients(group);
    }
    if let Some(threshold) = args.shamir_threshold.or(config.shamir_threshold) {
        builder = builder.shamir_threshold(threshold);
    }
    if let Some(format) = args.input_format {
        builder = builder.input_format(format);
    }
    if let Some(format) = args.output_format {
        builder = builder.output_format(format);
    }
    let encoder = builder.build().context("invalid encryption settings")?;

    process(&args.paths, args.in_place, walker, Mode::Encrypt(&encoder), out)
}

/// Recipient groups from flags, or from the configuration when no
/// recipient flag is given.
fn recipient_groups(args: &EncryptArgs, config: &EncryptConfig) -> Result<Vec<Vec<String>>> {
    let mut groups = Vec::new();
    if !args.recipients.is_empty() {
        groups.push(args.recipients.clone());
    }
    for group in &args.groups {
        let members: Vec<String> = group
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
        if members.is_empty() {
            bail!("--group needs at least one recipient");
        }
        groups.push(members);
    }

    if groups.is_empty() {
        if !config.recipients.is_empty() {
            groups.push(config.recipients.clone());
        }
        groups.extend(config.key_groups.iter().cloned());
    }
    if groups.is_empty() {
        bail!("no recipients: pass --recipient or --group, or set them in sealcfg.toml");
    }
    Ok(groups)
}

pub fn decrypt(args: DecryptArgs, config: &DecryptConfig, walker: &Walker, out: &mut dyn Write) -> Result<()> {
    let mut identities = Identities::default();
    let files = if args.identity_file.is_empty() {
        &config.identity_files
    } else {
        &args.identity_file
    };
    for file in files {
        identities.add_file(file)?;
    }
    if let Some(var) = &args.identity_env {
        identities.add_env(var)?;
    }
    if identities.is_empty() {
        bail!("no identities: pass --identity-file or --identity-env");
    }
    info!(keys = identities.len(), "loaded identities");

    let policy = if args.pass_through_plain || config.pass_through_plain {
        NotEncryptedPolicy::PassThrough
    } else {
        NotEncryptedPolicy::Fail
    };
    let mut builder = EnvelopeDecoder::builder()
        .keyring(identities.into_keyring())
        .not_encrypted(policy);
    if let Some(format) = args.input_format {
        builder = builder.input_format(format);
    }
    if let Some(format) = args.output_format {
        builder = builder.output_format(format);
    }
    let decoder = builder.build();

    process(&args.paths, args.in_place, walker, Mode::Decrypt(&decoder), out)
}

/// Directories and `--in-place` files go through the walker; other files
/// are written to `out`.
fn process(paths: &[PathBuf], in_place: bool, walker: &Walker, mode: Mode<'_>, out: &mut dyn Write) -> Result<()> {
    let mut failures = 0usize;
    for path in paths {
        if in_place || path.is_dir() {
            let report = mode.walk(walker, path)?;
            for failure in report.failed {
                failures += 1;
                error!("{:#}", anyhow::Error::new(failure));
            }
            continue;
        }

        let output = mode
            .transform_file(path)
            .with_context(|| format!("failed to process {}", path.display()))?;
        out.write_all(&output).context("failed to write output")?;
    }

    if failures > 0 {
        bail!("{failures} file(s) failed");
    }
    Ok(())
}

pub fn keygen(args: KeygenArgs, out: &mut dyn Write) -> Result<()> {
    if args.output.exists() {
        bail!("refusing to overwrite {}", args.output.display());
    }

    let (secret, recipient) = match args.scheme {
        KeyScheme::Age => {
            let pair = generate_age_identity();
            (pair.secret_line(), pair.recipient)
        }
        KeyScheme::Box => {
            let pair = generate_box_keypair();
            (encode_secret_key(&pair.secret), pair.recipient)
        }
    };
    let contents = Zeroizing::new(format!("# public key: {recipient}\n{}\n", secret.as_str()));

    write_atomic(&args.output, contents.as_bytes(), key_file_permissions())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(scheme = ?args.scheme, path = %args.output.display(), "wrote secret key");

    writeln!(out, "{recipient}").context("failed to write output")?;
    Ok(())
}

#[cfg(unix)]
fn key_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn key_file_permissions() -> Option<std::fs::Permissions> {
    None
}
