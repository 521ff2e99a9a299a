//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sealcfg_crypto::CipherSuite;
use sealcfg_document::FormatTag;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealcfg", version)]
#[command(about = "Encrypt selected values in YAML, JSON, INI and dotenv files")]
pub struct Cli {
    /// Configuration file (defaults to ./sealcfg.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep going when a file fails and report every failure at the end
    #[arg(long, global = true)]
    pub collect_errors: bool,

    /// Leave files whose name starts with a dot alone
    #[arg(long, global = true)]
    pub skip_hidden: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt files or directory trees
    Encrypt(EncryptArgs),
    /// Decrypt files or directory trees
    Decrypt(DecryptArgs),
    /// Generate a new secret key file and print its recipient
    Keygen(KeygenArgs),
}

#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recipient for a single key group (repeatable)
    #[arg(short, long = "recipient")]
    pub recipients: Vec<String>,

    /// Comma-separated recipients forming one key group (repeatable)
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// Number of key groups required to decrypt
    #[arg(long)]
    pub shamir_threshold: Option<usize>,

    #[arg(long, group = "scope")]
    pub encrypted_regex: Option<String>,

    #[arg(long, group = "scope")]
    pub unencrypted_regex: Option<String>,

    #[arg(long, group = "scope")]
    pub encrypted_suffix: Option<String>,

    #[arg(long, group = "scope")]
    pub unencrypted_suffix: Option<String>,

    /// Leaf cipher: aes256-gcm or chacha20-poly1305
    #[arg(long)]
    pub cipher: Option<CipherSuite>,

    #[arg(long)]
    pub input_format: Option<FormatTag>,

    #[arg(long)]
    pub output_format: Option<FormatTag>,

    /// Rewrite files instead of printing to stdout
    #[arg(short, long)]
    pub in_place: bool,
}

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// File holding age or box secret keys, one per line (repeatable)
    #[arg(long)]
    pub identity_file: Vec<PathBuf>,

    /// Environment variable holding secret keys, one per line
    #[arg(long, value_name = "VAR")]
    pub identity_env: Option<String>,

    /// Return files without envelope metadata unchanged
    #[arg(long)]
    pub pass_through_plain: bool,

    #[arg(long)]
    pub input_format: Option<FormatTag>,

    #[arg(long)]
    pub output_format: Option<FormatTag>,

    /// Rewrite files instead of printing to stdout
    #[arg(short, long)]
    pub in_place: bool,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    #[arg(long, value_enum, default_value_t = KeyScheme::Age)]
    pub scheme: KeyScheme,

    /// Where to write the secret key. Must not exist yet.
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyScheme {
    Age,
    Box,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_encrypt_flags() {
        let cli = Cli::try_parse_from([
            "sealcfg",
            "encrypt",
            "app.yaml",
            "-r",
            "age1a",
            "--group",
            "age1b,box:c",
            "--shamir-threshold",
            "2",
            "--encrypted-regex",
            "^password$",
            "--cipher",
            "chacha20-poly1305",
            "--output-format",
            "json",
            "--verbose",
        ])
        .unwrap();
        let Command::Encrypt(args) = cli.command else {
            panic!("expected encrypt");
        };
        assert!(cli.verbose);
        assert_eq!(args.recipients, vec!["age1a"]);
        assert_eq!(args.groups, vec!["age1b,box:c"]);
        assert_eq!(args.shamir_threshold, Some(2));
        assert_eq!(args.cipher, Some(CipherSuite::ChaCha20Poly1305));
        assert_eq!(args.output_format, Some(FormatTag::Json));
    }

    #[test]
    fn scope_flags_conflict() {
        let result = Cli::try_parse_from([
            "sealcfg",
            "encrypt",
            "a.yaml",
            "--encrypted-regex",
            "x",
            "--unencrypted-suffix",
            "_plain",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn keygen_defaults_to_age() {
        let cli = Cli::try_parse_from(["sealcfg", "keygen", "-o", "key.txt"]).unwrap();
        let Command::Keygen(args) = cli.command else {
            panic!("expected keygen");
        };
        assert_eq!(args.scheme, KeyScheme::Age);
    }
}
