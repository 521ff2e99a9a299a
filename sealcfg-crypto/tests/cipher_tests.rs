use sealcfg_crypto::{
    decrypt_leaf, encrypt_leaf, generate_data_key, CipherSuite, CryptoError, SealedLeaf, NONCE_SIZE,
};

const SUITES: [CipherSuite; 2] = [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305];

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = generate_data_key();
    for suite in SUITES {
        let sealed = encrypt_leaf(suite, &key, b"Hello, World!", b"greeting:").unwrap();
        let decrypted = decrypt_leaf(suite, &key, &sealed, b"greeting:").unwrap();
        assert_eq!(decrypted, b"Hello, World!");
    }
}

#[test]
fn encrypt_decrypt_empty() {
    let key = generate_data_key();
    for suite in SUITES {
        let sealed = encrypt_leaf(suite, &key, b"", b"empty:").unwrap();
        assert!(sealed.ciphertext.is_empty());
        assert_eq!(decrypt_leaf(suite, &key, &sealed, b"empty:").unwrap(), b"");
    }
}

#[test]
fn ciphertext_excludes_tag() {
    let key = generate_data_key();
    let sealed = encrypt_leaf(CipherSuite::default(), &key, b"twelve bytes", b"k:").unwrap();
    assert_eq!(sealed.ciphertext.len(), 12);
}

#[test]
fn wrong_key_fails_decryption() {
    let key1 = generate_data_key();
    let key2 = generate_data_key();
    let sealed = encrypt_leaf(CipherSuite::Aes256Gcm, &key1, b"Secret", b"k:").unwrap();
    assert!(matches!(
        decrypt_leaf(CipherSuite::Aes256Gcm, &key2, &sealed, b"k:"),
        Err(CryptoError::Decryption(_))
    ));
}

#[test]
fn moved_leaf_fails_decryption() {
    let key = generate_data_key();
    let sealed = encrypt_leaf(CipherSuite::Aes256Gcm, &key, b"Secret", b"db:password:").unwrap();
    assert!(decrypt_leaf(CipherSuite::Aes256Gcm, &key, &sealed, b"db:user:").is_err());
}

#[test]
fn wrong_suite_fails_decryption() {
    let key = generate_data_key();
    let sealed = encrypt_leaf(CipherSuite::Aes256Gcm, &key, b"Secret", b"k:").unwrap();
    assert!(decrypt_leaf(CipherSuite::ChaCha20Poly1305, &key, &sealed, b"k:").is_err());
}

#[test]
fn tampered_tag_fails_decryption() {
    let key = generate_data_key();
    let mut sealed = encrypt_leaf(CipherSuite::ChaCha20Poly1305, &key, b"Secret", b"k:").unwrap();
    sealed.tag[0] ^= 0xFF;
    assert!(decrypt_leaf(CipherSuite::ChaCha20Poly1305, &key, &sealed, b"k:").is_err());
}

#[test]
fn same_plaintext_produces_different_ciphertext() {
    let key = generate_data_key();
    let e1 = encrypt_leaf(CipherSuite::Aes256Gcm, &key, b"Same", b"k:").unwrap();
    let e2 = encrypt_leaf(CipherSuite::Aes256Gcm, &key, b"Same", b"k:").unwrap();
    assert_ne!(e1.nonce, e2.nonce);
    assert_ne!(e1.ciphertext, e2.ciphertext);
}

// ── SealedLeaf ───────────────────────────────────────────────────

#[test]
fn from_parts_checks_lengths() {
    assert!(SealedLeaf::from_parts(&[0u8; NONCE_SIZE], vec![1], &[0u8; 16]).is_ok());
    assert!(matches!(
        SealedLeaf::from_parts(&[0u8; 8], vec![1], &[0u8; 16]),
        Err(CryptoError::InvalidNonceLength { expected: 12, actual: 8 })
    ));
    assert!(SealedLeaf::from_parts(&[0u8; NONCE_SIZE], vec![1], &[0u8; 15]).is_err());
}

// ── CipherSuite ──────────────────────────────────────────────────

#[test]
fn suite_identifiers_roundtrip() {
    for suite in SUITES {
        assert_eq!(CipherSuite::from_identifier(suite.identifier()).unwrap(), suite);
    }
    assert!(matches!(
        CipherSuite::from_identifier("DES"),
        Err(CryptoError::UnsupportedCipher(_))
    ));
}

#[test]
fn suite_parses_cli_names() {
    assert_eq!("aes256-gcm".parse::<CipherSuite>().unwrap(), CipherSuite::Aes256Gcm);
    assert_eq!(
        "chacha20-poly1305".parse::<CipherSuite>().unwrap(),
        CipherSuite::ChaCha20Poly1305
    );
    assert_eq!("AES256_GCM".parse::<CipherSuite>().unwrap(), CipherSuite::Aes256Gcm);
    assert!("rot13".parse::<CipherSuite>().is_err());
}

#[test]
fn default_suite_is_aes() {
    assert_eq!(CipherSuite::default().to_string(), "AES256_GCM");
}
