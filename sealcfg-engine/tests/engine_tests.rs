use pretty_assertions::assert_eq;
use sealcfg_crypto::{
    generate_age_identity, generate_box_keypair, AgeProvider, BoxProvider, Keyring,
};
use sealcfg_document::format::{DotenvAdapter, JsonAdapter, YamlAdapter};
use sealcfg_document::{Document, FormatAdapter, Scalar, ScalarType, Value};
use sealcfg_engine::{
    CipherSuite, Decoder, Encoder, EnvelopeDecoder, EnvelopeEncoder, ErrorKind, FormatTag,
    NotEncryptedPolicy, Operation, Scope,
};
use std::sync::Arc;

// ── helpers ──────────────────────────────────────────────────────

struct Recipient {
    recipient: String,
    keyring: Keyring,
}

fn age_recipient() -> Recipient {
    let pair = generate_age_identity();
    Recipient {
        recipient: pair.recipient,
        keyring: Keyring::new().with_provider(AgeProvider::with_identities(vec![pair.identity])),
    }
}

fn encoder_for(recipient: &Recipient, scope: Scope) -> EnvelopeEncoder {
    EnvelopeEncoder::builder()
        .recipients([recipient.recipient.clone()])
        .scope(scope)
        .build()
        .unwrap()
}

fn decoder_for(recipient: &Recipient) -> EnvelopeDecoder {
    EnvelopeDecoder::builder().keyring(recipient.keyring.clone()).build()
}

fn load_yaml(bytes: &[u8]) -> Document {
    YamlAdapter.load_encrypted(bytes, "test.yaml").unwrap()
}

fn encrypted_at<'a>(document: &'a Document, key: &str) -> &'a sealcfg_document::EncryptedScalar {
    match document.branches[0].get(key) {
        Some(Value::Encrypted(enc)) => enc,
        other => panic!("{key} is not encrypted: {other:?}"),
    }
}

// ── example scenario ─────────────────────────────────────────────

#[test]
fn yaml_password_scenario() {
    let input = b"a: 1\npassword: secret\n";
    let who = age_recipient();
    let encoder = encoder_for(&who, Scope::EncryptedRegex("password".into()));

    let sealed = encoder.encrypt("config.yaml", input).unwrap();
    let document = load_yaml(&sealed);
    assert_eq!(document.branches[0].get("a"), Some(&Value::from(1i64)));
    let password = encrypted_at(&document, "password");
    assert_eq!(password.algorithm, "AES256_GCM");
    assert_eq!(password.value_type, ScalarType::Str);

    let metadata = document.metadata.as_ref().unwrap();
    assert_eq!(metadata.key_groups.len(), 1);
    assert_eq!(metadata.key_groups[0]["age"][0].recipient, who.recipient);
    assert_eq!(metadata.shamir_threshold, None);
    assert_eq!(metadata.scope.encrypted_regex.as_deref(), Some("password"));
    assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));

    let restored = decoder_for(&who).decrypt("config.yaml", &sealed).unwrap();
    assert_eq!(String::from_utf8(restored).unwrap(), String::from_utf8(input.to_vec()).unwrap());

    let err = encoder.encrypt("config.yaml", &sealed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyEncrypted);
    assert_eq!(err.operation(), Operation::Encode);
    assert!(err.to_string().contains("branch 1 of 1"), "{err}");
}

// ── round trips ──────────────────────────────────────────────────

#[test]
fn json_nested_roundtrip_encrypts_every_leaf() {
    let input = br#"{
  "name": "svc",
  "port": 8080,
  "ratio": 0.25,
  "debug": false,
  "extra": null,
  "db": {
    "hosts": [
      "a",
      "b"
    ],
    "password": "pw"
  }
}
"#;
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("app.json", input).unwrap();

    let document = JsonAdapter.load_encrypted(&sealed, "app.json").unwrap();
    let mut plain_leaves = 0;
    sealcfg_engine::tree::walk(&document.branches, &mut |_: &sealcfg_engine::tree::LeafPath, v: &Value| {
        if !v.is_encrypted() {
            plain_leaves += 1;
        }
        Ok::<_, ()>(())
    })
    .unwrap();
    assert_eq!(plain_leaves, 0);
    assert_eq!(encrypted_at(&document, "port").value_type, ScalarType::Int);
    assert_eq!(encrypted_at(&document, "ratio").value_type, ScalarType::Float);
    assert_eq!(encrypted_at(&document, "debug").value_type, ScalarType::Bool);
    assert_eq!(encrypted_at(&document, "extra").value_type, ScalarType::Null);

    let restored = decoder_for(&who).decrypt("app.json", &sealed).unwrap();
    assert_eq!(String::from_utf8(restored).unwrap(), String::from_utf8(input.to_vec()).unwrap());
}

#[test]
fn sequence_elements_use_enclosing_key() {
    let input = b"tokens:\n- t1\n- t2\nnames:\n- n1\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::EncryptedRegex("^tokens$".into()))
        .encrypt("s.yaml", input)
        .unwrap();
    let document = load_yaml(&sealed);
    match document.branches[0].get("tokens") {
        Some(Value::Sequence(values)) => assert!(values.iter().all(Value::is_encrypted)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        document.branches[0].get("names"),
        Some(&Value::Sequence(vec![Value::from("n1")]))
    );
    assert_eq!(decoder_for(&who).decrypt("s.yaml", &sealed).unwrap(), input.to_vec());
}

#[test]
fn numeric_yaml_keys_keep_their_kind() {
    let input = b"1: one\n2: two\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::EncryptedRegex("^2$".into()))
        .encrypt("n.yaml", input)
        .unwrap();
    let text = String::from_utf8(sealed.clone()).unwrap();
    assert!(text.starts_with("1: one\n2: ENC["), "{text}");
    assert_eq!(decoder_for(&who).decrypt("n.yaml", &sealed).unwrap(), input.to_vec());
}

#[test]
fn non_matching_leaves_are_untouched() {
    let input = b"user: admin\nport: 5432\napi_secret: s3cr3t\nnested:\n  db_secret: x\n  host: h\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::EncryptedSuffix("_secret".into()))
        .encrypt("c.yaml", input)
        .unwrap();

    let before = YamlAdapter.load_plain(input, "c.yaml").unwrap();
    let after = load_yaml(&sealed);
    assert_eq!(after.branches[0].get("user"), before.branches[0].get("user"));
    assert_eq!(after.branches[0].get("port"), before.branches[0].get("port"));
    assert!(after.branches[0].get("api_secret").unwrap().is_encrypted());
    match after.branches[0].get("nested") {
        Some(Value::Mapping(items)) => {
            assert!(items[0].value.is_encrypted());
            assert_eq!(items[1].value, Value::from("h"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn multi_document_yaml_roundtrip() {
    let input = b"a: 1\n---\nb: two\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("m.yaml", input).unwrap();
    let text = String::from_utf8(sealed.clone()).unwrap();
    assert_eq!(text.matches("sops:").count(), 2);
    assert_eq!(decoder_for(&who).decrypt("m.yaml", &sealed).unwrap(), input.to_vec());
}

#[test]
fn sentinel_in_later_branch_is_reported() {
    let input = b"a: 1\n---\nsops: {}\nb: 2\n";
    let who = age_recipient();
    let err = encoder_for(&who, Scope::default()).encrypt("m.yaml", input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyEncrypted);
    assert!(err.to_string().contains("branch 2 of 2"));
}

#[test]
fn dotenv_roundtrip() {
    let input = b"DB_PASSWORD=secret\nHOST=localhost\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::EncryptedSuffix("_PASSWORD".into()))
        .encrypt(".env", input)
        .unwrap();
    let text = String::from_utf8(sealed.clone()).unwrap();
    assert!(text.contains("HOST=localhost\n"));
    assert!(text.contains("DB_PASSWORD=ENC[AES256_GCM,"));
    assert!(text.contains("sops_mac="));

    let document = DotenvAdapter.load_encrypted(&sealed, ".env").unwrap();
    assert!(document.metadata.is_some());
    assert_eq!(decoder_for(&who).decrypt(".env", &sealed).unwrap(), input.to_vec());
}

#[test]
fn ini_roundtrip() {
    let input = b"[database]\npassword = pw\nhost = db\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::EncryptedRegex("^password$".into()))
        .encrypt("app.ini", input)
        .unwrap();
    assert!(String::from_utf8_lossy(&sealed).contains("[sops]"));
    assert_eq!(decoder_for(&who).decrypt("app.ini", &sealed).unwrap(), input.to_vec());
}

#[test]
fn sparse_flattened_metadata_is_rejected() {
    let who = age_recipient();
    let encoder = encoder_for(&who, Scope::default());
    let accepted = [ErrorKind::Parse, ErrorKind::AlreadyEncrypted];

    let err = encoder
        .encrypt("app.env", b"A=1\nsops_x__list_18446744073709551615=y\n")
        .unwrap_err();
    assert!(accepted.contains(&err.kind()), "{err}");

    let err = encoder
        .encrypt("app.ini", b"[sops]\nx__list_4000000000 = y\n")
        .unwrap_err();
    assert!(accepted.contains(&err.kind()), "{err}");

    let err = decoder_for(&who)
        .decrypt("app.env", b"A=1\nsops_x__list_7=y\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn binary_roundtrip() {
    let input = b"\x00\x01opaque\xffblob";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("key.bin", input).unwrap();
    assert!(sealed.starts_with(b"{"));
    assert_eq!(decoder_for(&who).decrypt("key.bin", &sealed).unwrap(), input.to_vec());

    let err = encoder_for(&who, Scope::default()).encrypt("key.bin", &sealed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyEncrypted);
}

#[test]
fn binary_data_ignores_scope() {
    let who = age_recipient();
    let encoder = encoder_for(&who, Scope::EncryptedRegex("^password$".into()));

    let raw = b"\x00\x01opaque\xffblob";
    let sealed = encoder.encrypt("key.bin", raw).unwrap();
    let document = JsonAdapter.load_encrypted(&sealed, "key.bin").unwrap();
    assert_eq!(encrypted_at(&document, "data").value_type, ScalarType::Bytes);
    assert_eq!(decoder_for(&who).decrypt("key.bin", &sealed).unwrap(), raw.to_vec());

    let text = b"plain text payload";
    let sealed = encoder.encrypt("notes.bin", text).unwrap();
    assert!(!String::from_utf8_lossy(&sealed).contains("plain text payload"));
    assert_eq!(decoder_for(&who).decrypt("notes.bin", &sealed).unwrap(), text.to_vec());
}

#[test]
fn output_format_override() {
    let who = age_recipient();
    let encoder = EnvelopeEncoder::builder()
        .recipients([who.recipient.clone()])
        .output_format(FormatTag::Yaml)
        .build()
        .unwrap();
    let sealed = encoder.encrypt("in.json", br#"{"k": "v"}"#).unwrap();
    assert!(String::from_utf8_lossy(&sealed).contains("k: ENC["));

    let restored = decoder_for(&who).decrypt("out.yaml", &sealed).unwrap();
    assert_eq!(restored, b"k: v\n".to_vec());
}

#[test]
fn chacha_cipher_is_recorded() {
    let who = age_recipient();
    let encoder = EnvelopeEncoder::builder()
        .recipients([who.recipient.clone()])
        .cipher(CipherSuite::ChaCha20Poly1305)
        .build()
        .unwrap();
    let sealed = encoder.encrypt("c.yaml", b"k: v\n").unwrap();
    assert_eq!(encrypted_at(&load_yaml(&sealed), "k").algorithm, "CHACHA20_POLY1305");
    assert_eq!(decoder_for(&who).decrypt("c.yaml", &sealed).unwrap(), b"k: v\n".to_vec());
}

// ── empty / plaintext inputs ─────────────────────────────────────

#[test]
fn empty_document_is_returned_unchanged() {
    let who = age_recipient();
    let encoder = encoder_for(&who, Scope::default());
    assert_eq!(encoder.encrypt("e.yaml", b"").unwrap(), b"".to_vec());
    assert_eq!(encoder.encrypt("e.yaml", b"---\n").unwrap(), b"---\n".to_vec());
    assert_eq!(encoder.encrypt("e.json", b"  \n").unwrap(), b"  \n".to_vec());
}

#[test]
fn plaintext_decode_policy() {
    let who = age_recipient();
    let err = decoder_for(&who).decrypt("p.yaml", b"a: 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEncrypted);
    assert!(err.to_string().starts_with("decode failed"));

    let passthrough = EnvelopeDecoder::builder()
        .keyring(who.keyring.clone())
        .not_encrypted(NotEncryptedPolicy::PassThrough)
        .build();
    assert_eq!(passthrough.decrypt("p.yaml", b"a: 1\n").unwrap(), b"a: 1\n".to_vec());
}

#[test]
fn yaml_in_json_file_is_format_mismatch() {
    let who = age_recipient();
    let err = encoder_for(&who, Scope::default())
        .encrypt("wrong.json", b"a: 1\nb:\n  - x\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FormatMismatch);
}

#[test]
fn malformed_input_is_parse_error() {
    let who = age_recipient();
    let err = encoder_for(&who, Scope::default())
        .encrypt("bad.yaml", b"a: [1, 2\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(std::error::Error::source(&err).is_some());
}

// ── integrity and authentication ─────────────────────────────────

fn tamper(sealed: &[u8], edit: impl FnOnce(&mut Document)) -> Vec<u8> {
    let mut document = load_yaml(sealed);
    edit(&mut document);
    YamlAdapter.emit_encrypted(&document).unwrap()
}

fn encrypted_mut<'a>(document: &'a mut Document, key: &str) -> &'a mut sealcfg_document::EncryptedScalar {
    let item = document.branches[0]
        .items
        .iter_mut()
        .find(|item| item.key == key)
        .unwrap();
    match &mut item.value {
        Value::Encrypted(enc) => enc,
        other => panic!("{key} is not encrypted: {other:?}"),
    }
}

#[test]
fn flipped_ciphertext_fails_integrity() {
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default())
        .encrypt("t.yaml", b"user: admin\npassword: hunter2\n")
        .unwrap();
    let tampered = tamper(&sealed, |doc| encrypted_mut(doc, "password").data[0] ^= 0x01);
    let err = decoder_for(&who).decrypt("t.yaml", &tampered).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn altered_mac_fails_integrity() {
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("t.yaml", b"k: v\n").unwrap();
    let tampered = tamper(&sealed, |doc| {
        let meta = doc.metadata.as_mut().unwrap();
        let first = if meta.mac.starts_with('A') { "B" } else { "A" };
        meta.mac.replace_range(0..1, first);
    });
    let err = decoder_for(&who).decrypt("t.yaml", &tampered).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn swapped_leaves_fail_integrity() {
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default())
        .encrypt("t.yaml", b"a: one\nb: two\n")
        .unwrap();
    let tampered = tamper(&sealed, |doc| doc.branches[0].items.swap(0, 1));
    let err = decoder_for(&who).decrypt("t.yaml", &tampered).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn removed_leaf_fails_integrity() {
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default())
        .encrypt("t.yaml", b"a: one\nb: two\n")
        .unwrap();
    let tampered = tamper(&sealed, |doc| {
        doc.branches[0].remove("b");
    });
    assert_eq!(
        decoder_for(&who).decrypt("t.yaml", &tampered).unwrap_err().kind(),
        ErrorKind::Integrity
    );
}

#[test]
fn changed_algorithm_fails_authentication() {
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("t.yaml", b"k: v\n").unwrap();
    let tampered = tamper(&sealed, |doc| {
        encrypted_mut(doc, "k").algorithm = "CHACHA20_POLY1305".into();
    });
    let err = decoder_for(&who).decrypt("t.yaml", &tampered).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(err.to_string().contains("leaf k:"));
}

#[test]
fn wrong_identity_is_key_unavailable() {
    let owner = age_recipient();
    let stranger = age_recipient();
    let sealed = encoder_for(&owner, Scope::default()).encrypt("t.yaml", b"k: v\n").unwrap();
    let err = decoder_for(&stranger).decrypt("t.yaml", &sealed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyUnavailable);
    assert_eq!(err.file(), Some("t.yaml"));
}

// ── key groups ───────────────────────────────────────────────────

#[test]
fn threshold_groups_across_schemes() {
    let age_a = generate_age_identity();
    let age_b = generate_age_identity();
    let boxed = generate_box_keypair();
    let encoder = EnvelopeEncoder::builder()
        .recipients([age_a.recipient.clone()])
        .recipients([age_b.recipient.clone()])
        .recipients([boxed.recipient.clone()])
        .shamir_threshold(2)
        .build()
        .unwrap();
    let sealed = encoder.encrypt("g.yaml", b"k: v\n").unwrap();
    let metadata = load_yaml(&sealed).metadata.unwrap();
    assert_eq!(metadata.key_groups.len(), 3);
    assert_eq!(metadata.shamir_threshold, Some(2));

    let two = Keyring::new()
        .with_provider(AgeProvider::with_identities(vec![age_b.identity.clone()]))
        .with_provider(BoxProvider::with_secret_keys(vec![boxed.secret.clone()]));
    let decoder = EnvelopeDecoder::builder().keyring(two).build();
    assert_eq!(decoder.decrypt("g.yaml", &sealed).unwrap(), b"k: v\n".to_vec());

    let one = Keyring::new().with_provider(AgeProvider::with_identities(vec![age_a.identity.clone()]));
    let err = EnvelopeDecoder::builder()
        .keyring(one)
        .build()
        .decrypt("g.yaml", &sealed)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyUnavailable);
}

#[test]
fn builder_rejects_bad_configuration() {
    let err = EnvelopeEncoder::builder().build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let who = age_recipient();
    let err = EnvelopeEncoder::builder()
        .recipients([who.recipient.clone()])
        .shamir_threshold(2)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let err = EnvelopeEncoder::builder()
        .recipients(["gpg:ABCDEF"])
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyResolution);

    let err = EnvelopeEncoder::builder()
        .recipients([who.recipient.clone()])
        .scope(Scope::UnencryptedRegex("[".into()))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

// ── capabilities and concurrency ─────────────────────────────────

#[test]
fn engines_work_through_trait_objects() {
    let who = age_recipient();
    let encoder: Box<dyn Encoder> = Box::new(encoder_for(&who, Scope::default()));
    let decoder: Box<dyn Decoder> = Box::new(decoder_for(&who));
    let sealed = encoder.encode("x.yaml", b"k: 1\n").unwrap();
    assert_eq!(decoder.decode("x.yaml", &sealed).unwrap(), b"k: 1\n".to_vec());
}

#[test]
fn shared_engines_across_threads() {
    let who = age_recipient();
    let encoder = Arc::new(encoder_for(&who, Scope::EncryptedRegex("^secret$".into())));
    let decoder = Arc::new(decoder_for(&who));

    std::thread::scope(|s| {
        for i in 0..8 {
            let encoder = Arc::clone(&encoder);
            let decoder = Arc::clone(&decoder);
            s.spawn(move || {
                let input = format!("id: {i}\nsecret: value-{i}\n");
                let name = format!("f{i}.yaml");
                let sealed = encoder.encrypt(&name, input.as_bytes()).unwrap();
                assert_eq!(decoder.decrypt(&name, &sealed).unwrap(), input.into_bytes());
            });
        }
    });
}

#[test]
fn typed_scalars_survive_roundtrip() {
    let input = b"i: -42\nf: 1.5\nb: true\nn: null\ns: '42'\n";
    let who = age_recipient();
    let sealed = encoder_for(&who, Scope::default()).encrypt("t.yaml", input).unwrap();
    let restored = decoder_for(&who).decrypt("t.yaml", &sealed).unwrap();
    let document = YamlAdapter.load_plain(&restored, "t.yaml").unwrap();
    let branch = &document.branches[0];
    assert_eq!(branch.get("i"), Some(&Value::Scalar(Scalar::Integer(-42))));
    assert_eq!(branch.get("f"), Some(&Value::Scalar(Scalar::Float(1.5))));
    assert_eq!(branch.get("b"), Some(&Value::Scalar(Scalar::Bool(true))));
    assert_eq!(branch.get("n"), Some(&Value::Scalar(Scalar::Null)));
    assert_eq!(branch.get("s"), Some(&Value::from("42")));
}
