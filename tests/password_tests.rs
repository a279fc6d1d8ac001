use startronics_backend::util::password::*;

#[test]
fn hash_password_produces_argon2_hash() {
    let password = "test_password_123";
    let hash = PasswordUtilsImpl::hash_password(password).expect("hash");

    assert!(!hash.is_empty());
    assert_ne!(hash, password);
    assert!(hash.starts_with("$argon2"));
}

#[test]
fn same_password_hashes_differently() {
    let password = "test_password_123";
    let first = PasswordUtilsImpl::hash_password(password).expect("hash");
    let second = PasswordUtilsImpl::hash_password(password).expect("hash");

    // Salted: equal inputs must not produce equal hashes.
    assert_ne!(first, second);
}

#[test]
fn verify_password_accepts_correct_and_rejects_wrong() {
    let password = "CorrectHorse1!";
    let hash = PasswordUtilsImpl::hash_password(password).expect("hash");

    assert!(PasswordUtilsImpl::verify_password(password, &hash).expect("verify"));
    assert!(!PasswordUtilsImpl::verify_password("WrongHorse1!", &hash).expect("verify"));
}

#[test]
fn verify_password_rejects_malformed_hash() {
    let result = PasswordUtilsImpl::verify_password("whatever", "not-a-hash");
    assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
}

#[test]
fn password_strength_table() {
    let cases: Vec<(&str, bool)> = vec![
        ("ValidPass123!", true),
        ("weak", false),
        ("nouppercase123!", false),
        ("NOLOWERCASE123!", false),
        ("NoDigitsHere!", false),
        ("NoSpecialChars123", false),
        ("Short1!", false),
        ("AnotherValidOne456@", true),
        ("", false),
        ("1234567890", false),
    ];

    for (password, expected_valid) in cases {
        let result = PasswordUtilsImpl::validate_password_strength(password);
        assert_eq!(
            result.is_ok(),
            expected_valid,
            "unexpected verdict for {:?}",
            password
        );
    }
}
