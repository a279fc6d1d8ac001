use startronics_backend::config::JwtConfig;
use startronics_backend::util::jwt::*;

fn create_test_jwt_utils() -> JwtTokenUtilsImpl {
    JwtTokenUtilsImpl::new(JwtConfig::default())
}

#[test]
fn access_token_round_trips_claims() {
    let jwt_utils = create_test_jwt_utils();
    let token = jwt_utils
        .generate_access_token("user123", "user@example.com", "technician")
        .expect("generate access token");

    let claims = jwt_utils.validate_access_token(&token).expect("validate");
    assert_eq!(claims.sub, "user123");
    assert_eq!(claims.email, "user@example.com");
    assert_eq!(claims.role, "technician");
    assert_eq!(claims.token_type, "access");
    assert!(claims.exp > claims.iat);
    assert_eq!(
        claims.user_role(),
        Some(startronics_backend::model::role::UserRole::Technician)
    );
}

#[test]
fn token_pair_contains_both_types() {
    let jwt_utils = create_test_jwt_utils();
    let pair = jwt_utils
        .generate_token_pair("user123", "user@example.com", "customer")
        .expect("generate pair");

    assert_eq!(pair.token_type, "Bearer");
    assert!(pair.expires_in > 0);
    assert!(jwt_utils.validate_access_token(&pair.access_token).is_ok());
    assert!(jwt_utils.validate_refresh_token(&pair.refresh_token).is_ok());
}

#[test]
fn token_types_are_not_interchangeable() {
    let jwt_utils = create_test_jwt_utils();
    let pair = jwt_utils
        .generate_token_pair("user123", "user@example.com", "customer")
        .expect("generate pair");

    let result = jwt_utils.validate_access_token(&pair.refresh_token);
    assert!(matches!(result, Err(JwtError::InvalidTokenType { .. })));

    let result = jwt_utils.validate_refresh_token(&pair.access_token);
    assert!(matches!(result, Err(JwtError::InvalidTokenType { .. })));
}

#[test]
fn expired_token_is_rejected() {
    // Negative expiry pushes exp far enough into the past to beat leeway.
    let config = JwtConfig {
        access_token_expiration: -5,
        ..JwtConfig::default()
    };
    let jwt_utils = JwtTokenUtilsImpl::new(config);
    let token = jwt_utils
        .generate_access_token("user123", "user@example.com", "customer")
        .expect("generate");

    let result = jwt_utils.validate_access_token(&token);
    assert!(matches!(result, Err(JwtError::TokenExpired)));
}

#[test]
fn tampered_token_is_rejected() {
    let jwt_utils = create_test_jwt_utils();
    let token = jwt_utils
        .generate_access_token("user123", "user@example.com", "admin")
        .expect("generate");

    let mut tampered = token.clone();
    tampered.push('x');
    assert!(jwt_utils.validate_access_token(&tampered).is_err());

    let other = JwtTokenUtilsImpl::new(JwtConfig {
        jwt_secret: "a_completely_different_secret_key_of_sufficient_length".to_string(),
        ..JwtConfig::default()
    });
    assert!(other.validate_access_token(&token).is_err());
}

#[test]
fn extract_token_from_header_requires_bearer() {
    let jwt_utils = create_test_jwt_utils();

    assert_eq!(
        jwt_utils
            .extract_token_from_header("Bearer abc.def.ghi")
            .expect("extract"),
        "abc.def.ghi"
    );
    assert!(jwt_utils.extract_token_from_header("Basic abc").is_err());
    assert!(jwt_utils.extract_token_from_header("Bearer ").is_err());
    assert!(jwt_utils.extract_token_from_header("").is_err());
}
