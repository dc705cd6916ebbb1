use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Tokens are issued by the identity service; only access tokens are accepted here.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("access token required".to_string());
    }

    Ok(claims)
}


#[cfg(test)]
mod tests {
    use super::test_support::token;
    use super::*;

    #[test]
    fn access_token_is_accepted() {
        let claims = verify_token(&token("s3cret", TokenType::Access, Some(1000), 900), "s3cret").unwrap();
        assert_eq!(claims.employee_id, Some(1000));
    }

    #[test]
    fn refresh_token_is_rejected() {
        assert!(verify_token(&token("s3cret", TokenType::Refresh, Some(1000), 900), "s3cret").is_err());
    }

    #[test]
    fn wrong_secret_and_expiry_are_rejected() {
        assert!(verify_token(&token("other", TokenType::Access, None, 900), "s3cret").is_err());
        assert!(verify_token(&token("s3cret", TokenType::Access, None, -3600), "s3cret").is_err());
    }
}
