use jsonwebtoken::{DecodingKey, Validation, decode};

use hacks_types::api::{Claims, Session};

use crate::Result;

/// Sessions this close to expiry are treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// Read the claims of an access token without checking its signature.
///
/// The client never holds the signing secret; the claims are only used to
/// learn the expiry of sessions that were stored without `expires_at`.
pub fn unverified_claims(access_token: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<Claims>(access_token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Unix second at which `session` stops being usable.
pub fn expires_at(session: &Session) -> Result<i64> {
    match session.expires_at {
        Some(at) => Ok(at),
        None => Ok(unverified_claims(&session.access_token)?.exp as i64),
    }
}

pub fn is_expired(session: &Session, now: i64) -> bool {
    match expires_at(session) {
        Ok(at) => at - EXPIRY_MARGIN_SECS <= now,
        // Unreadable token: let the identity service decide on refresh
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    use super::*;
    use hacks_types::api::AuthUser;

    fn session(access_token: String, expires_at: Option<i64>) -> Session {
        Session {
            access_token,
            refresh_token: "r".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
            expires_at,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: None,
            },
        }
    }

    fn signed(exp: usize) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: Some("a@b.c".into()),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-only")).unwrap()
    }

    #[test]
    fn claims_are_read_without_the_secret() {
        let claims = unverified_claims(&signed(1_700_000_000)).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn explicit_expiry_wins_over_claims() {
        let s = session(signed(10), Some(5_000));
        assert_eq!(expires_at(&s).unwrap(), 5_000);
        assert!(!is_expired(&s, 4_000));
        assert!(is_expired(&s, 4_980));
    }

    #[test]
    fn falls_back_to_token_expiry() {
        let s = session(signed(2_000), None);
        assert!(!is_expired(&s, 1_000));
        assert!(is_expired(&s, 2_000));
    }

    #[test]
    fn garbage_tokens_count_as_expired() {
        let s = session("not-a-jwt".into(), None);
        assert!(is_expired(&s, 0));
    }
}
