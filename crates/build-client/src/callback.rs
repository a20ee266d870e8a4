//! Callback tokens
//!
//! The build server posts its result to a URL carrying an opaque token.
//! The token names the user and project and is signed with the server's
//! callback secret so the receiving endpoint can trust it.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::storage::ProjectId;

type HmacSha256 = Hmac<Sha256>;

/// Token errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Malformed callback token")]
    Malformed,
    #[error("Callback token signature does not match")]
    BadSignature,
    #[error("Callback secret cannot key the signature")]
    InvalidSecret,
}

/// Who a build callback belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub user_id: String,
    pub project: ProjectId,
}

impl CallbackToken {
    pub fn new(user_id: &str, project: ProjectId) -> Self {
        Self {
            user_id: user_id.to_string(),
            project,
        }
    }

    /// `hex(payload).hex(hmac_sha256(secret, payload))`
    pub fn sign(&self, secret: &str) -> Result<String, CallbackError> {
        let payload = format!("{}:{}", self.user_id, self.project);
        let tag = keyed(secret, &payload)?.finalize().into_bytes();
        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(tag)))
    }

    /// Recover the user and project from a signed token
    pub fn verify(token: &str, secret: &str) -> Result<Self, CallbackError> {
        let (payload, mac) = token.split_once('.').ok_or(CallbackError::Malformed)?;
        let payload = hex::decode(payload).map_err(|_| CallbackError::Malformed)?;
        let payload = String::from_utf8(payload).map_err(|_| CallbackError::Malformed)?;

        let tag = hex::decode(mac).map_err(|_| CallbackError::Malformed)?;
        keyed(secret, &payload)?
            .verify_slice(&tag)
            .map_err(|_| CallbackError::BadSignature)?;

        let (user_id, project) = payload.rsplit_once(':').ok_or(CallbackError::Malformed)?;
        let project = project.parse().map_err(|_| CallbackError::Malformed)?;
        Ok(Self::new(user_id, project))
    }
}

fn keyed(secret: &str, payload: &str) -> Result<HmacSha256, CallbackError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| CallbackError::InvalidSecret)?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let token = CallbackToken::new("user:42", 9).sign("secret").unwrap();
        assert!(!token.contains('/'));
        assert_eq!(
            CallbackToken::verify(&token, "secret").unwrap(),
            CallbackToken::new("user:42", 9)
        );
    }

    #[test]
    fn test_signature_is_keyed_hmac() {
        // RFC 4231 test case 2
        let mut mac = keyed("Jefe", "what do ya want for nothing?").unwrap();
        mac.update(b"");
        assert_eq!(
            hex::encode(mac.finalize().into_bytes()),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );

        let token = CallbackToken::new("alice", 1).sign("secret").unwrap();
        let plain_digest = {
            use sha2::Digest;
            hex::encode(Sha256::digest(b"secretalice:1"))
        };
        assert!(!token.ends_with(&plain_digest));
    }

    #[test]
    fn test_rejects_tampering() {
        let token = CallbackToken::new("alice", 1).sign("secret").unwrap();
        assert_eq!(
            CallbackToken::verify(&token, "other"),
            Err(CallbackError::BadSignature)
        );

        let (_, mac) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", hex::encode("mallory:1"), mac);
        assert_eq!(
            CallbackToken::verify(&forged, "secret"),
            Err(CallbackError::BadSignature)
        );
        assert_eq!(
            CallbackToken::verify("not-a-token", "secret"),
            Err(CallbackError::Malformed)
        );

        let extended = format!("{}00", token);
        assert_eq!(
            CallbackToken::verify(&extended, "secret"),
            Err(CallbackError::BadSignature)
        );
    }
}
