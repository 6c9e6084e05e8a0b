//! Master-key request signing for the Cosmos DB REST API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use sha2::Sha256;

use chatvault_types::error::StoreError;

type HmacSha256 = Hmac<Sha256>;

/// Decoded account master key.
///
/// Does NOT derive Debug so the key bytes never reach logs.
pub struct MasterKey(SecretBox<Vec<u8>>);

impl MasterKey {
    /// Decode the base64 key as shown in the Azure portal.
    pub fn decode(key: &SecretString) -> Result<Self, StoreError> {
        let bytes = STANDARD
            .decode(key.expose_secret().trim())
            .map_err(|e| StoreError::Connection(format!("invalid master key: {e}")))?;
        Ok(Self(SecretBox::new(Box::new(bytes))))
    }

    /// Build the URL-encoded `authorization` header value for one request.
    ///
    /// `resource_type` is `dbs`, `colls` or `docs`; `resource_link` is the
    /// path of the addressed resource (or of its parent for create and query
    /// calls), without a leading slash.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, StoreError> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(self.0.expose_secret())
            .map_err(|e| StoreError::Connection(format!("invalid master key: {e}")))?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(urlencoding::encode(&token).into_owned())
    }
}

/// RFC 1123 date in the form the `x-ms-date` header expects.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &str = "dGVzdC1tYXN0ZXIta2V5";
    const DATE: &str = "Wed, 14 Oct 2026 12:00:00 GMT";

    fn key() -> MasterKey {
        MasterKey::decode(&SecretString::from(KEY.to_string())).unwrap()
    }

    #[test]
    fn test_http_date_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        assert_eq!(http_date(now), DATE);
    }

    #[test]
    fn test_document_read_signature() {
        let auth = key()
            .authorization("GET", "docs", "dbs/ChatHistoryDB/colls/Conversations/docs/c1", DATE)
            .unwrap();
        assert_eq!(
            auth,
            "type%3Dmaster%26ver%3D1.0%26sig%3DJlmh3CbtGIE5SDQo7P6olB5Pz2dJMW%2FHDgfyoPeViiY%3D"
        );
    }

    #[test]
    fn test_database_create_signature_has_empty_link() {
        let auth = key().authorization("POST", "dbs", "", DATE).unwrap();
        assert_eq!(
            auth,
            "type%3Dmaster%26ver%3D1.0%26sig%3DN5CPqeKFf8dLGg9RVrCNzDffUYE5RCBAJ9PJc0YDyjk%3D"
        );
    }

    #[test]
    fn test_verb_and_date_case_do_not_matter() {
        let upper = key().authorization("GET", "docs", "dbs/a", DATE).unwrap();
        let lower = key()
            .authorization("get", "DOCS", "dbs/a", &DATE.to_lowercase())
            .unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_invalid_key_is_connection_error() {
        let err = MasterKey::decode(&SecretString::from("not base64!".to_string()))
            .err()
            .unwrap();
        assert!(err.is_connection());
    }
}
