use std::collections::BTreeMap;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Credentials bundle resolved by the credential resolver (C2) from a
/// provider config's connection secret.
///
/// Key names mirror `SPEC_FULL.md` section 6 and the teacher's
/// `dbflux_core::secrets::connection_secret_ref` key conventions
/// (username/password/endpoint/port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsBundle {
    pub username: String,
    pub password: String,
    pub endpoint: String,
    pub port: u16,
    pub tls: Option<String>,
    pub fedauth: Option<String>,
}

impl CredentialsBundle {
    /// Parse a secret's raw byte map (as returned by the k8s API) into a
    /// bundle. Fails with `None` if `username`/`password`/`endpoint`/`port`
    /// are missing or `port` does not parse as a `u16`.
    pub fn from_secret_data(data: &BTreeMap<String, Vec<u8>>) -> Option<Self> {
        let get = |k: &str| data.get(k).map(|v| String::from_utf8_lossy(v).into_owned());
        let username = get("username")?;
        let password = get("password")?;
        let endpoint = get("endpoint")?;
        let port: u16 = get("port")?.parse().ok()?;
        Some(Self {
            username,
            password,
            endpoint,
            port,
            tls: get("tls"),
            fedauth: get("fedauth"),
        })
    }
}

/// Connection-details secret written back after a principal is created.
/// Same four keys as [`CredentialsBundle`], minus TLS/fedauth which are
/// inherited from the provider config rather than per-principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetails {
    pub username: String,
    pub password: String,
    pub endpoint: String,
    pub port: u16,
}

impl ConnectionDetails {
    pub fn to_secret_data(&self) -> BTreeMap<String, Vec<u8>> {
        BTreeMap::from([
            ("username".to_string(), self.username.clone().into_bytes()),
            ("password".to_string(), self.password.clone().into_bytes()),
            ("endpoint".to_string(), self.endpoint.clone().into_bytes()),
            ("port".to_string(), self.port.to_string().into_bytes()),
        ])
    }
}

/// Generates a password for a principal whose spec left `passwordSecretRef`
/// unset, per `SPEC_FULL.md` 4.5's Create contract. 32 alphanumeric
/// characters is comfortably inside every dialect's password length limit.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_secret() {
        let mut data = BTreeMap::new();
        data.insert("username".into(), b"alice".to_vec());
        data.insert("password".into(), b"s3cret".to_vec());
        data.insert("endpoint".into(), b"db.internal".to_vec());
        data.insert("port".into(), b"5432".to_vec());
        let bundle = CredentialsBundle::from_secret_data(&data).unwrap();
        assert_eq!(bundle.username, "alice");
        assert_eq!(bundle.port, 5432);
        assert_eq!(bundle.tls, None);
    }

    #[test]
    fn rejects_a_secret_missing_required_keys() {
        let mut data = BTreeMap::new();
        data.insert("username".into(), b"alice".to_vec());
        assert!(CredentialsBundle::from_secret_data(&data).is_none());
    }

    #[test]
    fn generate_password_is_32_alphanumeric_chars() {
        let password = generate_password();
        assert_eq!(password.len(), 32);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
