use crate::auth::claims::Claims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::path::Path;

/// Verificador de access tokens firmados con RS256.
///
/// La llave pública se carga una vez desde PEM al arrancar; cada petición
/// solo paga la verificación de firma y expiración. Issuer y audiencia se
/// validan únicamente si la configuración los fija.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(
        public_key_pem: &[u8],
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(public_key_pem)?;

        let mut validation = Validation::new(Algorithm::RS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self { key, validation })
    }

    /// Carga la llave pública desde la ruta PEM configurada.
    pub fn from_pem_file(
        path: impl AsRef<Path>,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> anyhow::Result<Self> {
        let pem = std::fs::read(path.as_ref())?;
        Ok(Self::new(&pem, issuer, audience)?)
    }

    /// Valida firma y expiración; devuelve los claims del token.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
    }
}
