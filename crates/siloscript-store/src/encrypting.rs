use std::path::PathBuf;
use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use tokio::sync::Mutex;

use crate::{Store, StoreError};

const AES_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Loads or lazily generates the wrapper's RSA key pair in a local keyring
/// directory, optionally passphrase-protected.
#[derive(Clone)]
struct Keyring {
    dir: PathBuf,
    passphrase: Option<String>,
}

impl Keyring {
    fn private_key_path(&self) -> PathBuf {
        self.dir.join("private.pem")
    }

    /// Runs on a worker thread: disk I/O plus RSA key generation are both
    /// CPU/IO-bound and must not block the async reactor.
    fn load_or_generate(&self) -> anyhow::Result<RsaPrivateKey> {
        let path = self.private_key_path();
        if path.exists() {
            let pem = std::fs::read_to_string(&path)?;
            return self.decode(&pem);
        }

        std::fs::create_dir_all(&self.dir)?;
        tracing::info!(dir = %self.dir.display(), "generating RSA keyring");
        let key = RsaPrivateKey::new(&mut OsRng, 2048)?;
        let pem = self.encode(&key)?;
        std::fs::write(&path, pem)?;
        tracing::info!("RSA keyring generated");
        Ok(key)
    }

    fn encode(&self, key: &RsaPrivateKey) -> anyhow::Result<String> {
        let pem = match &self.passphrase {
            Some(passphrase) => {
                key.to_pkcs8_encrypted_pem(&mut OsRng, passphrase.as_bytes(), LineEnding::LF)?
            }
            None => key.to_pkcs8_pem(LineEnding::LF)?,
        };
        Ok(pem.to_string())
    }

    fn decode(&self, pem: &str) -> anyhow::Result<RsaPrivateKey> {
        let key = match &self.passphrase {
            Some(passphrase) => RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
                .map_err(|e| anyhow::anyhow!("wrong passphrase or corrupt keyring: {e}"))?,
            None => RsaPrivateKey::from_pkcs8_pem(pem)?,
        };
        Ok(key)
    }
}

/// Composes over any [`Store`], encrypting values at rest.
///
/// Each value is sealed with a fresh AES-256-GCM data key, which is in turn
/// sealed with the wrapper's RSA public key (hybrid encryption: RSA-OAEP
/// alone cannot carry payloads larger than its modulus). The RSA key pair is
/// generated lazily on first use and cached for the life of the wrapper;
/// concurrent first-time generation is serialized by `key_cache`.
pub struct EncryptingStore<S> {
    inner: Arc<S>,
    keyring: Keyring,
    key_cache: Mutex<Option<Arc<RsaPrivateKey>>>,
}

impl<S: Store> EncryptingStore<S> {
    pub fn new(inner: Arc<S>, keyring_dir: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            inner,
            keyring: Keyring {
                dir: keyring_dir.into(),
                passphrase,
            },
            key_cache: Mutex::new(None),
        }
    }

    async fn private_key(&self) -> Result<Arc<RsaPrivateKey>, StoreError> {
        let mut guard = self.key_cache.lock().await;
        if let Some(key) = guard.as_ref() {
            return Ok(key.clone());
        }

        let keyring = self.keyring.clone();
        let key = tokio::task::spawn_blocking(move || keyring.load_or_generate())
            .await
            .expect("key generation task does not panic")
            .map_err(StoreError::Crypt)?;
        let key = Arc::new(key);
        *guard = Some(key.clone());
        Ok(key)
    }
}

#[async_trait::async_trait]
impl<S: Store + 'static> Store for EncryptingStore<S> {
    async fn get(&self, user: &str, silo: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let ciphertext = self.inner.get(user, silo, key).await?;
        let private_key = self.private_key().await?;

        tokio::task::spawn_blocking(move || decrypt(&private_key, &ciphertext))
            .await
            .expect("decrypt task does not panic")
            .map_err(StoreError::Crypt)
    }

    async fn put(
        &self,
        user: &str,
        silo: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        let public_key = RsaPublicKey::from(self.private_key().await?.as_ref());

        let ciphertext = tokio::task::spawn_blocking(move || encrypt(&public_key, &value))
            .await
            .expect("encrypt task does not panic")
            .map_err(StoreError::Crypt)?;

        self.inner.put(user, silo, key, ciphertext).await
    }

    async fn delete(&self, user: &str, silo: &str, key: &str) -> Result<(), StoreError> {
        self.inner.delete(user, silo, key).await
    }
}

/// Envelope layout: `[u16 encrypted-data-key len][encrypted data key][12-byte nonce][AES-GCM ciphertext]`.
fn encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut rng = OsRng;

    let data_key = Aes256Gcm::generate_key(&mut AeadOsRng);
    let cipher = Aes256Gcm::new(&data_key);
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| anyhow::anyhow!("aes-gcm encrypt failed: {e}"))?;

    let padding = Oaep::new::<sha2::Sha256>();
    let encrypted_key = public_key.encrypt(&mut rng, padding, data_key.as_slice())?;

    let mut out = Vec::with_capacity(2 + encrypted_key.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&(encrypted_key.len() as u16).to_be_bytes());
    out.extend_from_slice(&encrypted_key);
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt(private_key: &RsaPrivateKey, envelope: &[u8]) -> anyhow::Result<Vec<u8>> {
    if envelope.len() < 2 {
        anyhow::bail!("ciphertext envelope truncated");
    }
    let key_len = u16::from_be_bytes([envelope[0], envelope[1]]) as usize;
    let rest = &envelope[2..];
    if rest.len() < key_len + NONCE_LEN {
        anyhow::bail!("ciphertext envelope truncated");
    }
    let (encrypted_key, rest) = rest.split_at(key_len);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let padding = Oaep::new::<sha2::Sha256>();
    let data_key = private_key
        .decrypt(padding, encrypted_key)
        .map_err(|e| anyhow::anyhow!("rsa decrypt failed: {e}"))?;
    if data_key.len() != AES_KEY_LEN {
        anyhow::bail!("unexpected data key length");
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&data_key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow::anyhow!("aes-gcm decrypt failed: {e}"))
}
