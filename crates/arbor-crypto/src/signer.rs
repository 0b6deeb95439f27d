use std::fmt;
use std::sync::Arc;

/// A capability that signs bytes and verifies signatures over them.
///
/// Commits are signed over their 20 id bytes. `key_hint` lets callers pick
/// a key when a signer holds several; single-key signers reject hints that
/// do not name their key.
pub trait Signer: Send + Sync {
    /// Produce a detached signature over `data`.
    fn sign(&self, data: &[u8], key_hint: Option<&str>) -> Result<Vec<u8>, SignatureError>;

    /// Check a detached signature. `Ok(false)` means well-formed but invalid.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, SignatureError>;
}

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a 64-character hex secret, as stored in a key file.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim()).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign a message, returning the 64 signature bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        use ed25519_dalek::Signer as _;
        self.0.sign(message).to_bytes()
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier as _;
        let arr: [u8; 64] = signature
            .try_into()
            .map_err(|_| SignatureError::MalformedSignature(signature.len()))?;
        self.0
            .verify(message, &ed25519_dalek::Signature::from_bytes(&arr))
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.0.to_bytes()))
    }
}

/// [`Signer`] backed by a single Ed25519 key.
pub struct Ed25519Signer {
    key: SigningKey,
    label: Option<String>,
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        Self { key, label: None }
    }

    /// Name this key so that `key_hint`s can select it.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, data: &[u8], key_hint: Option<&str>) -> Result<Vec<u8>, SignatureError> {
        if let (Some(hint), Some(label)) = (key_hint, self.label.as_deref()) {
            if hint != label {
                return Err(SignatureError::UnknownKey(hint.to_string()));
            }
        }
        Ok(self.key.sign(data).to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, SignatureError> {
        match self.key.verifying_key().verify(data, signature) {
            Ok(()) => Ok(true),
            Err(SignatureError::InvalidSignature) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("key", &self.key.verifying_key())
            .field("label", &self.label)
            .finish()
    }
}

/// The signer and key hint handed to commit encoding and decoding.
#[derive(Clone)]
pub struct SigningContext {
    pub signer: Arc<dyn Signer>,
    pub key_hint: Option<String>,
}

impl SigningContext {
    pub fn new(signer: Arc<dyn Signer>, key_hint: Option<String>) -> Self {
        Self { signer, key_hint }
    }

    /// Sign with the configured key hint.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        self.signer.sign(data, self.key_hint.as_deref())
    }

    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, SignatureError> {
        self.signer.verify(data, signature)
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("key_hint", &self.key_hint)
            .finish_non_exhaustive()
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("signature must be 64 bytes, got {0}")]
    MalformedSignature(usize),
    #[error("no signing key named {0:?}")]
    UnknownKey(String),
}
