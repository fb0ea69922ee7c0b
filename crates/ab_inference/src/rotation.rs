use std::fmt;
use std::future::Future;

use ab_core::{Error, Result, TextGenerator};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::credentials::KeyRing;

/// A text API that takes the credential per call.
#[async_trait]
pub trait KeyedTextBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_with_key(&self, key: &str, prompt: &str) -> Result<String>;
}

/// Runs `call` with the ring's current credential, moving to the next one on
/// every quota error.
///
/// Makes at most `ring.len()` attempts. Any error that is not a quota error is
/// returned as-is without trying another credential.
pub async fn call_with_rotation<T, F, Fut>(ring: &mut KeyRing, label: &str, mut call: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = ring.len();
    let mut last = String::new();

    for attempt in 0..attempts {
        match call(ring.current().to_string()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_quota() => {
                warn!(
                    "⚠️ {} credential #{} exhausted its quota: {}",
                    label,
                    ring.current_index() + 1,
                    e
                );
                last = e.to_string();
                if attempt + 1 < attempts {
                    let next = ring.rotate();
                    info!("🔄 switching to credential #{}", next + 1);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::CredentialsExhausted { attempts, last })
}

/// Text generation through [`call_with_rotation`].
pub async fn generate_with_rotation<B>(ring: &mut KeyRing, backend: &B, prompt: &str) -> Result<String>
where
    B: KeyedTextBackend + ?Sized,
{
    call_with_rotation(ring, backend.name(), move |key| async move {
        backend.generate_with_key(&key, prompt).await
    })
    .await
}

/// [`TextGenerator`] over a keyed backend and a shared [`KeyRing`].
pub struct RotatingModel<B> {
    backend: B,
    ring: Mutex<KeyRing>,
}

impl<B: KeyedTextBackend> RotatingModel<B> {
    pub fn new(backend: B, ring: KeyRing) -> Self {
        Self {
            backend,
            ring: Mutex::new(ring),
        }
    }

    pub async fn current_credential(&self) -> usize {
        self.ring.lock().await.current_index()
    }
}

impl<B: KeyedTextBackend> fmt::Debug for RotatingModel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingModel")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[async_trait]
impl<B: KeyedTextBackend> TextGenerator for RotatingModel<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut ring = self.ring.lock().await;
        generate_with_rotation(&mut ring, &self.backend, prompt).await
    }
}
