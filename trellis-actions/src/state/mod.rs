//! Shared middleware state
//!
//! One [`ActionsState`] is built at startup and cloned into the
//! middleware layer. It carries the three process-wide collaborators:
//! the result codec (holding the AES key), the action registry, and the
//! configuration. All three are immutable after construction and shared
//! behind `Arc`s, so clones are cheap and concurrent requests never
//! contend.

use crate::codec::{ActionKey, ResultCodec};
use crate::config::ActionsConfig;
use crate::registry::ActionRegistry;
use std::sync::Arc;

/// Process-wide state for the actions middleware.
///
/// # Example
///
/// ```rust
/// use trellis_actions::registry::InMemoryRegistry;
/// use trellis_actions::state::ActionsState;
/// use serde_json::json;
///
/// # fn example() -> anyhow::Result<()> {
/// let registry = InMemoryRegistry::new()
///     .register_fn("ping", |_input| async move { Ok(json!("pong")) });
/// let state = ActionsState::new(registry)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ActionsState {
    codec: ResultCodec,
    registry: Arc<dyn ActionRegistry>,
    config: Arc<ActionsConfig>,
}

impl ActionsState {
    /// Build state with configuration loaded from the environment
    /// (`TRELLIS_ACTIONS_*` / `trellis.toml`).
    ///
    /// # Errors
    ///
    /// Fails when configuration cannot be loaded or the configured key is
    /// not valid hex for 32 bytes.
    pub fn new(registry: impl ActionRegistry) -> anyhow::Result<Self> {
        Self::with_config(ActionsConfig::load()?, registry)
    }

    /// Build state from an explicit configuration.
    ///
    /// When no key is configured, a random per-process key is generated
    /// and a warning is logged: envelopes minted by this process will not
    /// decode after a restart or on other instances.
    pub fn with_config(
        config: ActionsConfig,
        registry: impl ActionRegistry,
    ) -> anyhow::Result<Self> {
        let key = match config.key_hex.as_deref() {
            Some(hex_key) => ActionKey::from_hex(hex_key)?,
            None => {
                tracing::warn!(
                    "no action key configured; generated a random per-process key, so \
                     encrypted action results will not survive a restart"
                );
                ActionKey::generate()
            }
        };

        Ok(Self {
            codec: ResultCodec::new(&key),
            registry: Arc::new(registry),
            config: Arc::new(config),
        })
    }

    /// The result codec.
    #[must_use]
    pub const fn codec(&self) -> &ResultCodec {
        &self.codec
    }

    /// The action registry.
    #[must_use]
    pub fn registry(&self) -> &dyn ActionRegistry {
        self.registry.as_ref()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ActionsConfig {
        &self.config
    }
}
