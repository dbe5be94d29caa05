// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod scrub;
pub mod traits;
pub mod types;

// ── Provider implementations ────────────────────────────────────────────────
pub mod compatible;
pub mod registry;

// ── Re-exports ──────────────────────────────────────────────────────────────
pub use compatible::CompatibleProvider;
pub use registry::ProviderRegistry;
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::{Provider, filter_plain_turns};
pub use types::{ContentBlock, MessageRole, ProviderMessage};
