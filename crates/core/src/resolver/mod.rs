//! Entity resolution: protocol names to tokens with a confidence tier.

mod matcher;
mod model;
mod names;
mod service;
mod tables;
mod traits;

pub use model::{MatchMethod, ResolutionResult};
pub use names::{clean_name, is_known_tokenless, name_variations, normalize};
pub use service::EntityResolver;
pub use traits::{CoinDirectory, TokenResolver};
