mod error;
mod guard;
mod notifier;
pub use error::*;
pub use guard::*;
pub use notifier::*;
