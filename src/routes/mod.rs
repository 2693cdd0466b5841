pub(crate) mod health_check;
mod categories;
mod interactions;
mod login;
mod plans;
mod subscriptions;
mod users;
mod videos;

pub use health_check::*;
pub use categories::*;
pub use interactions::*;
pub use login::*;
pub use plans::*;
pub use subscriptions::*;
pub use users::*;
pub use videos::*;
