mod ledger;
mod money;
mod statement;
mod user;

pub use ledger::*;
pub use money::*;
pub use statement::*;
pub use user::*;
