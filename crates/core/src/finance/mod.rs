//! Finance flows that touch several records at once.

mod composite;
mod saga;

pub use composite::FinanceActions;
pub use saga::*;
