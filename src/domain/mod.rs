mod balance;
mod currency;
mod expense;
mod group;
pub mod money;
mod settlement;
mod validation;

pub use balance::*;
pub use currency::*;
pub use expense::*;
pub use group::*;
pub use money::{Cents, ParseCentsError, cents_to_units, format_cents, parse_cents, units_to_cents};
pub use settlement::*;
pub use validation::*;
