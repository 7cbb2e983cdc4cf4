mod money;

pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, QUOTE_CURRENCY_CODE, QUOTE_CURRENCY_CODE_LOWER};
pub use secret::Secret;
