mod secret;

pub mod luhn;

pub use secret::Secret;
