mod catalog;
mod session;
#[cfg(test)]
mod tests;

pub use catalog::*;
pub use session::*;
