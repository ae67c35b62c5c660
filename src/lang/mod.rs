/*!
## Language module

Error definitions and raw-text scanning shared by the compiler and the
statement dispatcher.

*/

#[macro_use]
mod error;
pub mod text;

pub use error::Error;
pub use error::ErrorCode;
