/*!
## Machine module

The interpreter machinery: the value type and its operations, the
expression compiler and evaluator, the hashed variable store, the statement
dispatcher, and the `Runtime` engine that ties them to a host.

*/

mod compile;
mod eval;
mod function;
pub mod host;
mod opcode;
mod operation;
mod regexp;
mod runtime;
mod stack;
mod statement;
mod val;
mod var;

pub use compile::compile;
pub use function::{ArgType, Function};
pub use host::{Dirty, Host, NullHost, Window};
pub use opcode::Opcode;
pub use operation::Operation;
pub use runtime::{Runtime, VERSION};
pub use stack::Stack;
pub use val::Val;
pub use var::{Elem, Variable, Vars};
