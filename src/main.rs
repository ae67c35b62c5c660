//! Terminal player for Fable games.

mod term;

fn main() {
    term::main();
}
