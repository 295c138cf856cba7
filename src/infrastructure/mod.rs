// Infrastructure implementations of the stage ports.

pub mod man_grapher;
pub mod man_scanner;
pub mod noop_resolver;
pub mod stdio;
pub mod toolchain;

pub use man_grapher::ManPageGrapher;
pub use man_scanner::ManPageScanner;
pub use noop_resolver::NoopDepResolver;
pub use stdio::{MemoryInput, StdinInput};
