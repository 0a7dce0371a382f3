pub mod console;
pub mod line;
pub mod unsupported;

pub use console::ConsoleSynthesizer;
pub use line::LineRecognizer;
pub use unsupported::{UnsupportedRecognizer, UnsupportedSynthesizer};
