pub mod library;
pub mod stem_loader;
