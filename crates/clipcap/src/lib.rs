pub mod backend;
pub mod captions;
pub mod cli;
pub mod editor;
pub mod settings;
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_support;
