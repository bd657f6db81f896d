pub mod archive;
pub mod filesystem;

pub use archive::build_zip;
pub use filesystem::JobStorage;
