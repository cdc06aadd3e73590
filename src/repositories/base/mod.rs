pub mod repository_base;

pub use repository_base::RepositoryBase;
