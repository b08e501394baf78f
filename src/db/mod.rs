// Re-export the Database struct and other public items
pub mod cluster;
pub mod core;
pub mod job;
pub mod question;
mod schema;
mod student;

// Re-export Database and essential traits
pub use self::cluster::StoredCluster;
pub use self::core::Database;
pub use self::job::ClusteringJob;
pub use self::question::CustomizedQuestion;
pub use sqlx::Row;
