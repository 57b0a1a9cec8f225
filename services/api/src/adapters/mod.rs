pub mod cache;
pub mod db;
pub mod seeder;

pub use cache::RedisCacheAdapter;
pub use db::DbAdapter;
pub use seeder::seed_content;
