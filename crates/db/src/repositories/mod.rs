pub mod generation_cache_repo;

pub use generation_cache_repo::GenerationCacheRepo;
