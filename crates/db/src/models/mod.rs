pub mod generation_cache;
