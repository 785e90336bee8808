
mod key_manager_tests;
mod vault_cache_tests;
