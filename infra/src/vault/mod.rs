//! Secret store implementations backing `VaultKeyManager`

mod http_secret_store;

pub use http_secret_store::HttpVaultSecretStore;
