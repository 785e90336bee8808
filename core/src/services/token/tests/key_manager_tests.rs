//! Tests for the file-backed and static key managers

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use super::fixtures::*;
use crate::errors::{DomainError, TokenError};
use crate::services::token::{AlgorithmPolicy, FileKeyManager, JwtCodec, KeyManager, StaticKeyManager};

fn write_key_dir(root: &Path, key_id: &str) {
    let dir = root.join(key_id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("private.pem"), PRIVATE_KEY_PEM).unwrap();
    fs::write(dir.join("public.pem"), PUBLIC_KEY_PEM).unwrap();
    fs::write(dir.join("secret"), "file-secret\n").unwrap();
}

#[tokio::test]
async fn test_file_key_manager_loads_all_key_kinds() {
    let temp = TempDir::new().unwrap();
    write_key_dir(temp.path(), KEY_ID);
    let manager = FileKeyManager::new(temp.path());

    assert!(manager.private_key(KEY_ID).await.unwrap().is_some());
    assert!(manager.public_key(KEY_ID).await.unwrap().is_some());
    assert_eq!(manager.secret(KEY_ID).await.unwrap(), Some(b"file-secret".to_vec()));
    assert!(manager.is_available().await);
}

#[tokio::test]
async fn test_file_key_manager_missing_files_are_none() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("hs-only")).unwrap();
    fs::write(temp.path().join("hs-only").join("secret"), "s3cret").unwrap();
    let manager = FileKeyManager::new(temp.path());

    assert!(manager.private_key("hs-only").await.unwrap().is_none());
    assert!(manager.public_key("hs-only").await.unwrap().is_none());
    assert!(manager.secret("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_key_manager_malformed_pem_is_error() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("broken");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("public.pem"), "-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----\n").unwrap();
    let manager = FileKeyManager::new(temp.path());

    assert!(matches!(
        manager.public_key("broken").await,
        Err(DomainError::Token(TokenError::KeyLoad { .. }))
    ));
}

#[tokio::test]
async fn test_file_key_manager_rejects_path_traversal() {
    let temp = TempDir::new().unwrap();
    let keys = temp.path().join("keys");
    fs::create_dir_all(&keys).unwrap();
    // A secret outside the keys directory
    write_key_dir(temp.path(), "outside");
    let manager = FileKeyManager::new(&keys);

    assert!(manager.secret("../outside").await.unwrap().is_none());
    assert!(manager.secret("..").await.unwrap().is_none());
    assert!(manager.public_key("a/b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_key_manager_unavailable_without_directory() {
    let temp = TempDir::new().unwrap();
    let manager = FileKeyManager::new(temp.path().join("does-not-exist"));

    assert!(!manager.is_available().await);
    assert!(manager.secret(KEY_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_codec_over_file_keys() {
    let temp = TempDir::new().unwrap();
    write_key_dir(temp.path(), KEY_ID);
    let codec = JwtCodec::new(Arc::new(FileKeyManager::new(temp.path())), config(AlgorithmPolicy::Rs256));

    let claims = codec.refresh_claims(Uuid::new_v4());
    let token = codec.encode(&claims).await.unwrap();
    assert_eq!(codec.decode(&token).await.unwrap(), claims);
}

#[tokio::test]
async fn test_static_key_manager() {
    let manager = all_keys();

    assert!(manager.private_key(KEY_ID).await.unwrap().is_some());
    assert!(manager.public_key(KEY_ID).await.unwrap().is_some());
    assert_eq!(manager.secret(KEY_ID).await.unwrap(), Some(SECRET.to_vec()));
    assert!(manager.secret("other").await.unwrap().is_none());
    assert!(manager.is_available().await);
}

#[test]
fn test_static_key_manager_rejects_bad_pem() {
    let result = StaticKeyManager::new().with_rsa_pem(KEY_ID, "garbage", PUBLIC_KEY_PEM);
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::KeyLoad { .. }))
    ));
}
