//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Get path to the lockme binary
fn lockme_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lockme"))
}

/// Run lockme in `dir` with `stdin` fed to the process
fn run_lockme(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(lockme_bin())
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let pipe = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        let _ = pipe.write_all(stdin.as_bytes());
    }

    child.wait_with_output().unwrap()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("hello.txt");
    fs::write(&plain, "hello").unwrap();

    let result = run_lockme(temp_dir.path(), &["encrypt", plain.to_str().unwrap()], "");
    assert_success(&result, "encrypt");
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("hello.txt.enc"), "unexpected stdout: {}", stdout);

    let encrypted = temp_dir.path().join("hello.txt.enc");
    assert_eq!(fs::read(&encrypted).unwrap().len(), 32);
    assert_eq!(fs::read(temp_dir.path().join("key.bin")).unwrap().len(), 32);

    let result = run_lockme(temp_dir.path(), &["decrypt", encrypted.to_str().unwrap()], "");
    assert_success(&result, "decrypt");

    let decrypted = fs::read(temp_dir.path().join("hello.txt.dec")).unwrap();
    assert_eq!(decrypted, b"hello");
}

#[test]
fn test_aliases_and_prompted_path() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("block.bin");
    fs::write(&plain, [0x10u8; 16]).unwrap();

    let prompt_input = format!("{}\n", plain.display());
    let result = run_lockme(temp_dir.path(), &["e"], &prompt_input);
    assert_success(&result, "encrypt");
    assert!(String::from_utf8_lossy(&result.stderr).contains("File to encrypt"));

    let encrypted = temp_dir.path().join("block.bin.enc");
    assert_eq!(fs::read(&encrypted).unwrap().len(), 48);

    let result = run_lockme(temp_dir.path(), &["d", encrypted.to_str().unwrap()], "");
    assert_success(&result, "decrypt");
    assert_eq!(
        fs::read(temp_dir.path().join("block.bin.dec")).unwrap(),
        [0x10u8; 16]
    );
}

#[test]
fn test_cancel_does_nothing() {
    let temp_dir = TempDir::new().unwrap();

    let result = run_lockme(temp_dir.path(), &["encrypt"], "\n");
    assert_success(&result, "cancelled encrypt");
    assert!(result.stdout.is_empty());
    assert!(!temp_dir.path().join("key.bin").exists());
}

#[test]
fn test_decrypt_without_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let encrypted = temp_dir.path().join("orphan.enc");
    fs::write(&encrypted, [0u8; 32]).unwrap();

    let result = run_lockme(temp_dir.path(), &["decrypt", encrypted.to_str().unwrap()], "");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("encryption key not found"),
        "Expected missing key message, got: {}",
        stderr
    );
    assert!(!temp_dir.path().join("orphan.dec").exists());
}

#[test]
fn test_encrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nonexistent.txt");

    let result = run_lockme(temp_dir.path(), &["encrypt", missing.to_str().unwrap()], "");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("nonexistent.txt"), "got: {}", stderr);
    assert!(!temp_dir.path().join("nonexistent.txt.enc").exists());
}

#[test]
fn test_key_is_reused_unless_new_key_requested() {
    let temp_dir = TempDir::new().unwrap();
    let keys = temp_dir.path().join("keys");
    fs::create_dir(&keys).unwrap();
    let key_file = keys.join("my.key");
    let key_arg = key_file.to_str().unwrap();

    let first = temp_dir.path().join("first.txt");
    let second = temp_dir.path().join("second.txt");
    fs::write(&first, "first").unwrap();
    fs::write(&second, "second").unwrap();

    let result = run_lockme(
        temp_dir.path(),
        &["--key-file", key_arg, "encrypt", first.to_str().unwrap()],
        "",
    );
    assert_success(&result, "first encrypt");
    let key_before = fs::read(&key_file).unwrap();

    let result = run_lockme(
        temp_dir.path(),
        &["encrypt", second.to_str().unwrap(), "--key-file", key_arg],
        "",
    );
    assert_success(&result, "second encrypt");
    assert_eq!(fs::read(&key_file).unwrap(), key_before);

    let result = run_lockme(
        temp_dir.path(),
        &["encrypt", "--new-key", second.to_str().unwrap(), "-k", key_arg],
        "",
    );
    assert_success(&result, "encrypt with new key");
    assert_ne!(fs::read(&key_file).unwrap(), key_before);
    assert!(!temp_dir.path().join("key.bin").exists());
}

#[test]
fn test_gcm_mode_detects_tampering() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("doc.txt");
    fs::write(&plain, "authenticated content").unwrap();

    let result = run_lockme(
        temp_dir.path(),
        &["--mode", "gcm", "encrypt", plain.to_str().unwrap()],
        "",
    );
    assert_success(&result, "encrypt");

    let encrypted = temp_dir.path().join("doc.txt.enc");
    let mut envelope = fs::read(&encrypted).unwrap();
    assert_eq!(envelope.len(), 12 + 21 + 16);
    envelope[20] ^= 0x04;
    fs::write(&encrypted, &envelope).unwrap();

    let result = run_lockme(
        temp_dir.path(),
        &["decrypt", "-m", "gcm", encrypted.to_str().unwrap()],
        "",
    );
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("decryption failed"), "got: {}", stderr);
    assert!(!temp_dir.path().join("doc.txt.dec").exists());
}

#[test]
fn test_config_file_selects_mode_and_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("lockme.toml");
    fs::write(&config, "key_file = \"custom.key\"\nmode = \"gcm\"\n").unwrap();
    let plain = temp_dir.path().join("notes.txt");
    fs::write(&plain, "abc").unwrap();

    let config_arg = config.to_str().unwrap();
    let result = run_lockme(
        temp_dir.path(),
        &["--config", config_arg, "encrypt", plain.to_str().unwrap()],
        "",
    );
    assert_success(&result, "encrypt");
    assert!(temp_dir.path().join("custom.key").exists());
    // nonce + 3 bytes + tag
    assert_eq!(
        fs::read(temp_dir.path().join("notes.txt.enc")).unwrap().len(),
        12 + 3 + 16
    );

    let encrypted = temp_dir.path().join("notes.txt.enc");
    let result = run_lockme(
        temp_dir.path(),
        &["--config", config_arg, "decrypt", encrypted.to_str().unwrap()],
        "",
    );
    assert_success(&result, "decrypt");
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("notes.txt.dec")).unwrap(),
        "abc"
    );
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("lockme.toml");
    fs::write(&config, "mode = \"rot13\"\n").unwrap();

    let result = run_lockme(
        temp_dir.path(),
        &["--config", config.to_str().unwrap(), "encrypt", "whatever.txt"],
        "",
    );
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("invalid configuration"));
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plain = temp_dir.path().join("large.bin");
    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&plain, &large_content).unwrap();

    let result = run_lockme(temp_dir.path(), &["encrypt", plain.to_str().unwrap()], "");
    assert_success(&result, "encrypt");

    let encrypted = temp_dir.path().join("large.bin.enc");
    assert_eq!(fs::read(&encrypted).unwrap().len(), 16 + 1024 * 1024 + 16);

    let result = run_lockme(temp_dir.path(), &["decrypt", encrypted.to_str().unwrap()], "");
    assert_success(&result, "decrypt");
    assert_eq!(
        fs::read(temp_dir.path().join("large.bin.dec")).unwrap(),
        large_content
    );
}
