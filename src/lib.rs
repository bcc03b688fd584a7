//! lockme - Key-file based symmetric file encryption using AES-256

#![forbid(unsafe_code)]

pub mod blockcrypt;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod frontend;
pub mod keyfile;
pub mod padding;
