#![doc = include_str!("RUSTDOC.md")]

pub mod app;

pub mod binding;

pub mod firestore;

pub mod ssr;

pub mod util;
