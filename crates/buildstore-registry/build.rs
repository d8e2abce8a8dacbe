//! Build script for the registry crate.
//!
//! `sqlx::migrate!` embeds the migrations at compile time, so a change to the
//! directory has to trigger a rebuild.

fn main() {
    println!("cargo:rerun-if-changed=migrations/");
}
