//! Build script for channelz-core
//!
//! Compiles the channelz proto definitions.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile proto file to OUT_DIR (standard location for generated code)
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(&["proto/channelz.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/channelz.proto");

    Ok(())
}
