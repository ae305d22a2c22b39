//! Build script for dnsgrpc-proto
//!
//! Generates gRPC/protobuf bindings during `cargo build`. `protoc` comes from
//! `protoc-bin-vendored` so no system install is needed.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .type_attribute(".", "#[allow(missing_docs)]")
        .compile(&["proto/dns.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/dns.proto");
    Ok(())
}
