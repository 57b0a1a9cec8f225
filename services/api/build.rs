//! services/api/build.rs
//!
//! Compiles the Protocol Buffer definitions into the gRPC service trait and
//! message types used by `src/grpc.rs`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/content.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/content.proto");
    Ok(())
}
