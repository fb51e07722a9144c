use std::env;
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/watch.proto");
    println!("cargo:rerun-if-env-changed=PROTOC");

    // Without protoc the checked-in src/generated code is used as is.
    if !protoc_available() {
        println!("cargo:warning=protoc not found, using checked-in src/generated/coord.watch.rs");
        return Ok(());
    }

    tonic_build::configure()
        .out_dir("src/generated")
        .bytes(["."])
        .build_server(false)
        .compile_protos(&["proto/watch.proto"], &["."])
        .unwrap_or_else(|e| panic!("protobuf compile error: {e}"));

    Ok(())
}

fn protoc_available() -> bool {
    let protoc = env::var_os("PROTOC").unwrap_or_else(|| "protoc".into());
    Command::new(protoc)
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}
